//! Recursive-descent parser over the lexer cursor.
//!
//! Classes are built at parse time: a `class` definition constructs the
//! runtime class (methods wrapped in `MethodBody`) and records it so later
//! code can instantiate it or inherit from it. Declarations must therefore
//! precede use.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{Comparator, Statement};
use crate::lexer::Lexer;
use crate::runtime::{self, Class, Method, Object, ObjectHolder};
use crate::token::Token;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: Token },
    #[error("Unknown class '{name}'")]
    UndeclaredClass { name: String },
    #[error("Cannot assign to this expression")]
    InvalidAssignmentTarget,
    #[error("str() takes exactly one argument, got {found}")]
    StringifyArity { found: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

pub fn parse_program(lexer: &mut Lexer) -> ParseResult<Statement> {
    Parser::new(lexer).program()
}

pub struct Parser<'a> {
    lexer: &'a mut Lexer,
    classes: HashMap<String, Rc<Class>>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: &'a mut Lexer) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    fn program(mut self) -> ParseResult<Statement> {
        let mut statements = Vec::new();
        while !matches!(self.lexer.current(), Token::Eof) {
            statements.push(self.statement()?);
        }
        Ok(Statement::Compound { statements })
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        match self.lexer.current() {
            Token::Class => self.class_definition(),
            Token::If => self.if_else(),
            Token::Print => self.print_statement(),
            Token::Return => self.return_statement(),
            _ => self.expression_statement(),
        }
    }

    fn class_definition(&mut self) -> ParseResult<Statement> {
        self.lexer.advance();
        let name = self.expect_id()?;
        let parent = if self.advance_if_char('(') {
            let base = self.expect_id()?;
            self.expect_char(')')?;
            match self.classes.get(&base) {
                Some(class) => Some(class.clone()),
                None => return Err(ParseError::UndeclaredClass { name: base }),
            }
        } else {
            None
        };
        self.expect_char(':')?;
        self.expect(Token::Newline)?;
        self.expect(Token::Indent)?;
        let mut methods = Vec::new();
        while matches!(self.lexer.current(), Token::Def) {
            methods.push(self.method()?);
        }
        self.expect(Token::Dedent)?;

        let class = Rc::new(Class::new(name.clone(), methods, parent));
        self.classes.insert(name, class.clone());
        Ok(Statement::ClassDefinition { class })
    }

    fn method(&mut self) -> ParseResult<Method> {
        self.lexer.advance();
        let name = self.expect_id()?;
        self.expect_char('(')?;
        let mut formal_params = Vec::new();
        if !matches!(self.lexer.current(), Token::Char(')')) {
            formal_params.push(self.expect_id()?);
            while self.advance_if_char(',') {
                formal_params.push(self.expect_id()?);
            }
        }
        self.expect_char(')')?;
        self.expect_char(':')?;
        let body = self.suite()?;
        Ok(Method::new(
            name,
            formal_params,
            Statement::MethodBody {
                body: Box::new(body),
            },
        ))
    }

    /// Block after a ':', either an indented statement list or a single
    /// statement on the same line.
    fn suite(&mut self) -> ParseResult<Statement> {
        if !matches!(self.lexer.current(), Token::Newline) {
            return self.statement();
        }
        self.lexer.advance();
        self.expect(Token::Indent)?;
        let mut statements = Vec::new();
        while !matches!(self.lexer.current(), Token::Dedent | Token::Eof) {
            statements.push(self.statement()?);
        }
        self.expect(Token::Dedent)?;
        Ok(Statement::Compound { statements })
    }

    fn if_else(&mut self) -> ParseResult<Statement> {
        self.lexer.advance();
        let condition = self.expression()?;
        self.expect_char(':')?;
        let if_body = self.suite()?;
        let else_body = if matches!(self.lexer.current(), Token::Else) {
            self.lexer.advance();
            self.expect_char(':')?;
            Some(Box::new(self.suite()?))
        } else {
            None
        };
        Ok(Statement::IfElse {
            condition: Box::new(condition),
            if_body: Box::new(if_body),
            else_body,
        })
    }

    fn print_statement(&mut self) -> ParseResult<Statement> {
        self.lexer.advance();
        let mut args = Vec::new();
        if !matches!(self.lexer.current(), Token::Newline) {
            args.push(self.expression()?);
            while self.advance_if_char(',') {
                args.push(self.expression()?);
            }
        }
        self.expect(Token::Newline)?;
        Ok(Statement::Print { args })
    }

    fn return_statement(&mut self) -> ParseResult<Statement> {
        self.lexer.advance();
        let statement = self.expression()?;
        self.expect(Token::Newline)?;
        Ok(Statement::Return {
            statement: Box::new(statement),
        })
    }

    /// Expression statement, or an assignment when '=' follows. The parsed
    /// left side decides the node: a single id binds a variable, a dotted
    /// path stores into a field.
    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.expression()?;
        if !self.advance_if_char('=') {
            self.expect(Token::Newline)?;
            return Ok(expr);
        }
        let rhs = self.expression()?;
        self.expect(Token::Newline)?;
        let Statement::VariableValue { mut dotted_ids } = expr else {
            return Err(ParseError::InvalidAssignmentTarget);
        };
        if dotted_ids.len() == 1 {
            let var = dotted_ids.pop().expect("assignment target has one id");
            return Ok(Statement::Assignment {
                var,
                rhs: Box::new(rhs),
            });
        }
        let field_name = dotted_ids.pop().expect("dotted target has at least two ids");
        Ok(Statement::FieldAssignment {
            object: Box::new(Statement::VariableValue { dotted_ids }),
            field_name,
            rhs: Box::new(rhs),
        })
    }

    fn expression(&mut self) -> ParseResult<Statement> {
        self.or_test()
    }

    fn or_test(&mut self) -> ParseResult<Statement> {
        let mut expr = self.and_test()?;
        while matches!(self.lexer.current(), Token::Or) {
            self.lexer.advance();
            let rhs = self.and_test()?;
            expr = Statement::Or {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn and_test(&mut self) -> ParseResult<Statement> {
        let mut expr = self.not_test()?;
        while matches!(self.lexer.current(), Token::And) {
            self.lexer.advance();
            let rhs = self.not_test()?;
            expr = Statement::And {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn not_test(&mut self) -> ParseResult<Statement> {
        if matches!(self.lexer.current(), Token::Not) {
            self.lexer.advance();
            let arg = self.not_test()?;
            return Ok(Statement::Not { arg: Box::new(arg) });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ParseResult<Statement> {
        let lhs = self.sum()?;
        let cmp: Comparator = match self.lexer.current() {
            Token::Eq => runtime::equal,
            Token::NotEq => runtime::not_equal,
            Token::Char('<') => runtime::less,
            Token::Char('>') => runtime::greater,
            Token::LessOrEq => runtime::less_or_equal,
            Token::GreaterOrEq => runtime::greater_or_equal,
            _ => return Ok(lhs),
        };
        self.lexer.advance();
        let rhs = self.sum()?;
        Ok(Statement::Comparison {
            cmp,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn sum(&mut self) -> ParseResult<Statement> {
        let mut expr = self.term()?;
        loop {
            if self.advance_if_char('+') {
                let rhs = self.term()?;
                expr = Statement::Add {
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                };
            } else if self.advance_if_char('-') {
                let rhs = self.term()?;
                expr = Statement::Sub {
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn term(&mut self) -> ParseResult<Statement> {
        let mut expr = self.primary()?;
        loop {
            if self.advance_if_char('*') {
                let rhs = self.primary()?;
                expr = Statement::Mult {
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                };
            } else if self.advance_if_char('/') {
                let rhs = self.primary()?;
                expr = Statement::Div {
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> ParseResult<Statement> {
        match self.lexer.current().clone() {
            Token::Number(value) => {
                self.lexer.advance();
                Ok(Statement::Constant {
                    value: ObjectHolder::own(Object::Number(value)),
                })
            }
            Token::String(value) => {
                self.lexer.advance();
                Ok(Statement::Constant {
                    value: ObjectHolder::own(Object::String(value)),
                })
            }
            Token::True => {
                self.lexer.advance();
                Ok(Statement::Constant {
                    value: ObjectHolder::own(Object::Bool(true)),
                })
            }
            Token::False => {
                self.lexer.advance();
                Ok(Statement::Constant {
                    value: ObjectHolder::own(Object::Bool(false)),
                })
            }
            Token::None => {
                self.lexer.advance();
                Ok(Statement::Constant {
                    value: ObjectHolder::none(),
                })
            }
            Token::Char('(') => {
                self.lexer.advance();
                let expr = self.expression()?;
                self.expect_char(')')?;
                Ok(expr)
            }
            Token::Id(name) => {
                self.lexer.advance();
                self.postfix(name)
            }
            found => Err(ParseError::UnexpectedToken {
                expected: "an expression".to_string(),
                found,
            }),
        }
    }

    /// Dotted chain after a leading id, optionally followed by a call:
    /// a plain read, `str(...)`, a class instantiation, or a method call.
    fn postfix(&mut self, first: String) -> ParseResult<Statement> {
        let mut dotted_ids = vec![first];
        while self.advance_if_char('.') {
            dotted_ids.push(self.expect_id()?);
        }
        if !matches!(self.lexer.current(), Token::Char('(')) {
            return Ok(Statement::VariableValue { dotted_ids });
        }
        let args = self.call_arguments()?;
        if dotted_ids.len() == 1 {
            let name = dotted_ids.pop().expect("chain has a leading id");
            if name == "str" {
                if args.len() != 1 {
                    return Err(ParseError::StringifyArity { found: args.len() });
                }
                let arg = args.into_iter().next().expect("arity checked above");
                return Ok(Statement::Stringify { arg: Box::new(arg) });
            }
            let Some(class) = self.classes.get(&name).cloned() else {
                return Err(ParseError::UndeclaredClass { name });
            };
            return Ok(Statement::NewInstance { class, args });
        }
        let method = dotted_ids.pop().expect("dotted chain has at least two ids");
        Ok(Statement::MethodCall {
            object: Box::new(Statement::VariableValue { dotted_ids }),
            method,
            args,
        })
    }

    fn call_arguments(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect_char('(')?;
        let mut args = Vec::new();
        if !matches!(self.lexer.current(), Token::Char(')')) {
            args.push(self.expression()?);
            while self.advance_if_char(',') {
                args.push(self.expression()?);
            }
        }
        self.expect_char(')')?;
        Ok(args)
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if *self.lexer.current() == expected {
            self.lexer.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.lexer.current().clone(),
            })
        }
    }

    fn expect_char(&mut self, ch: char) -> ParseResult<()> {
        self.expect(Token::Char(ch))
    }

    fn advance_if_char(&mut self, ch: char) -> bool {
        if matches!(self.lexer.current(), Token::Char(c) if *c == ch) {
            self.lexer.advance();
            true
        } else {
            false
        }
    }

    fn expect_id(&mut self) -> ParseResult<String> {
        match self.lexer.current() {
            Token::Id(name) => {
                let name = name.clone();
                self.lexer.advance();
                Ok(name)
            }
            found => Err(ParseError::UnexpectedToken {
                expected: "an identifier".to_string(),
                found: found.clone(),
            }),
        }
    }
}
