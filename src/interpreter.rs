//! Pipeline entry: source text -> tokens -> AST -> execution.

use thiserror::Error;

use crate::ast::Unwind;
use crate::lexer::{LexError, Lexer};
use crate::parser::{self, ParseError};
use crate::runtime::{Closure, Context, RuntimeError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpretError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Runs a whole program against a fresh global scope, writing `print`
/// output to the context.
pub fn interpret(source: &str, ctx: &mut dyn Context) -> Result<(), InterpretError> {
    let mut lexer = Lexer::new(source)?;
    let program = parser::parse_program(&mut lexer)?;
    match program.execute(&mut Closure::new(), ctx) {
        Ok(_) => Ok(()),
        Err(Unwind::Return(_)) => Err(RuntimeError::ReturnOutsideMethod.into()),
        Err(Unwind::Error(error)) => Err(error.into()),
    }
}
