use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' on line {line}")]
    UnexpectedCharacter { character: char, line: usize },
    #[error("Unterminated string literal on line {line}")]
    UnterminatedString { line: usize },
    #[error("Integer literal '{literal}' on line {line} is out of range")]
    IntegerOutOfRange { literal: String, line: usize },
}

pub type LexResult<T> = Result<T, LexError>;

/// Indentation-sensitive tokenizer.
///
/// The whole input is tokenized eagerly at construction, line by line: blank
/// and comment-only lines vanish, every other line contributes its indent
/// delta (one level per two leading spaces) as `Indent`/`Dedent` tokens, its
/// content tokens, and exactly one trailing `Newline`. The token vector ends
/// in a single `Eof` after dedenting back to level zero.
///
/// After construction the lexer doubles as the parser's cursor via
/// `current`/`advance`.
pub struct Lexer {
    tokens: Vec<Token>,
    index: usize,
}

impl Lexer {
    pub fn new(input: &str) -> LexResult<Self> {
        let mut tokens = Vec::new();
        let mut indent_level = 0;
        for (number, line) in input.lines().enumerate() {
            if is_empty_line(line) {
                continue;
            }
            let spaces = leading_spaces(line);
            let level = spaces / 2;
            for _ in indent_level..level {
                tokens.push(Token::Indent);
            }
            for _ in level..indent_level {
                tokens.push(Token::Dedent);
            }
            indent_level = level;
            scan_line(&line[spaces..], number + 1, &mut tokens)?;
        }
        for _ in 0..indent_level {
            tokens.push(Token::Dedent);
        }
        tokens.push(Token::Eof);
        Ok(Self { tokens, index: 0 })
    }

    pub fn current(&self) -> &Token {
        &self.tokens[self.index]
    }

    /// Moves the cursor one token forward and returns the new current token.
    /// Saturates at the final `Eof`.
    pub fn advance(&mut self) -> &Token {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        self.current()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    Ok(Lexer::new(input)?.into_tokens())
}

fn is_empty_line(line: &str) -> bool {
    let rest = line.trim_start_matches(' ');
    rest.is_empty() || rest.starts_with('#')
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn scan_line(line: &str, line_number: usize, tokens: &mut Vec<Token>) -> LexResult<()> {
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            ' ' => {}
            '#' => break,
            '0'..='9' => {
                let mut literal = String::from(ch);
                while let Some(&digit) = chars.peek() {
                    if !digit.is_ascii_digit() {
                        break;
                    }
                    literal.push(digit);
                    chars.next();
                }
                let value = literal
                    .parse::<i64>()
                    .map_err(|_| LexError::IntegerOutOfRange {
                        literal: literal.clone(),
                        line: line_number,
                    })?;
                tokens.push(Token::Number(value));
            }
            '\'' | '"' => tokens.push(read_string(&mut chars, ch, line_number)?),
            '=' | '!' | '<' | '>' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(match ch {
                        '=' => Token::Eq,
                        '!' => Token::NotEq,
                        '<' => Token::LessOrEq,
                        _ => Token::GreaterOrEq,
                    });
                } else {
                    tokens.push(Token::Char(ch));
                }
            }
            '*' | '/' | '+' | '-' | '(' | ')' | '?' | ',' | '.' | ':' | ';' | '\t' => {
                tokens.push(Token::Char(ch));
            }
            _ if ch.is_ascii_alphabetic() || ch == '_' => {
                let mut name = String::from(ch);
                while let Some(&c) = chars.peek() {
                    if !c.is_ascii_alphanumeric() && c != '_' {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                tokens.push(keyword_or_id(name));
            }
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    character: ch,
                    line: line_number,
                });
            }
        }
    }
    tokens.push(Token::Newline);
    Ok(())
}

fn read_string(chars: &mut Peekable<Chars<'_>>, quote: char, line_number: usize) -> LexResult<Token> {
    let mut value = String::new();
    while let Some(ch) = chars.next() {
        if ch == quote {
            return Ok(Token::String(value));
        }
        if ch == '\\' {
            match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => break,
            }
        } else {
            value.push(ch);
        }
    }
    Err(LexError::UnterminatedString { line: line_number })
}

fn keyword_or_id(name: String) -> Token {
    match name.as_str() {
        "class" => Token::Class,
        "return" => Token::Return,
        "if" => Token::If,
        "else" => Token::Else,
        "def" => Token::Def,
        "print" => Token::Print,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "None" => Token::None,
        "True" => Token::True,
        "False" => Token::False,
        _ => Token::Id(name),
    }
}
