use std::fmt;

/// Tokens produced by the lexer.
///
/// `Newline`, `Indent`, and `Dedent` encode the block layout of the source;
/// punctuation the keyword table does not claim comes through as `Char`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(i64),
    Id(String),
    String(String),
    Char(char),

    // Keywords
    Class,
    Return,
    If,
    Else,
    Def,
    Print,
    And,
    Or,
    Not,
    None,
    True,
    False,

    // Two-character operators
    Eq,
    NotEq,
    LessOrEq,
    GreaterOrEq,

    // Structural
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "Number{{{value}}}"),
            Token::Id(name) => write!(f, "Id{{{name}}}"),
            Token::String(value) => write!(f, "String{{{value}}}"),
            Token::Char(ch) => write!(f, "Char{{{ch}}}"),
            Token::Class => write!(f, "Class"),
            Token::Return => write!(f, "Return"),
            Token::If => write!(f, "If"),
            Token::Else => write!(f, "Else"),
            Token::Def => write!(f, "Def"),
            Token::Print => write!(f, "Print"),
            Token::And => write!(f, "And"),
            Token::Or => write!(f, "Or"),
            Token::Not => write!(f, "Not"),
            Token::None => write!(f, "None"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::Eq => write!(f, "Eq"),
            Token::NotEq => write!(f, "NotEq"),
            Token::LessOrEq => write!(f, "LessOrEq"),
            Token::GreaterOrEq => write!(f, "GreaterOrEq"),
            Token::Newline => write!(f, "Newline"),
            Token::Indent => write!(f, "Indent"),
            Token::Dedent => write!(f, "Dedent"),
            Token::Eof => write!(f, "Eof"),
        }
    }
}
