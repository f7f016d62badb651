use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Special
    Illegal,
    Eof,
    UnterminatedString,
    UnterminatedBlockComment,

    // Identifiers and literals
    Ident,
    Int,
    Float,
    String,

    /// A run of operator glyphs (`+`, `<+>`, `|>` and friends). Meaning is
    /// assigned by the notation table, not the lexer.
    Operator,

    // Reserved punctuation
    Assign,
    TemplateAssign,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,

    // Keywords
    Fun,
    Return,
    Use,
    As,
    Notation,
    With,
    Precedence,
    Associativity,
    True,
    False,
}

/// Map an identifier to its keyword token type, or `Ident` if it is not a
/// keyword. Associativity names (`left`, `right`, `none`) are deliberately
/// plain identifiers so they stay usable as variable names.
pub fn lookup_ident(ident: &str) -> TokenType {
    match ident {
        "fun" => TokenType::Fun,
        "return" => TokenType::Return,
        "use" => TokenType::Use,
        "as" => TokenType::As,
        "notation" => TokenType::Notation,
        "with" => TokenType::With,
        "precedence" => TokenType::Precedence,
        "associativity" => TokenType::Associativity,
        "true" => TokenType::True,
        "false" => TokenType::False,
        _ => TokenType::Ident,
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenType::Illegal => "ILLEGAL",
            TokenType::Eof => "EOF",
            TokenType::UnterminatedString => "UNTERMINATED_STRING",
            TokenType::UnterminatedBlockComment => "UNTERMINATED_BLOCK_COMMENT",

            TokenType::Ident => "IDENT",
            TokenType::Int => "INT",
            TokenType::Float => "FLOAT",
            TokenType::String => "STRING",

            TokenType::Operator => "OPERATOR",

            TokenType::Assign => "=",
            TokenType::TemplateAssign => ":=",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LBrace => "{",
            TokenType::RBrace => "}",
            TokenType::Comma => ",",
            TokenType::Semicolon => ";",
            TokenType::Dot => ".",

            TokenType::Fun => "FUN",
            TokenType::Return => "RETURN",
            TokenType::Use => "USE",
            TokenType::As => "AS",
            TokenType::Notation => "NOTATION",
            TokenType::With => "WITH",
            TokenType::Precedence => "PRECEDENCE",
            TokenType::Associativity => "ASSOCIATIVITY",
            TokenType::True => "TRUE",
            TokenType::False => "FALSE",
        };
        write!(f, "{}", s)
    }
}
