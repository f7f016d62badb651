use crate::diagnostics::Position;

use super::token::Token;
use super::token_type::{TokenType, lookup_ident};

/// Warning emitted during lexing
#[derive(Debug, Clone)]
pub struct LexerWarning {
    pub message: String,
    pub position: Position,
}

/// The gale lexer.
///
/// Operator glyphs are read as maximal runs and classified afterwards, so the
/// lexer stays fixed while the notation table grows: `<+>` is one `Operator`
/// token whether or not a rule for it exists yet. Only `=` and `:=` are
/// claimed by the language itself.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    read_position: usize,
    current_char: Option<char>,
    line: usize,
    column: usize,
    warnings: Vec<LexerWarning>,
    /// Track unterminated block comment error (position where /* started)
    unterminated_block_comment_pos: Option<Position>,
}

impl Lexer {
    pub fn new(input: impl Into<String>) -> Self {
        let mut lexer = Self {
            input: input.into().chars().collect(),
            position: 0,
            read_position: 0,
            current_char: None,
            line: 1,
            column: 0,
            warnings: Vec::new(),
            unterminated_block_comment_pos: None,
        };
        lexer.read_char();
        lexer
    }

    /// Get warnings collected during lexing
    pub fn warnings(&self) -> &[LexerWarning] {
        &self.warnings
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_ignorable();

        if let Some(error_pos) = self.unterminated_block_comment_pos.take() {
            return Token::new(
                TokenType::UnterminatedBlockComment,
                "",
                error_pos.line,
                error_pos.column,
            );
        }

        let line = self.line;
        let col = self.column;

        let token = match self.current_char {
            Some('(') => Token::new(TokenType::LParen, "(", line, col),
            Some(')') => Token::new(TokenType::RParen, ")", line, col),
            Some('{') => Token::new(TokenType::LBrace, "{", line, col),
            Some('}') => Token::new(TokenType::RBrace, "}", line, col),
            Some(',') => Token::new(TokenType::Comma, ",", line, col),
            Some(';') => Token::new(TokenType::Semicolon, ";", line, col),
            Some('.') => Token::new(TokenType::Dot, ".", line, col),

            // String literals
            Some('"') => return self.read_string(),

            // End of file
            None => Token::new(TokenType::Eof, "", line, col),

            // Identifiers and keywords
            Some(ch) if is_letter(ch) => {
                let ident = self.read_identifier();
                let token_type = lookup_ident(&ident);
                return Token::new(token_type, ident, line, col);
            }

            // Numbers
            Some(ch) if ch.is_ascii_digit() => {
                let (num, is_float) = self.read_number();
                let token_type = if is_float {
                    TokenType::Float
                } else {
                    TokenType::Int
                };
                return Token::new(token_type, num, line, col);
            }

            // Operator glyph runs. `=` alone and `:=` are reserved; every
            // other run is an Operator for the notation table to interpret.
            Some(ch) if is_operator_char(ch) => {
                let run = self.read_operator();
                let token_type = match run.as_str() {
                    "=" => TokenType::Assign,
                    ":=" => TokenType::TemplateAssign,
                    _ => TokenType::Operator,
                };
                return Token::new(token_type, run, line, col);
            }

            // Illegal character
            Some(ch) => Token::new(TokenType::Illegal, ch.to_string(), line, col),
        };

        self.read_char();
        token
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.token_type == TokenType::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn read_char(&mut self) {
        // Update column BEFORE moving to the next character
        // This ensures column represents the position of current_char, not the next char
        if self.current_char == Some('\n') {
            self.line += 1;
            self.column = 0;
        } else if self.current_char.is_some() {
            self.column += 1;
        }

        self.current_char = if self.read_position >= self.input.len() {
            None
        } else {
            Some(self.input[self.read_position])
        };

        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.read_position).copied()
    }

    fn skip_ignorable(&mut self) {
        loop {
            // Whitespace
            while matches!(self.current_char, Some(' ' | '\t' | '\r' | '\n')) {
                self.read_char();
            }

            // Line comments
            if self.current_char == Some('/') && self.peek_char() == Some('/') {
                while self.current_char.is_some() && self.current_char != Some('\n') {
                    self.read_char();
                }
                continue; // there may be whitespace/comments again
            }

            // Block comments, nestable
            if self.current_char == Some('/') && self.peek_char() == Some('*') {
                let comment_start = Position::new(self.line, self.column);
                if !self.skip_block_comment() {
                    self.unterminated_block_comment_pos = Some(comment_start);
                    break;
                }
                continue;
            }

            break;
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while self
            .current_char
            .is_some_and(|c| is_letter(c) || c.is_ascii_digit())
        {
            self.read_char();
        }
        self.input[start..self.position].iter().collect()
    }

    fn read_number(&mut self) -> (String, bool) {
        let start = self.position;
        while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
            self.read_char();
        }
        let mut is_float = false;
        if self.current_char == Some('.') && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.read_char(); // consume '.'
            while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
                self.read_char();
            }
        }
        let literal: String = self.input[start..self.position].iter().collect();
        (literal, is_float)
    }

    fn read_operator(&mut self) -> String {
        let start = self.position;
        while self.current_char.is_some_and(is_operator_char) {
            // A comment opener ends the run: `x +// note` is `+` then a comment.
            if self.current_char == Some('/') && matches!(self.peek_char(), Some('/' | '*')) {
                break;
            }
            self.read_char();
        }
        self.input[start..self.position].iter().collect()
    }

    fn read_string(&mut self) -> Token {
        let line = self.line;
        let col = self.column;
        self.read_char(); // skip opening quote

        let mut result = String::new();

        loop {
            match self.current_char {
                // Strings cannot span lines
                None | Some('\n' | '\r') => {
                    return Token::new(TokenType::UnterminatedString, result, line, col);
                }
                Some('"') => {
                    self.read_char(); // consume closing quote
                    return Token::new(TokenType::String, result, line, col);
                }
                Some('\\') => {
                    self.read_char(); // consume backslash
                    match self.read_escape_sequence() {
                        Some(escaped) => result.push(escaped),
                        None => {
                            // EOF right after backslash inside a string.
                            // Keep the raw backslash in the token literal and terminate.
                            result.push('\\');
                            return Token::new(TokenType::UnterminatedString, result, line, col);
                        }
                    }
                }
                Some(c) => {
                    result.push(c);
                    self.read_char();
                }
            }
        }
    }

    /// Process an escape sequence after seeing backslash
    fn read_escape_sequence(&mut self) -> Option<char> {
        let result = match self.current_char {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some('\\') => Some('\\'),
            Some('"') => Some('"'),
            Some(c) => {
                // Unknown escape - emit warning and return the character as-is
                self.warnings.push(LexerWarning {
                    message: format!(
                        "Unknown escape sequence '\\{}'. Valid escapes are: \\n \\t \\r \\\\ \\\"",
                        c
                    ),
                    position: Position::new(self.line, self.column),
                });
                Some(c)
            }
            None => None,
        };
        if self.current_char.is_some() {
            self.read_char();
        }
        result
    }

    /// Skip a block comment (/* ... */) with support for nesting.
    /// Entry: current_char is '/' and peek_char is '*' (this function consumes both).
    /// Returns true if the comment was properly closed, false if EOF was reached.
    fn skip_block_comment(&mut self) -> bool {
        debug_assert!(
            self.current_char == Some('/') && self.peek_char() == Some('*'),
            "skip_block_comment expects current_char == '/' and peek_char == '*'"
        );
        let mut nesting_depth = 1;

        self.read_char(); // consume '/'
        self.read_char(); // consume '*'

        while self.current_char.is_some() {
            if self.current_char == Some('*') && self.peek_char() == Some('/') {
                self.read_char(); // consume '*'
                self.read_char(); // consume '/'
                nesting_depth -= 1;
                if nesting_depth == 0 {
                    return true;
                }
            } else if self.current_char == Some('/') && self.peek_char() == Some('*') {
                self.read_char(); // consume '/'
                self.read_char(); // consume '*'
                nesting_depth += 1;
            } else {
                self.read_char();
            }
        }

        // Reached EOF without closing all comments
        false
    }
}

fn is_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_operator_char(ch: char) -> bool {
    matches!(
        ch,
        '!' | '@' | '#' | '$' | '%' | '^' | '&' | '*' | '-' | '+' | '=' | '|' | '<' | '>' | '?'
            | '/' | ':' | '~'
    )
}
