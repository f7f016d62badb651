pub mod lexer;
pub mod notation;
pub mod parser;
pub mod program;
pub mod token;
pub mod token_type;

pub use lexer::Lexer;
pub use notation::{Assoc, NotationDecl, NotationRule, NotationTable};
pub use parser::Parser;
pub use program::{Decl, Program};
pub use token::Token;
pub use token_type::TokenType;
