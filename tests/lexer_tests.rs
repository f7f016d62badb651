use gale::syntax::{Lexer, TokenType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_tokens() {
        let input = "(){},;.";
        let mut lexer = Lexer::new(input);

        let expected = vec![
            TokenType::LParen,
            TokenType::RParen,
            TokenType::LBrace,
            TokenType::RBrace,
            TokenType::Comma,
            TokenType::Semicolon,
            TokenType::Dot,
            TokenType::Eof,
        ];

        for expected_type in expected {
            let tok = lexer.next_token();
            assert_eq!(
                tok.token_type, expected_type,
                "Expected {:?}",
                expected_type
            );
        }
    }

    #[test]
    fn keywords() {
        let input = "fun return use as notation with precedence associativity true false";
        let mut lexer = Lexer::new(input);

        let expected = vec![
            TokenType::Fun,
            TokenType::Return,
            TokenType::Use,
            TokenType::As,
            TokenType::Notation,
            TokenType::With,
            TokenType::Precedence,
            TokenType::Associativity,
            TokenType::True,
            TokenType::False,
        ];

        for expected_type in expected {
            assert_eq!(lexer.next_token().token_type, expected_type);
        }
    }

    #[test]
    fn associativity_names_are_plain_identifiers() {
        let mut lexer = Lexer::new("left right none");
        for literal in ["left", "right", "none"] {
            let tok = lexer.next_token();
            assert_eq!(tok.token_type, TokenType::Ident);
            assert_eq!(tok.literal, literal);
        }
    }

    #[test]
    fn operator_runs_are_maximal() {
        let mut lexer = Lexer::new("a <+> b |> c");

        assert_eq!(lexer.next_token().literal, "a");
        let op = lexer.next_token();
        assert_eq!(op.token_type, TokenType::Operator);
        assert_eq!(op.literal, "<+>");
        assert_eq!(lexer.next_token().literal, "b");
        let op = lexer.next_token();
        assert_eq!(op.token_type, TokenType::Operator);
        assert_eq!(op.literal, "|>");
    }

    #[test]
    fn assign_and_template_assign_are_reserved() {
        let mut lexer = Lexer::new("x = 1 y := 2 z == 3");

        assert_eq!(lexer.next_token().literal, "x");
        assert_eq!(lexer.next_token().token_type, TokenType::Assign);
        assert_eq!(lexer.next_token().token_type, TokenType::Int);
        assert_eq!(lexer.next_token().literal, "y");
        assert_eq!(lexer.next_token().token_type, TokenType::TemplateAssign);
        assert_eq!(lexer.next_token().token_type, TokenType::Int);
        assert_eq!(lexer.next_token().literal, "z");
        // `==` is a plain operator run, not two assigns.
        let op = lexer.next_token();
        assert_eq!(op.token_type, TokenType::Operator);
        assert_eq!(op.literal, "==");
    }

    #[test]
    fn numbers() {
        let mut lexer = Lexer::new("5 10.25 3.one");

        let tok = lexer.next_token();
        assert_eq!(tok.token_type, TokenType::Int);
        assert_eq!(tok.literal, "5");

        let tok = lexer.next_token();
        assert_eq!(tok.token_type, TokenType::Float);
        assert_eq!(tok.literal, "10.25");

        // A dot not followed by a digit is not part of the number.
        let tok = lexer.next_token();
        assert_eq!(tok.token_type, TokenType::Int);
        assert_eq!(tok.literal, "3");
        assert_eq!(lexer.next_token().token_type, TokenType::Dot);
        assert_eq!(lexer.next_token().literal, "one");
    }

    #[test]
    fn string_literals_and_escapes() {
        let mut lexer = Lexer::new(r#""hello \"world\"\n""#);
        let tok = lexer.next_token();
        assert_eq!(tok.token_type, TokenType::String);
        assert_eq!(tok.literal, "hello \"world\"\n");
        assert!(lexer.warnings().is_empty());
    }

    #[test]
    fn unknown_escape_warns_but_lexes() {
        let mut lexer = Lexer::new(r#""a\qb""#);
        let tok = lexer.next_token();
        assert_eq!(tok.token_type, TokenType::String);
        assert_eq!(tok.literal, "aqb");

        let warnings = lexer.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("\\q"));
    }

    #[test]
    fn unterminated_string() {
        let mut lexer = Lexer::new("\"oops\nnext");
        assert_eq!(
            lexer.next_token().token_type,
            TokenType::UnterminatedString
        );
        assert_eq!(lexer.next_token().literal, "next");
    }

    #[test]
    fn comments_are_skipped() {
        let input = "1 // line comment\n/* block /* nested */ still block */ 2";
        let mut lexer = Lexer::new(input);
        assert_eq!(lexer.next_token().literal, "1");
        assert_eq!(lexer.next_token().literal, "2");
        assert_eq!(lexer.next_token().token_type, TokenType::Eof);
    }

    #[test]
    fn unterminated_block_comment_is_reported() {
        let mut lexer = Lexer::new("1 /* never closed");
        assert_eq!(lexer.next_token().literal, "1");
        assert_eq!(
            lexer.next_token().token_type,
            TokenType::UnterminatedBlockComment
        );
    }

    #[test]
    fn comment_opener_ends_operator_run() {
        let mut lexer = Lexer::new("x +// note\ny");
        assert_eq!(lexer.next_token().literal, "x");
        let op = lexer.next_token();
        assert_eq!(op.token_type, TokenType::Operator);
        assert_eq!(op.literal, "+");
        assert_eq!(lexer.next_token().literal, "y");
    }

    #[test]
    fn positions_are_one_based_lines() {
        let mut lexer = Lexer::new("a\n  b");
        let a = lexer.next_token();
        assert_eq!(a.position.line, 1);
        assert_eq!(a.position.column, 0);
        let b = lexer.next_token();
        assert_eq!(b.position.line, 2);
        assert_eq!(b.position.column, 2);
    }

    #[test]
    fn tokenize_ends_with_eof() {
        let tokens = Lexer::new("a = 1").tokenize();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::Eof));
    }
}
