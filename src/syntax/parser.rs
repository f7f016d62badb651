//! The declaration parser.
//!
//! One pass over the token stream. Expression parsing is precedence climbing
//! driven by whatever the notation table holds at that point in the file, so
//! a `notation` declaration takes effect for everything after it. Statements
//! (`fun`, assignment, `use`, `notation`, `return`) are built in and sit
//! below every user rule; call syntax `f(x)` binds above every user rule.
//!
//! The parser lowers as it goes: function bodies become nested `Let` chains,
//! direct calls through a `use` alias become `ForeignCall` terms, and a
//! trivial alias assignment is cut into an alias edge instead of a binding.
//! References to names not yet declared parse as `Hole`, which is what lets
//! declarations arrive in any order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, Position};
use crate::term::{Literal, Term};

use super::lexer::{Lexer, LexerWarning};
use super::notation::{Assoc, NotationDecl, NotationRule, NotationTable};
use super::program::{Decl, Program};
use super::token::Token;
use super::token_type::TokenType;

const LOWEST: i32 = 0;

/// A statement inside a `{ ... }` body, before lowering.
enum BlockStmt {
    Bind(String, Term),
    Expr(Term),
    Return(Term, Position),
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    peek_token: Token,
    pub errors: Vec<Diagnostic>,
    notations: NotationTable,
    /// Scope stack for Var/Hole classification; index 0 is the top level.
    scopes: Vec<HashSet<String>>,
    /// `use` aliases seen so far, for lowering direct calls.
    foreign_aliases: HashMap<String, (String, String)>,
    tmp_counter: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self::with_notations(lexer, NotationTable::new())
    }

    /// Start from a pre-seeded rule set (embedders, tests).
    pub fn with_notations(lexer: Lexer, notations: NotationTable) -> Self {
        let mut parser = Parser {
            lexer,
            current_token: Token::new(TokenType::Eof, "", 0, 0),
            peek_token: Token::new(TokenType::Eof, "", 0, 0),
            errors: Vec::new(),
            notations,
            scopes: vec![HashSet::new()],
            foreign_aliases: HashMap::new(),
            tmp_counter: 0,
        };
        parser.next_token();
        parser.next_token();
        parser
    }

    /// The rule set after parsing, including rules the file declared.
    pub fn notations(&self) -> &NotationTable {
        &self.notations
    }

    pub fn lexer_warnings(&self) -> &[LexerWarning] {
        self.lexer.warnings()
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.is_current_token(TokenType::Eof) {
            if self.is_current_token(TokenType::Semicolon) {
                self.next_token();
                continue;
            }
            if let Some(decl) = self.parse_declaration() {
                program.decls.push(decl);
            }
            self.next_token();
        }

        program
    }

    fn next_token(&mut self) {
        self.current_token = self.peek_token.clone();
        self.peek_token = self.lexer.next_token();
    }

    /// Advance to a reasonable boundary to avoid cascading errors. Stops on a
    /// semicolon or closing brace, or just before a token that can only start
    /// a new declaration.
    fn synchronize_after_error(&mut self) {
        while !matches!(
            self.current_token.token_type,
            TokenType::Semicolon | TokenType::RBrace | TokenType::Eof
        ) && !matches!(
            self.peek_token.token_type,
            TokenType::Fun | TokenType::Use | TokenType::Notation | TokenType::Eof
        ) {
            self.next_token();
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_declaration(&mut self) -> Option<Decl> {
        match self.current_token.token_type {
            TokenType::Fun if self.is_peek_token(TokenType::Ident) => {
                let (name, term, position) = self.parse_named_fun()?;
                Some(Decl::Fun {
                    name,
                    term,
                    position,
                })
            }
            TokenType::Use => self.parse_use_declaration(),
            TokenType::Notation => {
                self.parse_notation_declaration();
                None
            }
            TokenType::Return => {
                self.errors.push(
                    Diagnostic::error("return outside a function body")
                        .with_code("E005")
                        .with_position(self.current_token.position)
                        .with_message("`return` is only valid as the last statement of a block"),
                );
                self.synchronize_after_error();
                None
            }
            TokenType::Ident if self.is_peek_token(TokenType::Assign) => {
                self.parse_assignment_declaration()
            }
            _ => {
                let position = self.current_token.position;
                let term = match self.parse_expression(LOWEST) {
                    Some(term) => term,
                    None => {
                        self.synchronize_after_error();
                        return None;
                    }
                };
                if self.is_peek_token(TokenType::Semicolon) {
                    self.next_token();
                }
                Some(Decl::Expr { term, position })
            }
        }
    }

    /// `fun name(params) { body }`, used both at the top level and nested
    /// inside blocks. The name is declared before the body is parsed so the
    /// function can refer to itself.
    fn parse_named_fun(&mut self) -> Option<(String, Term, Position)> {
        let position = self.current_token.position;

        if !self.expect_peek(TokenType::Ident) {
            self.synchronize_after_error();
            return None;
        }
        let name = self.current_token.literal.clone();
        let duplicate = self.current_scope_has(&name);
        if !duplicate {
            self.declare(&name);
        }

        if !self.expect_peek(TokenType::LParen) {
            self.synchronize_after_error();
            return None;
        }
        let params = match self.parse_function_parameters() {
            Some(params) => params,
            None => {
                self.synchronize_after_error();
                return None;
            }
        };

        if !self.expect_peek(TokenType::LBrace) {
            self.synchronize_after_error();
            return None;
        }

        self.scopes.push(params.iter().cloned().collect());
        let body = self.parse_block();
        self.scopes.pop();
        let body = body?;

        if duplicate {
            self.duplicate_definition_error(&name, position);
            return None;
        }

        let term = Term::Lambda {
            params,
            body: Arc::new(body),
        };
        Some((name, term, position))
    }

    /// `name = expr`. A bare-reference right-hand side is cut into an alias
    /// instead of allocating a binding of its own.
    fn parse_assignment_declaration(&mut self) -> Option<Decl> {
        let position = self.current_token.position;
        let name = self.current_token.literal.clone();

        self.next_token(); // onto '='
        self.next_token(); // onto the expression
        let term = match self.parse_expression(LOWEST) {
            Some(term) => term,
            None => {
                self.synchronize_after_error();
                return None;
            }
        };
        if self.is_peek_token(TokenType::Semicolon) {
            self.next_token();
        }

        if self.current_scope_has(&name) {
            self.duplicate_definition_error(&name, position);
            return None;
        }
        self.declare(&name);

        if let Some(target) = term.reference() {
            return Some(Decl::Alias {
                name,
                target: target.to_string(),
                position,
            });
        }
        Some(Decl::Assign {
            name,
            term,
            position,
        })
    }

    /// `use module.path.symbol [as alias]`
    fn parse_use_declaration(&mut self) -> Option<Decl> {
        let position = self.current_token.position;

        if !self.expect_peek(TokenType::Ident) {
            self.synchronize_after_error();
            return None;
        }
        let mut segments = vec![self.current_token.literal.clone()];
        while self.is_peek_token(TokenType::Dot) {
            self.next_token();
            if !self.expect_peek(TokenType::Ident) {
                self.synchronize_after_error();
                return None;
            }
            segments.push(self.current_token.literal.clone());
        }

        if segments.len() < 2 {
            self.errors.push(
                Diagnostic::error("incomplete use declaration")
                    .with_code("E001")
                    .with_position(position)
                    .with_message("expected `use module.symbol`, with at least one dot")
                    .with_hint("for example: use trace.print"),
            );
            self.synchronize_after_error();
            return None;
        }

        let symbol = segments
            .pop()
            .unwrap_or_default();
        let module = segments.join(".");

        let alias = if self.is_peek_token(TokenType::As) {
            self.next_token();
            if !self.expect_peek(TokenType::Ident) {
                self.synchronize_after_error();
                return None;
            }
            self.current_token.literal.clone()
        } else {
            symbol.clone()
        };

        if self.is_peek_token(TokenType::Semicolon) {
            self.next_token();
        }

        if self.current_scope_has(&alias) {
            self.duplicate_definition_error(&alias, position);
            return None;
        }
        self.declare(&alias);
        self.foreign_aliases
            .insert(alias.clone(), (module.clone(), symbol.clone()));

        Some(Decl::Use {
            module,
            symbol,
            alias,
            position,
        })
    }

    /// `notation "pattern" [with a, b] [precedence N] [associativity left] := template`
    /// Registers the rule; produces no runtime declaration.
    fn parse_notation_declaration(&mut self) {
        let position = self.current_token.position;

        if !self.expect_peek(TokenType::String) {
            self.synchronize_after_error();
            return;
        }
        let pattern = self.current_token.literal.clone();

        let placeholders = if self.is_peek_token(TokenType::With) {
            self.next_token();
            let mut names = Vec::new();
            if !self.expect_peek(TokenType::Ident) {
                self.synchronize_after_error();
                return;
            }
            names.push(self.current_token.literal.clone());
            while self.is_peek_token(TokenType::Comma) {
                self.next_token();
                if !self.expect_peek(TokenType::Ident) {
                    self.synchronize_after_error();
                    return;
                }
                names.push(self.current_token.literal.clone());
            }
            Some(names)
        } else {
            None
        };

        let precedence = if self.is_peek_token(TokenType::Precedence) {
            self.next_token();
            if !self.expect_peek(TokenType::Int) {
                self.synchronize_after_error();
                return;
            }
            match self.current_token.literal.parse::<i32>() {
                Ok(value) => Some(value),
                Err(_) => {
                    self.errors.push(
                        Diagnostic::error("invalid precedence")
                            .with_code("E001")
                            .with_position(self.current_token.position)
                            .with_message(format!(
                                "`{}` does not fit a precedence level",
                                self.current_token.literal
                            )),
                    );
                    self.synchronize_after_error();
                    return;
                }
            }
        } else {
            None
        };

        let assoc = if self.is_peek_token(TokenType::Associativity) {
            self.next_token();
            if !self.expect_peek(TokenType::Ident) {
                self.synchronize_after_error();
                return;
            }
            match Assoc::from_name(&self.current_token.literal) {
                Some(assoc) => Some(assoc),
                None => {
                    self.errors.push(
                        Diagnostic::error("invalid associativity")
                            .with_code("E001")
                            .with_position(self.current_token.position)
                            .with_message(format!(
                                "`{}` is not an associativity; expected left, right or none",
                                self.current_token.literal
                            )),
                    );
                    self.synchronize_after_error();
                    return;
                }
            }
        } else {
            None
        };

        if !self.expect_peek(TokenType::TemplateAssign) {
            self.synchronize_after_error();
            return;
        }

        self.next_token(); // onto the template expression
        let template = match self.parse_expression(LOWEST) {
            Some(term) => term,
            None => {
                self.synchronize_after_error();
                return;
            }
        };
        if self.is_peek_token(TokenType::Semicolon) {
            self.next_token();
        }

        let decl = NotationDecl {
            pattern,
            placeholders,
            precedence,
            assoc,
            template,
        };
        if let Err(diagnostic) = self.notations.register(decl) {
            self.errors.push(diagnostic.with_position(position));
        }
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// Entered on `{`; returns with the closing `}` current. Lowers the
    /// statement sequence into a nested `Let` chain ending in the block's
    /// result expression.
    fn parse_block(&mut self) -> Option<Term> {
        let open_position = self.current_token.position;
        let mut stmts: Vec<BlockStmt> = Vec::new();
        let mut failed = false;
        self.next_token();

        while !self.is_current_token(TokenType::RBrace) {
            if self.is_current_token(TokenType::Eof) {
                self.errors.push(
                    Diagnostic::error("unterminated block")
                        .with_code("E001")
                        .with_position(open_position)
                        .with_message("this `{` is never closed"),
                );
                return None;
            }
            if self.is_current_token(TokenType::Semicolon) {
                self.next_token();
                continue;
            }
            match self.parse_block_statement() {
                Some(stmt) => stmts.push(stmt),
                None => failed = true,
            }
            self.next_token();
        }

        if failed {
            return None;
        }
        self.lower_block(stmts, open_position)
    }

    fn parse_block_statement(&mut self) -> Option<BlockStmt> {
        match self.current_token.token_type {
            TokenType::Return => {
                let position = self.current_token.position;
                self.next_token();
                let term = match self.parse_expression(LOWEST) {
                    Some(term) => term,
                    None => {
                        self.synchronize_after_error();
                        return None;
                    }
                };
                if self.is_peek_token(TokenType::Semicolon) {
                    self.next_token();
                }
                Some(BlockStmt::Return(term, position))
            }
            TokenType::Fun if self.is_peek_token(TokenType::Ident) => {
                let (name, term, _) = self.parse_named_fun()?;
                Some(BlockStmt::Bind(name, term))
            }
            TokenType::Ident if self.is_peek_token(TokenType::Assign) => {
                let name = self.current_token.literal.clone();
                self.next_token(); // onto '='
                self.next_token(); // onto the expression
                let term = match self.parse_expression(LOWEST) {
                    Some(term) => term,
                    None => {
                        self.synchronize_after_error();
                        return None;
                    }
                };
                if self.is_peek_token(TokenType::Semicolon) {
                    self.next_token();
                }
                self.declare(&name);
                Some(BlockStmt::Bind(name, term))
            }
            _ => {
                let term = match self.parse_expression(LOWEST) {
                    Some(term) => term,
                    None => {
                        self.synchronize_after_error();
                        return None;
                    }
                };
                if self.is_peek_token(TokenType::Semicolon) {
                    self.next_token();
                }
                Some(BlockStmt::Expr(term))
            }
        }
    }

    fn lower_block(&mut self, mut stmts: Vec<BlockStmt>, open_position: Position) -> Option<Term> {
        if stmts.is_empty() {
            self.errors.push(
                Diagnostic::error("empty function body")
                    .with_code("E005")
                    .with_position(open_position)
                    .with_message("a body must end in an expression that produces the result"),
            );
            return None;
        }

        // `return` terminates a block; anything after it is a mistake.
        for stmt in &stmts[..stmts.len() - 1] {
            if let BlockStmt::Return(_, position) = stmt {
                self.errors.push(
                    Diagnostic::error("unreachable statements after return")
                        .with_code("E005")
                        .with_position(*position)
                        .with_message("`return` must be the last statement of its block"),
                );
                return None;
            }
        }

        let mut term = match stmts.pop()? {
            BlockStmt::Return(term, _) | BlockStmt::Expr(term) => term,
            BlockStmt::Bind(name, bound) => Term::Let {
                name: name.clone(),
                bound: Arc::new(bound),
                body: Arc::new(Term::Var(name)),
            },
        };

        for stmt in stmts.into_iter().rev() {
            term = match stmt {
                BlockStmt::Bind(name, bound) => Term::Let {
                    name,
                    bound: Arc::new(bound),
                    body: Arc::new(term),
                },
                // A dropped expression still gets a graph node, and therefore
                // still reduces; only its value is unused.
                BlockStmt::Expr(bound) => Term::Let {
                    name: self.fresh_tmp(),
                    bound: Arc::new(bound),
                    body: Arc::new(term),
                },
                BlockStmt::Return(..) => unreachable!("validated above"),
            };
        }

        Some(term)
    }

    fn fresh_tmp(&mut self) -> String {
        let name = format!("%tmp{}", self.tmp_counter);
        self.tmp_counter += 1;
        name
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self, min_precedence: i32) -> Option<Term> {
        let mut left = self.parse_leading()?;

        loop {
            if self.is_peek_token(TokenType::LParen) {
                // Call postfix binds above every notation rule.
                self.next_token();
                left = self.parse_call(left)?;
                continue;
            }

            let trigger = match self.peek_token.token_type {
                TokenType::Operator | TokenType::Ident => self.peek_token.literal.clone(),
                _ => break,
            };
            let Some(rule) = self.notations.continuation_rule(&trigger) else {
                break;
            };
            if rule.precedence <= min_precedence {
                break;
            }

            self.next_token(); // onto the trigger literal
            left = self.parse_continuation(left, &rule)?;

            if rule.assoc == Assoc::Nonassoc
                && let Some(next_rule) = self.peek_continuation_rule()
                && next_rule.precedence == rule.precedence
                && next_rule.assoc == Assoc::Nonassoc
            {
                self.errors.push(
                    Diagnostic::error("non-associative notation chained")
                        .with_code("E105")
                        .with_position(self.peek_token.position)
                        .with_message(format!(
                            "`{}` does not associate; parenthesize one side",
                            self.peek_token.literal
                        )),
                );
                return None;
            }
        }

        Some(left)
    }

    fn peek_continuation_rule(&self) -> Option<Arc<NotationRule>> {
        match self.peek_token.token_type {
            TokenType::Operator | TokenType::Ident => {
                self.notations.continuation_rule(&self.peek_token.literal)
            }
            _ => None,
        }
    }

    fn parse_leading(&mut self) -> Option<Term> {
        match self.current_token.token_type {
            TokenType::Int => match self.current_token.literal.parse::<i64>() {
                Ok(value) => Some(Term::Literal(Literal::Int(value))),
                Err(_) => {
                    self.invalid_literal_error("integer");
                    None
                }
            },
            TokenType::Float => match self.current_token.literal.parse::<f64>() {
                Ok(value) => Some(Term::Literal(Literal::Float(value))),
                Err(_) => {
                    self.invalid_literal_error("float");
                    None
                }
            },
            TokenType::String => Some(Term::Literal(Literal::Str(
                self.current_token.literal.clone(),
            ))),
            TokenType::True => Some(Term::Literal(Literal::Bool(true))),
            TokenType::False => Some(Term::Literal(Literal::Bool(false))),
            TokenType::Ident => {
                let name = self.current_token.literal.clone();
                if let Some(rule) = self.notations.leading_rule(&name) {
                    return self.parse_leading_rule(&rule);
                }
                Some(self.name_term(&name))
            }
            TokenType::Operator => {
                let symbol = self.current_token.literal.clone();
                if let Some(rule) = self.notations.leading_rule(&symbol) {
                    return self.parse_leading_rule(&rule);
                }
                self.unknown_symbol_error(&symbol);
                None
            }
            TokenType::LParen => {
                self.next_token();
                let inner = self.parse_expression(LOWEST)?;
                if !self.expect_peek(TokenType::RParen) {
                    return None;
                }
                Some(inner)
            }
            TokenType::Fun if self.is_peek_token(TokenType::LParen) => self.parse_lambda(),
            TokenType::UnterminatedString => {
                self.errors.push(
                    Diagnostic::error("unterminated string")
                        .with_code("E001")
                        .with_position(self.current_token.position)
                        .with_message("strings cannot span lines; close the quote"),
                );
                None
            }
            TokenType::UnterminatedBlockComment => {
                self.errors.push(
                    Diagnostic::error("unterminated block comment")
                        .with_code("E001")
                        .with_position(self.current_token.position),
                );
                None
            }
            TokenType::Illegal => {
                self.errors.push(
                    Diagnostic::error("unexpected character")
                        .with_code("E001")
                        .with_position(self.current_token.position)
                        .with_message(format!(
                            "`{}` cannot appear in a program",
                            self.current_token.literal
                        )),
                );
                None
            }
            _ => {
                self.no_leading_parse_error();
                None
            }
        }
    }

    /// Anonymous `fun (params) { body }` in expression position.
    fn parse_lambda(&mut self) -> Option<Term> {
        if !self.expect_peek(TokenType::LParen) {
            return None;
        }
        let params = self.parse_function_parameters()?;
        if !self.expect_peek(TokenType::LBrace) {
            return None;
        }
        self.scopes.push(params.iter().cloned().collect());
        let body = self.parse_block();
        self.scopes.pop();
        Some(Term::Lambda {
            params,
            body: Arc::new(body?),
        })
    }

    /// Finish a rule whose first fragment is the literal now current.
    fn parse_leading_rule(&mut self, rule: &NotationRule) -> Option<Term> {
        self.parse_rule_fragments(rule, 1, Vec::new())
    }

    /// Finish a rule whose first fragment was the already-parsed `left` and
    /// whose trigger literal is now current.
    fn parse_continuation(&mut self, left: Term, rule: &NotationRule) -> Option<Term> {
        self.parse_rule_fragments(rule, 2, vec![left])
    }

    fn parse_rule_fragments(
        &mut self,
        rule: &NotationRule,
        start: usize,
        mut args: Vec<Term>,
    ) -> Option<Term> {
        use super::notation::Fragment;

        let last = rule.fragments.len() - 1;
        for (index, fragment) in rule.fragments.iter().enumerate().skip(start) {
            match fragment {
                Fragment::Literal(text) => {
                    if !self.expect_peek_literal(text) {
                        return None;
                    }
                }
                Fragment::Placeholder(_) => {
                    self.next_token();
                    // Inner placeholders are delimited by the next literal;
                    // a trailing placeholder binds by associativity.
                    let min = if index == last {
                        rule.rhs_precedence()
                    } else {
                        LOWEST
                    };
                    args.push(self.parse_expression(min)?);
                }
            }
        }
        Some(rule.expand(&args))
    }

    /// Call arguments for `callee(...)`; the opening paren is current.
    /// Direct calls through a `use` alias lower to `ForeignCall` here; the
    /// same alias passed around as a value dispatches at run time instead.
    fn parse_call(&mut self, callee: Term) -> Option<Term> {
        let args = self.parse_expression_list(TokenType::RParen)?;

        if let Some(name) = callee.reference()
            && !self.is_locally_bound(name)
            && let Some((module, symbol)) = self.foreign_aliases.get(name)
        {
            return Some(Term::ForeignCall {
                module: module.clone(),
                symbol: symbol.clone(),
                args: args.into_iter().map(Arc::new).collect(),
            });
        }

        Some(Term::Apply {
            callee: Arc::new(callee),
            args: args.into_iter().map(Arc::new).collect(),
        })
    }

    fn parse_expression_list(&mut self, end: TokenType) -> Option<Vec<Term>> {
        let mut list = Vec::new();

        if self.is_peek_token(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(LOWEST)?);

        while self.is_peek_token(TokenType::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(LOWEST)?);
        }

        if !self.expect_peek(end) {
            return None;
        }

        Some(list)
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<String>> {
        let mut identifiers: Vec<String> = Vec::new();

        if self.is_peek_token(TokenType::RParen) {
            self.next_token();
            return Some(identifiers);
        }

        if !self.expect_peek(TokenType::Ident) {
            return None;
        }
        identifiers.push(self.current_token.literal.clone());

        while self.is_peek_token(TokenType::Comma) {
            self.next_token();
            if !self.expect_peek(TokenType::Ident) {
                return None;
            }
            let name = self.current_token.literal.clone();
            if identifiers.contains(&name) {
                self.errors.push(
                    Diagnostic::error("duplicate parameter")
                        .with_code("E004")
                        .with_position(self.current_token.position)
                        .with_message(format!("`{}` is already a parameter", name)),
                );
                return None;
            }
            identifiers.push(name);
        }

        if !self.expect_peek(TokenType::RParen) {
            return None;
        }

        Some(identifiers)
    }

    // ------------------------------------------------------------------
    // Scopes and small helpers
    // ------------------------------------------------------------------

    fn name_term(&self, name: &str) -> Term {
        if self.is_declared(name) {
            Term::Var(name.to_string())
        } else {
            Term::Hole(name.to_string())
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    fn is_locally_bound(&self, name: &str) -> bool {
        self.scopes[1..].iter().any(|scope| scope.contains(name))
    }

    fn current_scope_has(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn is_current_token(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    fn is_peek_token(&self, token_type: TokenType) -> bool {
        self.peek_token.token_type == token_type
    }

    fn expect_peek(&mut self, token_type: TokenType) -> bool {
        if self.is_peek_token(token_type) {
            self.next_token();
            true
        } else {
            self.peek_error(token_type);
            false
        }
    }

    /// Like `expect_peek`, but for a notation fragment literal, which may be
    /// an operator or a plain word.
    fn expect_peek_literal(&mut self, text: &str) -> bool {
        let matches = matches!(
            self.peek_token.token_type,
            TokenType::Operator | TokenType::Ident
        ) && self.peek_token.literal == text;
        if matches {
            self.next_token();
            true
        } else {
            self.errors.push(
                Diagnostic::error(format!("expected `{}`", text))
                    .with_code("E001")
                    .with_position(self.peek_token.position)
                    .with_message(format!(
                        "the notation expects `{}` here, found `{}`",
                        text, self.peek_token.literal
                    )),
            );
            false
        }
    }

    fn peek_error(&mut self, expected: TokenType) {
        self.errors.push(
            Diagnostic::error(format!(
                "expected {}, got {}",
                expected, self.peek_token.token_type
            ))
            .with_code("E001")
            .with_position(self.peek_token.position)
            .with_message("unexpected token"),
        );
    }

    fn no_leading_parse_error(&mut self) {
        self.errors.push(
            Diagnostic::error(format!(
                "no expression starts with {}",
                self.current_token.token_type
            ))
            .with_code("E003")
            .with_position(self.current_token.position)
            .with_message("expected an expression here"),
        );
    }

    fn unknown_symbol_error(&mut self, symbol: &str) {
        self.errors.push(
            Diagnostic::error(format!("unknown symbol `{}`", symbol))
                .with_code("E002")
                .with_position(self.current_token.position)
                .with_message("no notation rule matches this symbol")
                .with_hint(format!(
                    "declare one first, e.g. notation \"$x {} $y\" precedence 10 \
                     associativity left := combine(x, y)",
                    symbol
                )),
        );
    }

    fn invalid_literal_error(&mut self, kind: &str) {
        self.errors.push(
            Diagnostic::error(format!("invalid {} literal", kind))
                .with_code("E001")
                .with_position(self.current_token.position)
                .with_message(format!(
                    "`{}` does not fit in a {} value",
                    self.current_token.literal, kind
                )),
        );
    }

    fn duplicate_definition_error(&mut self, name: &str, position: Position) {
        self.errors.push(
            Diagnostic::error(format!("duplicate definition of `{}`", name))
                .with_code("E004")
                .with_position(position)
                .with_message("top-level names are bound once")
                .with_hint("bind a new name instead of redefining this one"),
        );
    }
}
