//! Recursive-descent, Pratt-style parser (spec §4.2).

use std::rc::Rc;

use crate::{
    ast::{
        AssignTarget, BinaryOp, Expr, ExprKind, FStringSegment, FuncDef, MapKey, Program, Stmt, StmtKind, UnaryOp,
    },
    error::{GridError, GridResult},
    token::{FStringPart, Token, TokenKind},
};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(&mut self) -> GridResult<Program> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::Eof) {
            statements.push(self.parse_stmt()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    /// Consumes any run of `Newline` tokens. Called between statements
    /// (spec §5 "Statements are newline- or `}`-terminated") and around
    /// bracketed lists, where a newline is just layout.
    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.check(&TokenKind::Eof) {
            self.pos += 1;
        }
        self.previous()
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> GridResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek().clone();
            Err(GridError::parse(tok.line, tok.col, format!("expected {what}, found {}", tok.kind)))
        }
    }

    fn expect_identifier(&mut self) -> GridResult<String> {
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            let tok = self.peek().clone();
            Err(GridError::parse(tok.line, tok.col, format!("expected identifier, found {}", tok.kind)))
        }
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> GridResult<Stmt> {
        let start = self.peek().clone();
        let kind = match &start.kind {
            TokenKind::If => return self.parse_if(),
            TokenKind::While => return self.parse_while(),
            TokenKind::For => return self.parse_for(),
            TokenKind::Func => return self.parse_func_def(),
            TokenKind::Return => {
                self.advance();
                if self.at_stmt_boundary() {
                    StmtKind::Return(None)
                } else {
                    let expr = self.parse_expr()?;
                    StmtKind::Return(Some(expr))
                }
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::LBrace => {
                let stmts = self.parse_block()?;
                StmtKind::Block(stmts)
            }
            _ => return self.parse_expr_or_assignment_stmt(),
        };
        Ok(Stmt::new(kind, start.line, start.col))
    }

    /// True at a statement boundary without consuming: `}`, newline, or EOF
    /// following a bare `return`.
    fn at_stmt_boundary(&self) -> bool {
        matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Newline | TokenKind::Eof)
    }

    fn parse_block(&mut self) -> GridResult<Vec<Stmt>> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        self.skip_newlines();
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
            self.skip_newlines();
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_if(&mut self) -> GridResult<Stmt> {
        let start = self.peek().clone();
        self.advance();
        let cond = self.parse_expr()?;
        let then_branch = self.parse_block()?;
        let checkpoint = self.pos;
        self.skip_newlines();
        if !self.check(&TokenKind::Else) {
            self.pos = checkpoint;
        }
        let else_branch = if self.matches(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::new(StmtKind::If { cond, then_branch, else_branch }, start.line, start.col))
    }

    fn parse_while(&mut self) -> GridResult<Stmt> {
        let start = self.peek().clone();
        self.advance();
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::While { cond, body }, start.line, start.col))
    }

    /// Parses both `for`-loop shapes (spec §4.2): `for v in iterable` and
    /// `for i, v in iterable`.
    fn parse_for(&mut self) -> GridResult<Stmt> {
        let start = self.peek().clone();
        self.advance();
        let first = self.expect_identifier()?;
        let (index_var, var) = if self.matches(&TokenKind::Comma) {
            let second = self.expect_identifier()?;
            (Some(first), second)
        } else {
            (None, first)
        };
        self.expect(&TokenKind::In, "'in'")?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::For { var, index_var, iterable, body }, start.line, start.col))
    }

    fn parse_func_def(&mut self) -> GridResult<Stmt> {
        let start = self.peek().clone();
        self.advance();
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let body: Rc<[Stmt]> = self.parse_block()?.into();
        let def = Rc::new(FuncDef { name: Some(name), params, body, line: start.line, col: start.col });
        Ok(Stmt::new(StmtKind::FuncDef(def), start.line, start.col))
    }

    /// Params are identifier-only, no defaults or varargs (spec §4.2).
    fn parse_params(&mut self) -> GridResult<Vec<String>> {
        self.expect(&TokenKind::LParen, "'('")?;
        self.skip_newlines();
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier()?);
                self.skip_newlines();
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(params)
    }

    /// Disambiguates plain expression statements from assignment forms:
    /// multi-assignment `a, b = expr`, and right-associative chained
    /// assignment `a = b = c` (spec §4.2, §8 "`a = b = c` right-associates").
    fn parse_expr_or_assignment_stmt(&mut self) -> GridResult<Stmt> {
        let start = self.peek().clone();
        let first = self.parse_expr()?;

        if self.check(&TokenKind::Comma) {
            let mut targets = vec![Self::expr_to_target(first)?];
            while self.matches(&TokenKind::Comma) {
                let e = self.parse_expr()?;
                targets.push(Self::expr_to_target(e)?);
            }
            self.expect(&TokenKind::Eq, "'=' in multi-assignment")?;
            let value = self.parse_expr()?;
            return Ok(Stmt::new(StmtKind::MultiAssignment { targets, value }, start.line, start.col));
        }

        if self.matches(&TokenKind::Eq) {
            let mut targets = vec![Self::expr_to_target(first)?];
            let mut value = self.parse_expr()?;
            while self.matches(&TokenKind::Eq) {
                targets.push(Self::expr_to_target(value)?);
                value = self.parse_expr()?;
            }
            if targets.len() == 1 {
                let target = targets.pop().expect("just pushed one target");
                return Ok(Stmt::new(StmtKind::Assignment { target, value }, start.line, start.col));
            }
            return Ok(Stmt::new(StmtKind::ChainAssignment { targets, value }, start.line, start.col));
        }

        Ok(Stmt::new(StmtKind::Expr(first), start.line, start.col))
    }

    /// Validates that an already-parsed expression is a legal assignment
    /// target: identifier, index, or member access (spec §4.2 "Assignment").
    fn expr_to_target(expr: Expr) -> GridResult<AssignTarget> {
        match expr.kind {
            ExprKind::Identifier(name) => Ok(AssignTarget::Identifier(name)),
            ExprKind::Index { target, index } => Ok(AssignTarget::Index { target, index }),
            ExprKind::MemberAccess { target, member } => Ok(AssignTarget::Member { target, member }),
            _ => Err(GridError::parse(expr.line, expr.col, "invalid assignment target")),
        }
    }

    // ---- expressions: precedence climbing ----

    fn parse_expr(&mut self) -> GridResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> GridResult<Expr> {
        let cond = self.parse_elvis()?;
        if self.matches(&TokenKind::Question) {
            let then_branch = self.parse_expr()?;
            self.expect(&TokenKind::Colon, "':' in ternary expression")?;
            let else_branch = self.parse_expr()?;
            let (line, col) = (cond.line, cond.col);
            return Ok(Expr::new(
                ExprKind::Ternary { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch: Box::new(else_branch) },
                line,
                col,
            ));
        }
        Ok(cond)
    }

    fn parse_elvis(&mut self) -> GridResult<Expr> {
        let left = self.parse_or()?;
        if self.matches(&TokenKind::QuestionColon) {
            let right = self.parse_elvis()?;
            let (line, col) = (left.line, left.col);
            return Ok(Expr::new(ExprKind::Elvis { left: Box::new(left), right: Box::new(right) }, line, col));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> GridResult<Expr> {
        let mut left = self.parse_and()?;
        while self.matches(&TokenKind::Or) {
            let right = self.parse_and()?;
            let (line, col) = (left.line, left.col);
            left = Expr::new(
                ExprKind::BinaryOp { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right) },
                line,
                col,
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> GridResult<Expr> {
        let mut left = self.parse_comparison()?;
        while self.matches(&TokenKind::And) {
            let right = self.parse_comparison()?;
            let (line, col) = (left.line, left.col);
            left = Expr::new(
                ExprKind::BinaryOp { op: BinaryOp::And, left: Box::new(left), right: Box::new(right) },
                line,
                col,
            );
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> GridResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                TokenKind::In => BinaryOp::In,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            let (line, col) = (left.line, left.col);
            left = Expr::new(ExprKind::BinaryOp { op, left: Box::new(left), right: Box::new(right) }, line, col);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> GridResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let (line, col) = (left.line, left.col);
            left = Expr::new(ExprKind::BinaryOp { op, left: Box::new(left), right: Box::new(right) }, line, col);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> GridResult<Expr> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            let (line, col) = (left.line, left.col);
            left = Expr::new(ExprKind::BinaryOp { op, left: Box::new(left), right: Box::new(right) }, line, col);
        }
        Ok(left)
    }

    /// `**` is right-associative and binds looser than unary `-`/`not`
    /// (spec §4.2 precedence table: `... multiplicative, power, unary,
    /// postfix`).
    fn parse_power(&mut self) -> GridResult<Expr> {
        let base = self.parse_unary()?;
        if self.matches(&TokenKind::StarStar) {
            let exponent = self.parse_power()?;
            let (line, col) = (base.line, base.col);
            return Ok(Expr::new(
                ExprKind::BinaryOp { op: BinaryOp::Pow, left: Box::new(base), right: Box::new(exponent) },
                line,
                col,
            ));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> GridResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let tok = self.advance().clone();
        let operand = self.parse_unary()?;
        Ok(Expr::new(ExprKind::UnaryOp { op, operand: Box::new(operand) }, tok.line, tok.col))
    }

    fn parse_postfix(&mut self) -> GridResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match &self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect_identifier()?;
                    let (line, col) = (expr.line, expr.col);
                    expr = Expr::new(ExprKind::MemberAccess { target: Box::new(expr), member }, line, col);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    let (line, col) = (expr.line, expr.col);
                    expr = Expr::new(ExprKind::Index { target: Box::new(expr), index: Box::new(index) }, line, col);
                }
                TokenKind::LParen => {
                    let args = self.parse_args()?;
                    let (line, col) = (expr.line, expr.col);
                    expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args }, line, col);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> GridResult<Vec<Expr>> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> GridResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(n), tok.line, tok.col))
            }
            TokenKind::String(ref s) => {
                let s = s.clone();
                self.advance();
                Ok(Expr::new(ExprKind::String(s), tok.line, tok.col))
            }
            TokenKind::RawRegex(ref p) => {
                let p = p.clone();
                self.advance();
                Ok(Expr::new(ExprKind::RegexLiteral(p), tok.line, tok.col))
            }
            TokenKind::FString(ref parts) => {
                let segments = parts
                    .iter()
                    .map(|p| match p {
                        FStringPart::Literal(s) => FStringSegment::Literal(s.clone()),
                        FStringPart::Path(path) => FStringSegment::Path(path.clone()),
                    })
                    .collect();
                self.advance();
                Ok(Expr::new(ExprKind::FString(segments), tok.line, tok.col))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Boolean(true), tok.line, tok.col))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Boolean(false), tok.line, tok.col))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::new(ExprKind::Null, tok.line, tok.col))
            }
            TokenKind::Identifier(ref name) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(name), tok.line, tok.col))
            }
            TokenKind::Func => self.parse_func_expr(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_map_literal(),
            _ => Err(GridError::parse(tok.line, tok.col, format!("unexpected token {}", tok.kind))),
        }
    }

    fn parse_func_expr(&mut self) -> GridResult<Expr> {
        let start = self.peek().clone();
        self.advance();
        let name = if let TokenKind::Identifier(_) = self.peek().kind { Some(self.expect_identifier()?) } else { None };
        let params = self.parse_params()?;
        let body: Rc<[Stmt]> = self.parse_block()?.into();
        let def = Rc::new(FuncDef { name, params, body, line: start.line, col: start.col });
        Ok(Expr::new(ExprKind::FuncExpr(def), start.line, start.col))
    }

    fn parse_array_literal(&mut self) -> GridResult<Expr> {
        let start = self.peek().clone();
        self.advance();
        let mut items = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                items.push(self.parse_expr()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(Expr::new(ExprKind::Array(items), start.line, start.col))
    }

    fn parse_map_literal(&mut self) -> GridResult<Expr> {
        let start = self.peek().clone();
        self.advance();
        let mut entries = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = self.parse_map_key()?;
                self.expect(&TokenKind::Colon, "':' after map key")?;
                let value = self.parse_expr()?;
                entries.push((key, value));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(Expr::new(ExprKind::Map(entries), start.line, start.col))
    }

    /// Map keys are a bare identifier (used as its literal string name), a
    /// string literal, or a bracketed computed expression (spec §4.2).
    fn parse_map_key(&mut self) -> GridResult<MapKey> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Identifier(ref name) => {
                let name = name.clone();
                self.advance();
                Ok(MapKey::Identifier(name))
            }
            TokenKind::String(ref s) => {
                let s = s.clone();
                self.advance();
                Ok(MapKey::String(s))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RBracket, "']'")?;
                Ok(MapKey::Computed(Box::new(expr)))
            }
            _ => Err(GridError::parse(tok.line, tok.col, format!("expected map key, found {}", tok.kind))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> Program {
        let tokens = Lexer::tokenize(src).unwrap();
        Parser::new(tokens).parse_program().unwrap()
    }

    #[test]
    fn precedence_mul_before_add() {
        let program = parse("1 + 2 * 3");
        let StmtKind::Expr(expr) = &program.statements[0].kind else { panic!() };
        let ExprKind::BinaryOp { op: BinaryOp::Add, right, .. } = &expr.kind else { panic!("expected top-level add") };
        assert!(matches!(right.kind, ExprKind::BinaryOp { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn power_is_right_associative() {
        let program = parse("2 ** 3 ** 2");
        let StmtKind::Expr(expr) = &program.statements[0].kind else { panic!() };
        let ExprKind::BinaryOp { op: BinaryOp::Pow, right, .. } = &expr.kind else { panic!("expected top-level pow") };
        assert!(matches!(right.kind, ExprKind::BinaryOp { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn for_loop_two_shapes() {
        let program = parse("for v in arr { }\nfor i, v in arr { }");
        assert!(matches!(&program.statements[0].kind, StmtKind::For { index_var: None, .. }));
        assert!(matches!(&program.statements[1].kind, StmtKind::For { index_var: Some(_), .. }));
    }

    #[test]
    fn multi_assignment_parses() {
        let program = parse("a, b = pair");
        assert!(matches!(&program.statements[0].kind, StmtKind::MultiAssignment { targets, .. } if targets.len() == 2));
    }

    #[test]
    fn chained_assignment_is_right_associative() {
        let program = parse("a = b = c");
        let StmtKind::ChainAssignment { targets, value } = &program.statements[0].kind else { panic!("expected chain assignment") };
        assert_eq!(targets.len(), 2);
        assert!(matches!(targets[0], AssignTarget::Identifier(ref n) if n == "a"));
        assert!(matches!(targets[1], AssignTarget::Identifier(ref n) if n == "b"));
        assert!(matches!(value.kind, ExprKind::Identifier(ref n) if n == "c"));
    }

    #[test]
    fn invalid_assignment_target_is_parse_error() {
        let tokens = Lexer::tokenize("1 = 2").unwrap();
        let err = Parser::new(tokens).parse_program().unwrap_err();
        assert!(matches!(err, GridError::Parse(_)));
    }

    #[test]
    fn ternary_and_elvis() {
        let program = parse("x ? 1 : 2");
        assert!(matches!(&program.statements[0].kind, StmtKind::Expr(e) if matches!(e.kind, ExprKind::Ternary { .. })));
        let program = parse("x ?: 2");
        assert!(matches!(&program.statements[0].kind, StmtKind::Expr(e) if matches!(e.kind, ExprKind::Elvis { .. })));
    }

    #[test]
    fn not_binds_tighter_than_comparison() {
        let program = parse("not a == b");
        let StmtKind::Expr(expr) = &program.statements[0].kind else { panic!() };
        let ExprKind::BinaryOp { op: BinaryOp::Eq, left, .. } = &expr.kind else { panic!("expected top-level eq") };
        assert!(matches!(left.kind, ExprKind::UnaryOp { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        let program = parse("-2 ** 2");
        let StmtKind::Expr(expr) = &program.statements[0].kind else { panic!() };
        let ExprKind::BinaryOp { op: BinaryOp::Pow, left, .. } = &expr.kind else { panic!("expected top-level pow") };
        assert!(matches!(left.kind, ExprKind::UnaryOp { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn in_operator_parses_at_comparison_tier() {
        let program = parse("x in arr and y");
        let StmtKind::Expr(expr) = &program.statements[0].kind else { panic!() };
        let ExprKind::BinaryOp { op: BinaryOp::And, left, .. } = &expr.kind else { panic!("expected top-level and") };
        assert!(matches!(left.kind, ExprKind::BinaryOp { op: BinaryOp::In, .. }));
    }
}
