//! 재귀 하강 파서
//!
//! 구문 에러는 `?`로 즉시 전파됩니다. 단, 액션 문장 안의 구문 에러는 기록한 뒤
//! 다음 `;` 또는 `end`까지 건너뛰고 파싱을 이어갑니다.

use std::collections::HashSet;

use sluice_core::value::{Value, ValueType};

use super::errors::{ParseError, ParseErrorKind};
use super::lexer::{LineIndex, Spanned, Token};
use super::typecheck::{CallArgs, Checker};
use crate::ast::{
    ArithmeticOp, ComparisonOp, Expr, ExprKind, MatchPolicy, Position, Stage, Statement, UnaryOp,
};
use crate::function::FunctionRegistry;

type PResult<T> = Result<T, ParseError>;

/// 파싱된 규칙 구성 요소
pub(crate) struct RuleParts {
    pub name: String,
    pub when: Expr,
    pub then: Vec<Statement>,
}

/// 파싱된 파이프라인 구성 요소
pub(crate) struct PipelineParts {
    pub name: String,
    pub stages: Vec<Stage>,
}

pub(crate) struct Parser<'s, 'r> {
    tokens: Vec<Spanned>,
    cursor: usize,
    lines: LineIndex<'s>,
    eof: usize,
    checker: Checker<'r>,
    /// 복구된 구문 에러
    errors: Vec<ParseError>,
}

impl<'s, 'r> Parser<'s, 'r> {
    pub fn new(source: &'s str, tokens: Vec<Spanned>, registry: &'r FunctionRegistry) -> Self {
        Self {
            tokens,
            cursor: 0,
            lines: LineIndex::new(source),
            eof: source.len(),
            checker: Checker::new(registry),
            errors: Vec::new(),
        }
    }

    /// 구문 에러와 타입 에러를 위치 순으로 합칩니다.
    pub fn finish(self, fatal: Option<ParseError>) -> Vec<ParseError> {
        let mut errors = self.errors;
        errors.extend(self.checker.into_errors());
        errors.extend(fatal);
        errors.sort_by_key(|e| (e.line, e.position_in_line));
        errors
    }

    // ── 토큰 커서 ──────────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + ahead).map(|s| &s.token)
    }

    fn pos(&self) -> Position {
        let offset = self
            .tokens
            .get(self.cursor)
            .map(|s| s.span.start)
            .unwrap_or(self.eof);
        self.lines.position(offset)
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_owned(),
        };
        ParseError::syntax(self.pos(), format!("expected {expected}, found {found}"))
    }

    fn expect(&mut self, expected: &Token) -> PResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn expect_string(&mut self, what: &str) -> PResult<String> {
        match self.peek() {
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.cursor += 1;
                Ok(s)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_ident(&mut self, what: &str) -> PResult<String> {
        match self.peek() {
            Some(Token::Ident(s)) => {
                let s = s.clone();
                self.cursor += 1;
                Ok(s)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_eof(&self) -> PResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of input")),
        }
    }

    /// 다음 `;`(소비) 또는 `end`(소비하지 않음)까지 건너뜁니다.
    fn recover(&mut self) {
        while let Some(token) = self.peek() {
            match token {
                Token::Semicolon => {
                    self.cursor += 1;
                    return;
                }
                Token::End => return,
                _ => self.cursor += 1,
            }
        }
    }

    // ── 규칙 ───────────────────────────────────────────────────

    /// `rule "name" when <expr> then <statement>* end`
    pub fn rule(&mut self) -> PResult<RuleParts> {
        self.expect(&Token::Rule)?;
        let name = self.expect_string("rule name")?;
        self.expect(&Token::When)?;
        let when = self.expression()?;
        let when = self.checker.condition(when);
        self.expect(&Token::Then)?;

        let mut then = Vec::new();
        while !self.check(&Token::End) && self.peek().is_some() {
            match self.statement() {
                Ok(statement) => then.push(statement),
                Err(e) => {
                    self.errors.push(e);
                    self.recover();
                }
            }
        }
        self.expect(&Token::End)?;
        self.expect_eof()?;
        Ok(RuleParts { name, when, then })
    }

    fn statement(&mut self) -> PResult<Statement> {
        if self.eat(&Token::Let) {
            let name = self.expect_ident("variable name")?;
            self.expect(&Token::Assign)?;
            let expr = self.expression()?;
            self.expect(&Token::Semicolon)?;
            self.checker.declare(&name, expr.ty);
            return Ok(Statement::Let { name, expr });
        }

        let pos = self.pos();
        let is_call = matches!(self.peek(), Some(Token::Ident(_)))
            && self.peek_at(1) == Some(&Token::LParen);
        if !is_call {
            return Err(ParseError::syntax(
                pos,
                "only function calls and 'let' are allowed as statements",
            ));
        }
        let expr = self.expression()?;
        self.expect(&Token::Semicolon)?;
        Ok(Statement::Expr(expr))
    }

    // ── 파이프라인 ─────────────────────────────────────────────

    /// `pipeline "name" (stage N match all|either|pass (rule "x";)*)* end`
    pub fn pipeline(&mut self) -> PResult<PipelineParts> {
        self.expect(&Token::Pipeline)?;
        let name = self.expect_string("pipeline name")?;

        let mut stages = Vec::new();
        let mut ordinals = HashSet::new();
        while self.check(&Token::Stage) {
            let stage_pos = self.pos();
            let stage = self.stage()?;
            if !ordinals.insert(stage.ordinal) {
                self.checker.error(
                    ParseErrorKind::DuplicateStage,
                    stage_pos,
                    format!("stage {} is declared more than once", stage.ordinal),
                );
            }
            stages.push(stage);
        }

        self.expect(&Token::End)?;
        self.expect_eof()?;
        Ok(PipelineParts { name, stages })
    }

    fn stage(&mut self) -> PResult<Stage> {
        self.expect(&Token::Stage)?;
        let negative = self.eat(&Token::Minus);
        let ordinal_pos = self.pos();
        let Some(&Token::Long(n)) = self.peek() else {
            return Err(self.unexpected("stage number"));
        };
        self.cursor += 1;
        let n = if negative { -n } else { n };
        let ordinal = i32::try_from(n).map_err(|_| {
            ParseError::syntax(ordinal_pos, format!("stage number {n} is out of range"))
        })?;

        self.expect(&Token::Match)?;
        let policy_pos = self.pos();
        let policy_name = self.expect_ident("'all', 'either' or 'pass'")?;
        let policy = match policy_name.as_str() {
            "all" => MatchPolicy::All,
            "either" => MatchPolicy::Either,
            "pass" => MatchPolicy::Pass,
            other => {
                self.checker.error(
                    ParseErrorKind::InvalidStageMatch,
                    policy_pos,
                    format!("unknown match policy '{other}', expected all, either or pass"),
                );
                MatchPolicy::All
            }
        };

        let mut rule_refs = Vec::new();
        while self.eat(&Token::Rule) {
            rule_refs.push(self.expect_string("rule name")?);
            self.expect(&Token::Semicolon)?;
        }
        Ok(Stage::new(ordinal, policy, rule_refs))
    }

    // ── 표현식 ─────────────────────────────────────────────────

    pub fn expression(&mut self) -> PResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let mut left = self.and_expr()?;
        while self.check(&Token::Or) {
            let pos = self.pos();
            self.cursor += 1;
            let right = self.and_expr()?;
            left = self.checker.logical(false, left, right, pos);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let mut left = self.not_expr()?;
        while self.check(&Token::And) {
            let pos = self.pos();
            self.cursor += 1;
            let right = self.not_expr()?;
            left = self.checker.logical(true, left, right, pos);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> PResult<Expr> {
        if self.check(&Token::Not) {
            let pos = self.pos();
            self.cursor += 1;
            let operand = self.not_expr()?;
            return Ok(self.checker.unary(UnaryOp::Not, operand, pos));
        }
        self.equality()
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => ComparisonOp::Eq,
                Some(Token::NotEq) => ComparisonOp::NotEq,
                _ => return Ok(left),
            };
            let pos = self.pos();
            self.cursor += 1;
            let right = self.relational()?;
            left = self.checker.comparison(op, left, right, pos);
        }
    }

    fn relational(&mut self) -> PResult<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => ComparisonOp::Lt,
                Some(Token::LtEq) => ComparisonOp::Le,
                Some(Token::Gt) => ComparisonOp::Gt,
                Some(Token::GtEq) => ComparisonOp::Ge,
                _ => return Ok(left),
            };
            let pos = self.pos();
            self.cursor += 1;
            let right = self.additive()?;
            left = self.checker.comparison(op, left, right, pos);
        }
    }

    fn additive(&mut self) -> PResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithmeticOp::Add,
                Some(Token::Minus) => ArithmeticOp::Sub,
                _ => return Ok(left),
            };
            let pos = self.pos();
            self.cursor += 1;
            let right = self.multiplicative()?;
            left = self.checker.arithmetic(op, left, right, pos);
        }
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithmeticOp::Mul,
                Some(Token::Slash) => ArithmeticOp::Div,
                Some(Token::Percent) => ArithmeticOp::Rem,
                _ => return Ok(left),
            };
            let pos = self.pos();
            self.cursor += 1;
            let right = self.unary()?;
            left = self.checker.arithmetic(op, left, right, pos);
        }
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.check(&Token::Minus) {
            let pos = self.pos();
            self.cursor += 1;
            let operand = self.unary()?;
            return Ok(self.checker.unary(UnaryOp::Negate, operand, pos));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.check(&Token::Dot) {
                self.cursor += 1;
                let pos = self.pos();
                let field = self.field_name()?;
                expr = self.checker.field_access(expr, field, pos);
            } else if self.check(&Token::LBracket) {
                let pos = self.pos();
                self.cursor += 1;
                let index = self.expression()?;
                self.expect(&Token::RBracket)?;
                expr = self.checker.index(expr, index, pos);
            } else {
                return Ok(expr);
            }
        }
    }

    /// `.` 뒤의 필드 이름. 식별자, 백틱 식별자, 키워드를 허용합니다.
    fn field_name(&mut self) -> PResult<String> {
        let name = match self.peek() {
            Some(Token::Ident(name) | Token::QuotedIdent(name)) => name.clone(),
            Some(Token::And) => "and".to_owned(),
            Some(Token::Or) => "or".to_owned(),
            Some(Token::Not) => "not".to_owned(),
            Some(token) => match token.keyword_text() {
                Some(keyword) => keyword.to_owned(),
                None => return Err(self.unexpected("field name")),
            },
            None => return Err(self.unexpected("field name")),
        };
        self.cursor += 1;
        Ok(name)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let pos = self.pos();
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };

        match token {
            Token::Str(s) => {
                self.cursor += 1;
                Ok(Expr::literal(Value::String(s), pos))
            }
            Token::Long(n) => {
                self.cursor += 1;
                Ok(Expr::literal(Value::Long(n), pos))
            }
            Token::Double(d) => {
                self.cursor += 1;
                Ok(Expr::literal(Value::Double(d), pos))
            }
            Token::Bool(b) => {
                self.cursor += 1;
                Ok(Expr::literal(Value::Boolean(b), pos))
            }
            Token::MessageRef => {
                self.cursor += 1;
                if self.eat(&Token::Dot) {
                    let field = self.field_name()?;
                    return Ok(Expr::new(
                        ExprKind::FieldRef(field),
                        ValueType::Any,
                        pos,
                    ));
                }
                Ok(Expr::new(
                    ExprKind::MessageRef,
                    ValueType::Map,
                    pos,
                ))
            }
            Token::LBracket => {
                self.cursor += 1;
                let items = self.comma_separated(&Token::RBracket, Self::expression)?;
                Ok(self.checker.list(items, pos))
            }
            Token::LBrace => {
                self.cursor += 1;
                let entries = self.comma_separated(&Token::RBrace, Self::map_entry)?;
                Ok(self.checker.map(entries, pos))
            }
            Token::LParen => {
                self.cursor += 1;
                let expr = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(name) => {
                self.cursor += 1;
                if self.eat(&Token::LParen) {
                    let args = self.call_args()?;
                    return Ok(self.checker.call(&name, pos, args));
                }
                Ok(self.checker.variable(&name, pos))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn map_entry(&mut self) -> PResult<(String, Expr)> {
        let key = match self.peek() {
            Some(Token::Ident(key) | Token::Str(key) | Token::QuotedIdent(key)) => key.clone(),
            _ => return Err(self.unexpected("map key")),
        };
        self.cursor += 1;
        self.expect(&Token::Colon)?;
        let value = self.expression()?;
        Ok((key, value))
    }

    /// 닫는 토큰까지 쉼표로 구분된 항목을 읽습니다 (닫는 토큰 소비).
    fn comma_separated<T>(
        &mut self,
        close: &Token,
        mut item: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<T>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.eat(close) {
                return Ok(items);
            }
            if !self.eat(&Token::Comma) {
                return Err(self.unexpected(&format!("',' or {close}")));
            }
        }
    }

    /// `(` 뒤의 인자 목록. 모두 위치 인자이거나 모두 이름 있는 인자여야 합니다.
    fn call_args(&mut self) -> PResult<CallArgs> {
        let named = matches!(self.peek(), Some(Token::Ident(_)))
            && self.peek_at(1) == Some(&Token::Colon);
        if !named {
            let args = self.comma_separated(&Token::RParen, Self::positional_arg)?;
            return Ok(CallArgs::Positional(args));
        }
        let args = self.comma_separated(&Token::RParen, Self::named_arg)?;
        Ok(CallArgs::Named(args))
    }

    fn positional_arg(&mut self) -> PResult<Expr> {
        if matches!(self.peek(), Some(Token::Ident(_))) && self.peek_at(1) == Some(&Token::Colon) {
            return Err(ParseError::syntax(
                self.pos(),
                "cannot mix named and positional arguments",
            ));
        }
        self.expression()
    }

    fn named_arg(&mut self) -> PResult<(String, Position, Expr)> {
        let pos = self.pos();
        let name = match self.peek() {
            Some(Token::Ident(name)) if self.peek_at(1) == Some(&Token::Colon) => name.clone(),
            _ => {
                return Err(ParseError::syntax(
                    pos,
                    "cannot mix named and positional arguments",
                ));
            }
        };
        self.cursor += 2;
        let value = self.expression()?;
        Ok((name, pos, value))
    }
}
