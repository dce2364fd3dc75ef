//! 토크나이저
//!
//! [`logos`]로 규칙/파이프라인 소스를 토큰 열로 변환합니다.
//! 각 토큰은 바이트 범위를 함께 가지며, [`LineIndex`]가 이를 줄/열 위치로 바꿉니다.

use std::fmt;
use std::ops::Range;

use logos::{Lexer, Logos};

use super::errors::ParseError;
use crate::ast::Position;

/// 토큰화 실패 사유
#[derive(Debug, Clone, Default, PartialEq, thiserror::Error)]
pub enum LexError {
    #[default]
    #[error("unexpected character")]
    InvalidToken,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("number out of range")]
    NumberOverflow,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(error = LexError)]
pub enum Token {
    #[regex(r"//[^\n\r]*", logos::skip, allow_greedy = true)]
    Comment,

    #[token("rule")]
    Rule,
    #[token("when")]
    When,
    #[token("then")]
    Then,
    #[token("end")]
    End,
    #[token("pipeline")]
    Pipeline,
    #[token("stage")]
    Stage,
    #[token("match")]
    Match,
    #[token("let")]
    Let,
    #[token("and")]
    #[token("&&")]
    And,
    #[token("or")]
    #[token("||")]
    Or,
    #[token("not")]
    #[token("!")]
    Not,
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Bool(bool),

    #[token("$message")]
    MessageRef,

    #[token("\"", lex_string)]
    Str(String),
    /// 백틱으로 감싼 식별자 (공백 등 특수 문자 허용)
    #[regex(r"`[^`]*`", |lex| {
        let slice = lex.slice();
        slice[1..slice.len() - 1].to_owned()
    })]
    QuotedIdent(String),
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", parse_double)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", parse_double)]
    Double(f64),
    #[regex(r"[0-9]+", parse_long)]
    Long(i64),
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
}

impl Token {
    /// `.` 뒤에서 필드 이름으로 쓸 수 있는 키워드 텍스트
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Self::Rule => "rule",
            Self::When => "when",
            Self::Then => "then",
            Self::End => "end",
            Self::Pipeline => "pipeline",
            Self::Stage => "stage",
            Self::Match => "match",
            Self::Let => "let",
            Self::Bool(true) => "true",
            Self::Bool(false) => "false",
            _ => return None,
        };
        Some(text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "string \"{s}\""),
            Self::QuotedIdent(s) => write!(f, "`{s}`"),
            Self::Double(d) => write!(f, "{d:?}"),
            Self::Long(n) => write!(f, "{n}"),
            Self::Ident(s) => write!(f, "'{s}'"),
            Self::Bool(b) => write!(f, "'{b}'"),
            Self::MessageRef => write!(f, "'$message'"),
            Self::And => write!(f, "'and'"),
            Self::Or => write!(f, "'or'"),
            Self::Not => write!(f, "'not'"),
            Self::Comment => write!(f, "comment"),
            other => match other.keyword_text() {
                Some(keyword) => write!(f, "'{keyword}'"),
                None => write!(f, "'{}'", punctuation(other)),
            },
        }
    }
}

fn punctuation(token: &Token) -> &'static str {
    match token {
        Token::EqEq => "==",
        Token::NotEq => "!=",
        Token::LtEq => "<=",
        Token::GtEq => ">=",
        Token::Lt => "<",
        Token::Gt => ">",
        Token::Assign => "=",
        Token::Plus => "+",
        Token::Minus => "-",
        Token::Star => "*",
        Token::Slash => "/",
        Token::Percent => "%",
        Token::LParen => "(",
        Token::RParen => ")",
        Token::LBracket => "[",
        Token::RBracket => "]",
        Token::LBrace => "{",
        Token::RBrace => "}",
        Token::Comma => ",",
        Token::Colon => ":",
        Token::Semicolon => ";",
        Token::Dot => ".",
        _ => "?",
    }
}

fn parse_long(lex: &Lexer<'_, Token>) -> Result<i64, LexError> {
    lex.slice().parse().map_err(|_| LexError::NumberOverflow)
}

fn parse_double(lex: &Lexer<'_, Token>) -> Result<f64, LexError> {
    lex.slice()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
        .ok_or(LexError::NumberOverflow)
}

/// 여는 따옴표 뒤부터 닫는 따옴표까지 읽고 이스케이프를 해석합니다.
fn lex_string(lex: &mut Lexer<'_, Token>) -> Result<String, LexError> {
    let mut value = String::new();
    let mut chars = lex.remainder().char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => {
                lex.bump(offset + 1);
                return Ok(value);
            }
            '\\' => {
                let Some((escape_offset, escaped)) = chars.next() else {
                    break;
                };
                let unescaped = match escaped {
                    '"' => '"',
                    '\\' => '\\',
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => {
                        lex.bump(escape_offset + other.len_utf8());
                        return Err(LexError::InvalidEscape(other));
                    }
                };
                value.push(unescaped);
            }
            other => value.push(other),
        }
    }

    lex.bump(lex.remainder().len());
    Err(LexError::UnterminatedString)
}

/// 바이트 범위를 가진 토큰
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// 바이트 오프셋 → 줄/열 위치 변환
#[derive(Debug, Clone)]
pub struct LineIndex<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    pub fn new(source: &'s str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// 줄은 1부터, 줄 내 위치는 0부터 (문자 단위)
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        let column = self
            .source
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        Position::new(line + 1, column)
    }
}

/// 소스를 토큰화합니다. 토큰화 에러가 하나라도 있으면 에러 목록을 반환합니다.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, Vec<ParseError>> {
    let lines = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(Spanned { token, span }),
            Err(e) => {
                let reason = match e {
                    LexError::InvalidToken => {
                        format!(
                            "unexpected character '{}'",
                            source.get(span.clone()).unwrap_or("?")
                        )
                    }
                    other => other.to_string(),
                };
                errors.push(ParseError::syntax(lines.position(span.start), reason));
            }
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
