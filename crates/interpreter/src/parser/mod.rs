//! 규칙/파이프라인 소스 파서
//!
//! 소스 텍스트를 토큰화한 뒤 재귀 하강으로 파싱하면서 타입 검사를 함께 수행합니다.
//! 에러는 위치 순으로 정렬된 목록으로 한 번에 보고됩니다.
//!
//! ```text
//! rule "tag http"
//! when has_field("http_response_code")
//! then
//!     set_field("checked", "yes");
//! end
//! ```

mod errors;
mod grammar;
mod lexer;
mod typecheck;

use std::sync::Arc;

pub use crate::ast::Position;
pub use errors::{ParseError, ParseErrorKind, ordinal};
pub use lexer::{Token, tokenize};

use crate::ast::{Pipeline, Rule};
use crate::error::InterpreterError;
use crate::function::FunctionRegistry;
use grammar::Parser;

/// 함수 레지스트리를 공유하는 규칙/파이프라인 파서
#[derive(Debug, Clone)]
pub struct RuleParser {
    registry: Arc<FunctionRegistry>,
}

impl RuleParser {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// 규칙 소스를 컴파일합니다.
    ///
    /// 하나라도 에러가 있으면 규칙 전체가 거부됩니다.
    pub fn parse_rule(&self, id: &str, source: &str) -> Result<Rule, InterpreterError> {
        let tokens = tokenize(source).map_err(|errors| compile_error(id, errors))?;
        let mut parser = Parser::new(source, tokens, &self.registry);
        let parts = parser.rule();
        match parts {
            Ok(parts) => {
                let errors = parser.finish(None);
                if !errors.is_empty() {
                    return Err(compile_error(id, errors));
                }
                tracing::debug!(rule_id = id, rule = %parts.name, "rule compiled");
                Ok(Rule {
                    id: id.to_owned(),
                    name: parts.name,
                    source: source.to_owned(),
                    when: parts.when,
                    then: parts.then,
                })
            }
            Err(fatal) => Err(compile_error(id, parser.finish(Some(fatal)))),
        }
    }

    /// 파이프라인 소스를 컴파일합니다.
    ///
    /// 스테이지의 규칙 참조는 이름으로만 보관되며, 해석은 인터프리터 상태를
    /// 구성할 때 이루어집니다.
    pub fn parse_pipeline(&self, id: &str, source: &str) -> Result<Pipeline, InterpreterError> {
        let tokens = tokenize(source).map_err(|errors| compile_error(id, errors))?;
        let mut parser = Parser::new(source, tokens, &self.registry);
        match parser.pipeline() {
            Ok(parts) => {
                let errors = parser.finish(None);
                if !errors.is_empty() {
                    return Err(compile_error(id, errors));
                }
                tracing::debug!(
                    pipeline_id = id,
                    pipeline = %parts.name,
                    stages = parts.stages.len(),
                    "pipeline compiled"
                );
                Ok(Pipeline::new(id, parts.name, source, parts.stages))
            }
            Err(fatal) => Err(compile_error(id, parser.finish(Some(fatal)))),
        }
    }
}

fn compile_error(id: &str, errors: Vec<ParseError>) -> InterpreterError {
    InterpreterError::Compile {
        source_id: id.to_owned(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, MatchPolicy, Statement};
    use sluice_core::value::{Value, ValueType};

    fn parser() -> RuleParser {
        RuleParser::new(Arc::new(FunctionRegistry::with_builtins().unwrap()))
    }

    fn errors(result: Result<impl std::fmt::Debug, InterpreterError>) -> Vec<ParseError> {
        match result {
            Err(InterpreterError::Compile { errors, .. }) => errors,
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    fn kinds(errors: &[ParseError]) -> Vec<ParseErrorKind> {
        errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn parses_simple_rule() {
        let rule = parser()
            .parse_rule(
                "r1",
                r#"rule "tag http"
                when has_field("http_response_code")
                then
                    set_field("checked", "yes");
                end"#,
            )
            .unwrap();
        assert_eq!(rule.id, "r1");
        assert_eq!(rule.name, "tag http");
        assert_eq!(rule.when.ty, ValueType::Boolean);
        assert_eq!(rule.then.len(), 1);
    }

    #[test]
    fn let_binds_variable_type() {
        let rule = parser()
            .parse_rule(
                "r",
                r#"rule "vars"
                when true
                then
                    let n = to_long($message.count) + 1;
                    set_field("next", n);
                end"#,
            )
            .unwrap();
        match &rule.then[0] {
            Statement::Let { name, expr } => {
                assert_eq!(name, "n");
                assert_eq!(expr.ty, ValueType::Long);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn precedence_and_binds_tighter_than_or() {
        let rule = parser()
            .parse_rule("r", r#"rule "p" when false || true && false then end"#)
            .unwrap();
        let ExprKind::Or(_, right) = &rule.when.kind else {
            panic!("expected or at the root");
        };
        assert!(matches!(right.kind, ExprKind::And(_, _)));
    }

    #[test]
    fn message_field_refs_accept_keywords_and_backticks() {
        let rule = parser()
            .parse_rule(
                "r",
                "rule \"k\" when $message.stage == \"x\" || $message.`odd field` == 1 then end",
            )
            .unwrap();
        let ExprKind::Or(left, right) = &rule.when.kind else {
            panic!("expected or");
        };
        let ExprKind::Comparison { left: l, .. } = &left.kind else {
            panic!("expected comparison");
        };
        assert!(matches!(&l.kind, ExprKind::FieldRef(f) if f == "stage"));
        let ExprKind::Comparison { left: r, .. } = &right.kind else {
            panic!("expected comparison");
        };
        assert!(matches!(&r.kind, ExprKind::FieldRef(f) if f == "odd field"));
    }

    #[test]
    fn constant_pure_calls_are_folded() {
        let rule = parser()
            .parse_rule(
                "r",
                r#"rule "fold" when true then set_field("u", uppercase("abc")); end"#,
            )
            .unwrap();
        let Statement::Expr(call) = &rule.then[0] else {
            panic!("expected call");
        };
        let ExprKind::Call(call) = &call.kind else {
            panic!("expected call");
        };
        assert_eq!(call.name(), "set_field");
        assert!(matches!(
            &call.args[1],
            crate::ast::BoundArg::Constant(arg) if arg.as_value() == Some(&Value::from("ABC"))
        ));
    }

    #[test]
    fn invalid_regex_literal_is_invalid_function_argument() {
        let errs = errors(parser().parse_rule(
            "r",
            r#"rule "bad" when regex("(", "x").matches == true then end"#,
        ));
        assert_eq!(kinds(&errs), vec![ParseErrorKind::InvalidFunctionArgument]);
        assert!(errs[0].reason.contains("1st argument"));
        assert!(errs[0].reason.contains("pattern"));
    }

    #[test]
    fn collects_multiple_errors_in_position_order() {
        let errs = errors(parser().parse_rule(
            "r",
            "rule \"many\"\nwhen nope()\nthen\n  set_field(1, 2);\n  missing_var;\nend",
        ));
        let k = kinds(&errs);
        assert_eq!(k[0], ParseErrorKind::UndeclaredFunction);
        assert!(k.contains(&ParseErrorKind::IncompatibleArgumentType));
        assert!(k.contains(&ParseErrorKind::SyntaxError));
        assert_eq!(errs[0].line, 2);
        assert_eq!(errs[0].position_in_line, 5);
        assert!(errs.windows(2).all(|w| (w[0].line, w[0].position_in_line)
            <= (w[1].line, w[1].position_in_line)));
    }

    #[test]
    fn non_boolean_condition_is_rejected() {
        let errs = errors(parser().parse_rule("r", r#"rule "n" when "yes" then end"#));
        assert_eq!(kinds(&errs), vec![ParseErrorKind::NonBooleanCondition]);
    }

    #[test]
    fn mixed_named_and_positional_is_syntax_error() {
        let errs = errors(parser().parse_rule(
            "r",
            r#"rule "m" when true then set_field("a", value: 1); end"#,
        ));
        assert_eq!(kinds(&errs), vec![ParseErrorKind::SyntaxError]);
    }

    #[test]
    fn missing_end_is_syntax_error() {
        let errs = errors(parser().parse_rule("r", r#"rule "x" when true then"#));
        assert_eq!(kinds(&errs), vec![ParseErrorKind::SyntaxError]);
        assert!(errs[0].reason.contains("end of input"));
    }

    #[test]
    fn lexer_errors_are_reported() {
        let errs = errors(parser().parse_rule("r", "rule \"x\" when # then end"));
        assert_eq!(kinds(&errs), vec![ParseErrorKind::SyntaxError]);
    }

    #[test]
    fn parses_pipeline_with_sorted_stages() {
        let pipeline = parser()
            .parse_pipeline(
                "p1",
                r#"pipeline "main"
                stage 5 match either
                    rule "b";
                stage -1 match all
                    rule "a";
                    rule "c";
                stage 0 match pass
                end"#,
            )
            .unwrap();
        assert_eq!(pipeline.name, "main");
        let ordinals: Vec<i32> = pipeline.stages().iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![-1, 0, 5]);
        assert_eq!(pipeline.stages()[0].policy, MatchPolicy::All);
        assert_eq!(pipeline.stages()[0].rule_refs, vec!["a", "c"]);
        assert_eq!(pipeline.stages()[2].policy, MatchPolicy::Either);
    }

    #[test]
    fn duplicate_stage_and_bad_policy_are_reported() {
        let errs = errors(parser().parse_pipeline(
            "p",
            "pipeline \"dup\"\nstage 1 match all\nstage 1 match sometimes\nend",
        ));
        assert_eq!(
            kinds(&errs),
            vec![ParseErrorKind::DuplicateStage, ParseErrorKind::InvalidStageMatch]
        );
        assert_eq!(errs[0].line, 3);
    }

    #[test]
    fn stage_ordinal_overflow_is_syntax_error() {
        let errs = errors(parser().parse_pipeline(
            "p",
            "pipeline \"big\" stage 99999999999 match all end",
        ));
        assert_eq!(kinds(&errs), vec![ParseErrorKind::SyntaxError]);
    }
}
