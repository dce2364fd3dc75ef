//! 파서/타입 검사 통합 테스트 -- 에러 종류와 위치 보고 검증

use std::sync::Arc;

use proptest::prelude::*;

use sluice_core::value::{Value, ValueType};
use sluice_interpreter::function::Function;
use sluice_interpreter::{
    FunctionDescriptor, FunctionRegistry, InterpreterError, ParameterDescriptor, ParseError,
    ParseErrorKind, RuleParser,
};

fn parser() -> RuleParser {
    RuleParser::new(Arc::new(FunctionRegistry::with_builtins().unwrap()))
}

fn rule_errors(source: &str) -> Vec<ParseError> {
    match parser().parse_rule("test", source) {
        Err(InterpreterError::Compile { errors, .. }) => errors,
        Err(other) => panic!("unexpected error {other}"),
        Ok(rule) => panic!("expected compile errors, got rule '{}'", rule.name),
    }
}

fn first_kind(source: &str) -> ParseErrorKind {
    rule_errors(source)[0].kind
}

#[test]
fn test_every_type_error_kind_is_reported() {
    let cases = [
        (
            r#"rule "a" when to_long("1", "x") == 1 then end"#,
            ParseErrorKind::IncompatibleArgumentType,
        ),
        (
            r#"rule "a" when [1, 2]["x"] == 1 then end"#,
            ParseErrorKind::IncompatibleIndexType,
        ),
        (
            r#"rule "a" when "text"[0] == 1 then end"#,
            ParseErrorKind::NonIndexableType,
        ),
        (
            r#"rule "a" when regex("[", "x").matches == true then end"#,
            ParseErrorKind::InvalidFunctionArgument,
        ),
        (
            r#"rule "a" when nope() then end"#,
            ParseErrorKind::UndeclaredFunction,
        ),
        (
            r#"rule "a" when true then set_field("x", y); end"#,
            ParseErrorKind::UndeclaredVariable,
        ),
        (
            r#"rule "a" when is_null(1, 2) then end"#,
            ParseErrorKind::WrongNumberOfArgs,
        ),
        (
            r#"rule "a" when has_field() then end"#,
            ParseErrorKind::MissingRequiredParam,
        ),
        (
            r#"rule "a" when has_field(name: "x") then end"#,
            ParseErrorKind::UnknownParameter,
        ),
        (
            r#"rule "a" when 1 + "x" == 2 then end"#,
            ParseErrorKind::IncompatibleTypes,
        ),
        (
            r#"rule "a" when 1 + 2 then end"#,
            ParseErrorKind::NonBooleanCondition,
        ),
        (r#"rule "a" when true then"#, ParseErrorKind::SyntaxError),
    ];
    for (source, expected) in cases {
        assert_eq!(first_kind(source), expected, "source: {source}");
    }
}

#[test]
fn test_optional_before_required_forces_named_args() {
    let weird = Function::new(
        FunctionDescriptor::new("weird", ValueType::Boolean)
            .param(ParameterDescriptor::string("prefix").optional())
            .param(ParameterDescriptor::string("value")),
        |_, _| Ok(Value::Boolean(true)),
    );
    let registry = FunctionRegistry::builder()
        .with_builtins()
        .and_then(|b| b.register(weird))
        .unwrap()
        .build();
    let parser = RuleParser::new(Arc::new(registry));

    let positional = parser.parse_rule("t", r#"rule "a" when weird("x") then end"#);
    match positional {
        Err(InterpreterError::Compile { errors, .. }) => {
            assert_eq!(errors[0].kind, ParseErrorKind::OptionalParamsMustBeNamed);
        }
        other => panic!("expected compile error, got {other:?}"),
    }

    assert!(
        parser
            .parse_rule("t", r#"rule "a" when weird(value: "x") then end"#)
            .is_ok()
    );
}

#[test]
fn test_error_positions_are_line_and_column() {
    let errors = rule_errors("rule \"pos\"\nwhen true\nthen\n    set_field(\"a\", 1);\n    set_field(42, 1);\nend\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ParseErrorKind::IncompatibleArgumentType);
    assert_eq!((errors[0].line, errors[0].position_in_line), (5, 14));
    assert!(errors[0].reason.contains("1st argument 'field'"));
}

#[test]
fn test_recovery_reports_errors_from_several_statements() {
    let errors = rule_errors(
        "rule \"r\"\nwhen true\nthen\n  set_field(\"a\" 1);\n  set_field(\"b\", 2);\n  $message.x;\nend\n",
    );
    let lines: Vec<usize> = errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![4, 6]);
    assert!(errors.iter().all(|e| e.kind == ParseErrorKind::SyntaxError));
}

#[test]
fn test_let_variables_are_scoped_in_order() {
    let errors = rule_errors(
        "rule \"order\"\nwhen true\nthen\n  set_field(\"x\", later);\n  let later = 1;\nend",
    );
    assert_eq!(errors[0].kind, ParseErrorKind::UndeclaredVariable);
    assert_eq!(errors[0].line, 4);
}

#[test]
fn test_parse_error_serializes_for_operators() {
    let errors = rule_errors(r#"rule "a" when nope() then end"#);
    let json = serde_json::to_value(&errors[0]).unwrap();
    assert_eq!(json["type"], "UndeclaredFunction");
    assert_eq!(json["line"], 1);
    assert_eq!(json["position_in_line"], 14);
    assert!(json["reason"].as_str().unwrap().contains("nope"));
}

#[test]
fn test_comments_and_whitespace_are_ignored() {
    let rule = parser()
        .parse_rule(
            "c",
            "// leading comment\nrule \"c\" // trailing\nwhen\n  true // always\nthen\n  // nothing\nend\n",
        )
        .unwrap();
    assert_eq!(rule.name, "c");
    assert!(rule.then.is_empty());
}

proptest! {
    #[test]
    fn parser_never_panics_on_arbitrary_input(source in "\\PC{0,200}") {
        let _ = parser().parse_rule("fuzz", &source);
        let _ = parser().parse_pipeline("fuzz", &source);
    }

    #[test]
    fn string_literals_round_trip_through_set_field(text in "[a-zA-Z0-9 _.-]{0,40}") {
        let source = format!("rule \"s\" when true then set_field(\"f\", \"{text}\"); end");
        prop_assert!(parser().parse_rule("s", &source).is_ok());
    }
}
