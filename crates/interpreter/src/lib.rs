#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`parser`]: logos 렉서, 재귀 하강 파서, 타입 검사와 상수 접기
//! - [`ast`]: 표현식, 규칙, 스테이지, 파이프라인 모델
//! - [`function`]: 함수 기술자, 레지스트리, 내장 함수
//! - [`eval`]: 트리 순회 평가기와 평가 컨텍스트
//! - [`interpreter`]: 상태 스냅샷, 스테이지 엔진, 리스너, 추적기, 시뮬레이터
//! - [`loader`]: 파일 기반 소스 저장소
//! - [`config`]: 인터프리터 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 사용 예시
//!
//! ```ignore
//! let registry = Arc::new(FunctionRegistry::with_builtins()?);
//! let interpreter = Interpreter::new(InterpreterConfig::from_core(&config.interpreter), registry);
//! let store = FileSourceStore::from_config(interpreter.config());
//! let failures = interpreter.reload_from_store(&store).await?;
//!
//! let result = interpreter.process(messages);
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod eval;
pub mod function;
pub mod interpreter;
pub mod loader;
pub mod parser;

// --- 주요 타입 re-export ---

// 인터프리터
pub use interpreter::{
    CompileFailure, EvaluationResult, Interpreter, InterpreterListener, InterpreterState,
    MultiplexListener, NoopListener, RuleMetricsListener, SimulationResult, Simulator,
    StageOutcome, Tracer,
};

// 설정
pub use config::{InterpreterConfig, InterpreterConfigBuilder};

// 에러
pub use error::InterpreterError;
pub use eval::EvalError;

// 파서
pub use parser::{ParseError, ParseErrorKind, RuleParser};

// 모델
pub use ast::{MatchPolicy, Pipeline, Rule, Stage};

// 함수
pub use function::{FunctionDescriptor, FunctionRegistry, ParameterDescriptor};

// 저장소
pub use loader::FileSourceStore;
