#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod types;
pub mod value;

// --- 주요 타입 re-export ---

// 에러
pub use error::{CompileError, ConfigError, MessageError, SluiceError, SourceError};

// 설정
pub use config::SluiceConfig;

// 외부 협력자 trait
pub use store::{PipelineSource, RuleSource, SourceStore, StreamConnection, TraceSink};

// 도메인 타입
pub use types::{DEFAULT_STREAM, Message, TraceEntry};
pub use value::{Value, ValueType};
