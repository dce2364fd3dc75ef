//! Command handlers -- one module per subcommand

pub mod check;
pub mod config;
pub mod functions;
pub mod run;
pub mod simulate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sluice_core::config::SluiceConfig;
use sluice_core::error::{ConfigError, SluiceError};
use sluice_interpreter::{FileSourceStore, FunctionRegistry, Interpreter, InterpreterConfig};

use crate::error::CliError;

/// Load the configuration for commands that can run without a config file.
///
/// A missing file falls back to defaults; environment overrides and
/// validation still apply. Any other failure is a configuration error.
pub async fn load_config(path: &Path) -> Result<SluiceConfig, CliError> {
    match SluiceConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(SluiceError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = SluiceConfig::default();
            config.apply_env_overrides();
            config
                .validate()
                .map_err(|e| CliError::Config(e.to_string()))?;
            Ok(config)
        }
        Err(e) => Err(CliError::Config(e.to_string())),
    }
}

/// Build the function registry with every built-in.
pub fn registry() -> Result<Arc<FunctionRegistry>, CliError> {
    Ok(Arc::new(FunctionRegistry::with_builtins()?))
}

/// Build an interpreter and its file store, optionally overriding the source directory.
pub fn interpreter(
    config: &SluiceConfig,
    dir: Option<PathBuf>,
) -> Result<(Interpreter, FileSourceStore), CliError> {
    let mut interpreter_config = InterpreterConfig::from_core(&config.interpreter);
    if let Some(dir) = dir {
        interpreter_config.source_dir = dir;
    }
    interpreter_config.validate()?;

    let store = FileSourceStore::from_config(&interpreter_config);
    Ok((Interpreter::new(interpreter_config, registry()?), store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_config_missing_file_uses_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let config = load_config(&dir.path().join("absent.toml"))
            .await
            .expect("defaults");
        assert_eq!(config.interpreter.max_routing_passes, 8);
    }

    #[tokio::test]
    async fn test_load_config_malformed_file_is_config_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[general\n").expect("write");
        let err = load_config(&path).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_interpreter_dir_override() {
        let (interpreter, store) =
            interpreter(&SluiceConfig::default(), Some(PathBuf::from("/srv/p"))).expect("build");
        assert_eq!(store.dir(), Path::new("/srv/p"));
        assert_eq!(interpreter.config().source_dir, PathBuf::from("/srv/p"));
    }
}
