//! 파일 기반 소스 저장소
//!
//! 디렉토리의 `*.rule`, `*.pipeline` 파일(ID는 파일 이름에서 확장자를 뺀 것)과
//! YAML 스트림 연결 파일을 읽습니다.
//!
//! ```yaml
//! - stream: default
//!   pipelines: [main]
//! - stream: errors
//!   pipelines: [alerting, main]
//! ```
//!
//! 일괄 로딩에서 읽을 수 없거나 너무 큰 파일은 경고 로그를 남기고 건너뜁니다.

use std::path::{Path, PathBuf};

use sluice_core::error::{SluiceError, SourceError};
use sluice_core::store::{PipelineSource, RuleSource, SourceStore, StreamConnection};

use crate::config::InterpreterConfig;

/// 규칙 소스 확장자
pub const RULE_EXTENSION: &str = "rule";
/// 파이프라인 소스 확장자
pub const PIPELINE_EXTENSION: &str = "pipeline";

const DEFAULT_MAX_SOURCE_SIZE: u64 = 1024 * 1024;

/// 디렉토리 기반 [`SourceStore`] 구현
#[derive(Debug, Clone)]
pub struct FileSourceStore {
    dir: PathBuf,
    connections_path: PathBuf,
    max_source_size: u64,
}

impl FileSourceStore {
    /// `dir` 안의 `connections.yml`을 연결 파일로 사용하는 저장소를 만듭니다.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            connections_path: dir.join("connections.yml"),
            dir,
            max_source_size: DEFAULT_MAX_SOURCE_SIZE,
        }
    }

    pub fn from_config(config: &InterpreterConfig) -> Self {
        Self {
            dir: config.source_dir.clone(),
            connections_path: config.connections_path(),
            max_source_size: config.max_source_size,
        }
    }

    pub fn with_connections_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.connections_path = path.into();
        self
    }

    pub fn with_max_source_size(mut self, bytes: u64) -> Self {
        self.max_source_size = bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn source_path(&self, kind: &str, extension: &str, id: &str) -> Result<PathBuf, SluiceError> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\'])
            && !id.contains("..");
        if !valid {
            return Err(SourceError::NotFound {
                kind: kind.to_owned(),
                id: id.to_owned(),
            }
            .into());
        }
        Ok(self.dir.join(format!("{id}.{extension}")))
    }

    async fn read_source(&self, path: &Path) -> Result<String, SluiceError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| SourceError::Unreadable {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > self.max_source_size {
            return Err(SourceError::TooLarge {
                path: path.display().to_string(),
                size: metadata.len(),
                max: self.max_source_size,
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Unreadable {
                path: path.display().to_string(),
                reason: format!("failed to read file: {e}"),
            })?;
        Ok(content)
    }

    async fn load_one(&self, kind: &str, extension: &str, id: &str) -> Result<String, SluiceError> {
        let path = self.source_path(kind, extension, id)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(SourceError::NotFound {
                kind: kind.to_owned(),
                id: id.to_owned(),
            }
            .into());
        }
        self.read_source(&path).await
    }

    /// 확장자가 일치하는 모든 파일을 (ID, 내용)으로 읽습니다. 파일 이름 순으로 정렬됩니다.
    async fn load_all(&self, extension: &str) -> Result<Vec<(String, String)>, SluiceError> {
        let mut entries =
            tokio::fs::read_dir(&self.dir)
                .await
                .map_err(|e| SourceError::Unreadable {
                    path: self.dir.display().to_string(),
                    reason: format!("failed to read directory: {e}"),
                })?;

        let mut paths = Vec::new();
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| SourceError::Unreadable {
                    path: self.dir.display().to_string(),
                    reason: format!("failed to read directory entry: {e}"),
                })?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == extension) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                tracing::warn!(path = %path.display(), "source file name is not valid UTF-8, skipping");
                continue;
            };
            match self.read_source(&path).await {
                Ok(content) => sources.push((id, content)),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load source file, skipping"
                    );
                }
            }
        }

        tracing::debug!(
            dir = %self.dir.display(),
            extension,
            count = sources.len(),
            "loaded source files"
        );
        Ok(sources)
    }
}

/// YAML 연결 정의를 파싱합니다.
pub fn parse_connections(yaml: &str) -> Result<Vec<StreamConnection>, SluiceError> {
    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let connections: Vec<StreamConnection> =
        serde_yaml::from_str(yaml).map_err(|e| SourceError::InvalidConnections {
            reason: e.to_string(),
        })?;
    if let Some(empty) = connections.iter().find(|c| c.stream.trim().is_empty()) {
        return Err(SourceError::InvalidConnections {
            reason: format!("empty stream id for pipelines {:?}", empty.pipelines),
        }
        .into());
    }
    Ok(connections)
}

impl SourceStore for FileSourceStore {
    async fn load_rule_source(&self, id: &str) -> Result<RuleSource, SluiceError> {
        let source = self.load_one("rule", RULE_EXTENSION, id).await?;
        Ok(RuleSource {
            id: id.to_owned(),
            source,
        })
    }

    async fn load_pipeline_source(&self, id: &str) -> Result<PipelineSource, SluiceError> {
        let source = self.load_one("pipeline", PIPELINE_EXTENSION, id).await?;
        Ok(PipelineSource {
            id: id.to_owned(),
            source,
        })
    }

    async fn load_all_rules(&self) -> Result<Vec<RuleSource>, SluiceError> {
        Ok(self
            .load_all(RULE_EXTENSION)
            .await?
            .into_iter()
            .map(|(id, source)| RuleSource { id, source })
            .collect())
    }

    async fn load_all_pipelines(&self) -> Result<Vec<PipelineSource>, SluiceError> {
        Ok(self
            .load_all(PIPELINE_EXTENSION)
            .await?
            .into_iter()
            .map(|(id, source)| PipelineSource { id, source })
            .collect())
    }

    async fn load_connections(&self) -> Result<Vec<StreamConnection>, SluiceError> {
        let path = &self.connections_path;
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::warn!(path = %path.display(), "connections file not found, no streams connected");
            return Ok(Vec::new());
        }
        let content = self.read_source(path).await?;
        parse_connections(&content)
    }
}
