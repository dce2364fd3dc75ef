//! 파이프라인과 스테이지

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Rule;

/// 스테이지 매치 정책
///
/// 스테이지의 규칙 조건 결과로부터 파이프라인이 다음 스테이지로
/// 진행할지를 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// 모든 규칙 조건이 참이어야 진행
    All,
    /// 하나 이상의 규칙 조건이 참이면 진행
    Either,
    /// 결과와 관계없이 항상 진행
    Pass,
}

impl MatchPolicy {
    /// `satisfied`개의 조건이 참일 때 정책이 만족되는지 판단합니다.
    ///
    /// 규칙이 없는 스테이지는 모든 정책에서 만족입니다.
    pub fn is_satisfied(self, satisfied: usize, total: usize) -> bool {
        match self {
            Self::All => satisfied == total,
            Self::Either => satisfied > 0 || total == 0,
            Self::Pass => true,
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Either => write!(f, "either"),
            Self::Pass => write!(f, "pass"),
        }
    }
}

/// 파이프라인 스테이지
#[derive(Debug, Clone)]
pub struct Stage {
    /// 실행 순서 (오름차순, 음수 허용)
    pub ordinal: i32,
    pub policy: MatchPolicy,
    /// 소스에 선언된 규칙 이름 목록
    pub rule_refs: Vec<String>,
    /// 해석된 규칙 (`rule_refs`와 같은 순서). 링크 전에는 비어 있습니다.
    pub rules: Vec<Arc<Rule>>,
}

impl Stage {
    pub fn new(ordinal: i32, policy: MatchPolicy, rule_refs: Vec<String>) -> Self {
        Self {
            ordinal,
            policy,
            rule_refs,
            rules: Vec::new(),
        }
    }

    /// 컴파일된 규칙으로 바로 스테이지를 만듭니다.
    pub fn with_rules(ordinal: i32, policy: MatchPolicy, rules: Vec<Arc<Rule>>) -> Self {
        Self {
            ordinal,
            policy,
            rule_refs: rules.iter().map(|r| r.name.clone()).collect(),
            rules,
        }
    }

    /// 스테이지 결과가 매치 정책을 만족하는지 판단합니다.
    pub fn matches(&self, satisfied: usize) -> bool {
        self.policy.is_satisfied(satisfied, self.rules.len())
    }
}

/// 파이프라인
///
/// 스테이지는 항상 `ordinal` 오름차순으로 정렬되어 있습니다.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// 소스 ID
    pub id: String,
    /// 파이프라인 이름 (`pipeline "name"`)
    pub name: String,
    /// 원본 소스 텍스트
    pub source: String,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<String>,
        mut stages: Vec<Stage>,
    ) -> Self {
        stages.sort_by_key(|s| s.ordinal);
        Self {
            id: id.into(),
            name: name.into(),
            source: source.into(),
            stages,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    /// 파이프라인이 참조하는 모든 규칙 이름 (중복 포함)
    pub fn rule_refs(&self) -> impl Iterator<Item = &str> {
        self.stages
            .iter()
            .flat_map(|s| s.rule_refs.iter().map(String::as_str))
    }
}
