//! Pipeline state derived from the stage cache.

use serde::Serialize;
use std::fmt;

use poegen_utils::types::StageId;

use crate::cache::StageCache;

/// How far the pipeline of a session has progressed.
///
/// The state is never stored; it is read off the cache, so invalidation and
/// `clear_all` move it back automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    Empty,
    Stage1Ready,
    Stage2Ready,
    Stage3Ready,
    Stage4Ready,
}

impl PipelineState {
    /// Highest stage N such that stages 1..=N all have a current result.
    #[must_use]
    pub fn from_cache(cache: &StageCache) -> Self {
        let ready = StageId::ALL
            .into_iter()
            .take_while(|stage| cache.get(*stage).is_some())
            .last();
        Self::ready_through(ready)
    }

    #[must_use]
    pub const fn ready_through(stage: Option<StageId>) -> Self {
        match stage {
            None => Self::Empty,
            Some(StageId::Solution) => Self::Stage1Ready,
            Some(StageId::PovPlan) => Self::Stage2Ready,
            Some(StageId::Diagram) => Self::Stage3Ready,
            Some(StageId::MigrationCsv) => Self::Stage4Ready,
        }
    }

    /// Last stage with a current result.
    #[must_use]
    pub const fn last_ready(self) -> Option<StageId> {
        match self {
            Self::Empty => None,
            Self::Stage1Ready => Some(StageId::Solution),
            Self::Stage2Ready => Some(StageId::PovPlan),
            Self::Stage3Ready => Some(StageId::Diagram),
            Self::Stage4Ready => Some(StageId::MigrationCsv),
        }
    }

    /// Whether `stage` may be generated from this state.
    #[must_use]
    pub fn allows(self, stage: StageId) -> bool {
        match stage.prerequisite() {
            None => true,
            Some(prerequisite) => self.last_ready().is_some_and(|ready| ready >= prerequisite),
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Empty => "empty",
            Self::Stage1Ready => "stage-1-ready",
            Self::Stage2Ready => "stage-2-ready",
            Self::Stage3Ready => "stage-3-ready",
            Self::Stage4Ready => "stage-4-ready",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_follows_prerequisites() {
        assert!(PipelineState::Empty.allows(StageId::Solution));
        assert!(!PipelineState::Empty.allows(StageId::PovPlan));
        assert!(PipelineState::Stage1Ready.allows(StageId::PovPlan));
        assert!(!PipelineState::Stage1Ready.allows(StageId::Diagram));
        assert!(PipelineState::Stage4Ready.allows(StageId::Solution));
        assert!(PipelineState::Stage3Ready.allows(StageId::MigrationCsv));
    }

    #[test]
    fn test_empty_cache_is_empty_state() {
        assert_eq!(PipelineState::from_cache(&StageCache::new()), PipelineState::Empty);
        assert_eq!(PipelineState::Empty.last_ready(), None);
        assert_eq!(PipelineState::Stage2Ready.to_string(), "stage-2-ready");
    }
}
