//! Per-session stage cache.
//!
//! Holds at most one current [`StageResult`] per stage. Results are
//! immutable and shared as `Arc`; regeneration replaces them. Storing a
//! result checks that it was built on the prerequisite result that is
//! current right now.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use poegen_render::RenderedArtifact;
use poegen_utils::error::PoeError;
use poegen_utils::types::{LlmInfo, StageId};

/// The current output of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: StageId,
    pub raw_text: String,
    pub generated_at: DateTime<Utc>,
    /// BLAKE3 of `raw_text`, hex encoded.
    pub content_hash: String,
    /// Session-wide revision, increasing across all stages until `clear_all`.
    pub revision: u64,
    /// Revision of the prerequisite result this one was built on.
    pub prerequisite_revision: Option<u64>,
    pub llm: LlmInfo,
    pub artifact: RenderedArtifact,
}

impl StageResult {
    /// Number of stage-4 input rows the model mapped to no record.
    #[must_use]
    pub fn dropped_rows(&self) -> usize {
        self.artifact.dropped_rows
    }
}

/// Fields of a result before the cache assigns its revision.
#[derive(Debug, Clone)]
pub struct PendingResult {
    pub stage: StageId,
    pub raw_text: String,
    pub generated_at: DateTime<Utc>,
    pub prerequisite_revision: Option<u64>,
    pub llm: LlmInfo,
    pub artifact: RenderedArtifact,
}

#[must_use]
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Default)]
pub struct StageCache {
    results: BTreeMap<StageId, Arc<StageResult>>,
    last_revision: u64,
}

impl StageCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, stage: StageId) -> Option<&Arc<StageResult>> {
        self.results.get(&stage)
    }

    /// Current results in stage order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<StageResult>> {
        self.results.values()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Store a result, replacing any earlier result of the same stage and
    /// discarding every later stage's result.
    ///
    /// # Errors
    ///
    /// Returns `PoeError::MissingPrerequisite` if the prerequisite result is
    /// absent or is not the one the pending result was built on.
    pub fn put(&mut self, pending: PendingResult) -> Result<Arc<StageResult>, PoeError> {
        let stage = pending.stage;
        if let Some(prerequisite) = stage.prerequisite() {
            let current = self.results.get(&prerequisite).map(|r| r.revision);
            if current.is_none() || current != pending.prerequisite_revision {
                return Err(PoeError::MissingPrerequisite {
                    stage,
                    missing: prerequisite,
                });
            }
        }

        self.invalidate(stage);
        self.last_revision += 1;
        let result = Arc::new(StageResult {
            stage,
            content_hash: content_hash(&pending.raw_text),
            raw_text: pending.raw_text,
            generated_at: pending.generated_at,
            revision: self.last_revision,
            prerequisite_revision: pending.prerequisite_revision,
            llm: pending.llm,
            artifact: pending.artifact,
        });
        self.results.insert(stage, Arc::clone(&result));
        Ok(result)
    }

    /// Remove the result of `from` and of every stage after it.
    ///
    /// Returns the stages that had a result.
    pub fn invalidate(&mut self, from: StageId) -> Vec<StageId> {
        let removed: Vec<StageId> = from
            .and_downstream()
            .filter(|stage| self.results.remove(stage).is_some())
            .collect();
        if !removed.is_empty() {
            tracing::debug!(from = %from, removed = removed.len(), "Stage results invalidated");
        }
        removed
    }

    /// Remove every result and start revisions over, as in a new session.
    pub fn clear_all(&mut self) {
        self.results.clear();
        self.last_revision = 0;
    }
}
