//! One user's working set: inputs, uploaded estimates and stage results.
//!
//! All state sits behind one mutex that is never held across an await.
//! A generation claims the session's in-flight slot for its whole
//! duration; while it is claimed, other generations, `clear_all` and input
//! edits are refused with `GenerationInProgress`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

use poegen_prompt::PromptSource;
use poegen_utils::error::PoeError;
use poegen_utils::types::{PovWindow, ResourceEstimate, SessionInputs, StageId};

use crate::cache::{PendingResult, StageCache, StageResult};
use crate::state::PipelineState;

#[derive(Debug)]
struct SessionState {
    inputs: SessionInputs,
    estimates: Option<Vec<ResourceEstimate>>,
    cache: StageCache,
    in_flight: Option<StageId>,
    last_active: Instant,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    state: Mutex<SessionState>,
}

/// Releases the in-flight slot when dropped, whether the generation
/// succeeded, failed or was abandoned.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    session: &'a Session,
    stage: StageId,
}

impl InFlightGuard<'_> {
    #[must_use]
    pub fn stage(&self) -> StageId {
        self.stage
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.session.lock();
        state.in_flight = None;
        state.last_active = Instant::now();
    }
}

/// Point-in-time copy of what a prompt is built from.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub inputs: SessionInputs,
    pub estimates: Option<Vec<ResourceEstimate>>,
    results: BTreeMap<StageId, Arc<StageResult>>,
}

impl SessionSnapshot {
    /// Revision of the current result of `stage`, if any.
    #[must_use]
    pub fn revision(&self, stage: StageId) -> Option<u64> {
        self.results.get(&stage).map(|r| r.revision)
    }
}

impl PromptSource for SessionSnapshot {
    fn inputs(&self) -> &SessionInputs {
        &self.inputs
    }

    fn stage_text(&self, stage: StageId) -> Option<&str> {
        self.results.get(&stage).map(|r| r.raw_text.as_str())
    }

    fn estimates(&self) -> Option<&[ResourceEstimate]> {
        self.estimates.as_deref()
    }
}

/// Per-stage entry of [`SessionStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageStatus {
    pub stage: StageId,
    pub revision: u64,
    pub generated_at: DateTime<Utc>,
    pub content_hash: String,
    pub file_name: String,
    pub degraded: bool,
    pub dropped_rows: usize,
}

/// Progress report of a session, including the stage being generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub state: PipelineState,
    pub in_flight: Option<StageId>,
    pub has_estimates: bool,
    pub stages: Vec<StageStatus>,
}

impl Session {
    /// A fresh session with empty inputs and a two-week POV from `today`.
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self::with_inputs(SessionInputs::empty(today))
    }

    #[must_use]
    pub fn with_inputs(inputs: SessionInputs) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Mutex::new(SessionState {
                inputs,
                estimates: None,
                cache: StageCache::new(),
                in_flight: None,
                last_active: Instant::now(),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[must_use]
    pub fn inputs(&self) -> SessionInputs {
        self.lock().inputs.clone()
    }

    #[must_use]
    pub fn estimates(&self) -> Option<Vec<ResourceEstimate>> {
        self.lock().estimates.clone()
    }

    /// Current result of `stage`.
    #[must_use]
    pub fn result(&self, stage: StageId) -> Option<Arc<StageResult>> {
        self.lock().cache.get(stage).cloned()
    }

    #[must_use]
    pub fn pipeline_state(&self) -> PipelineState {
        PipelineState::from_cache(&self.lock().cache)
    }

    /// Stage currently being generated.
    #[must_use]
    pub fn in_flight(&self) -> Option<StageId> {
        self.lock().in_flight
    }

    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.lock().last_active.elapsed()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let state = self.lock();
        SessionStatus {
            session_id: self.id.to_string(),
            state: PipelineState::from_cache(&state.cache),
            in_flight: state.in_flight,
            has_estimates: state.estimates.is_some(),
            stages: state
                .cache
                .iter()
                .map(|r| StageStatus {
                    stage: r.stage,
                    revision: r.revision,
                    generated_at: r.generated_at,
                    content_hash: r.content_hash.clone(),
                    file_name: r.artifact.file_name.clone(),
                    degraded: r.artifact.degraded,
                    dropped_rows: r.artifact.dropped_rows,
                })
                .collect(),
        }
    }

    /// Claim the in-flight slot for `stage`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationInProgress` naming the running stage if the slot
    /// is taken.
    pub fn begin(&self, stage: StageId) -> Result<InFlightGuard<'_>, PoeError> {
        let mut state = self.lock();
        if let Some(in_flight) = state.in_flight {
            return Err(PoeError::GenerationInProgress { in_flight });
        }
        state.in_flight = Some(stage);
        state.last_active = Instant::now();
        Ok(InFlightGuard {
            session: self,
            stage,
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            inputs: state.inputs.clone(),
            estimates: state.estimates.clone(),
            results: state
                .cache
                .iter()
                .map(|r| (r.stage, Arc::clone(r)))
                .collect(),
        }
    }

    /// Discard `from` and later results on behalf of the running generation.
    pub(crate) fn invalidate_from(
        &self,
        _guard: &InFlightGuard<'_>,
        from: StageId,
    ) -> Vec<StageId> {
        self.lock().cache.invalidate(from)
    }

    /// Store the result of the running generation.
    pub(crate) fn store(
        &self,
        _guard: &InFlightGuard<'_>,
        pending: PendingResult,
    ) -> Result<Arc<StageResult>, PoeError> {
        let mut state = self.lock();
        state.last_active = Instant::now();
        state.cache.put(pending)
    }

    /// Discard every stage result. Inputs and uploaded estimates are kept.
    ///
    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn clear_all(&self) -> Result<(), PoeError> {
        let mut state = self.lock();
        if let Some(in_flight) = state.in_flight {
            return Err(PoeError::GenerationInProgress { in_flight });
        }
        state.cache.clear_all();
        state.last_active = Instant::now();
        Ok(())
    }

    /// Apply an edit; when it reports a changed stage, results from that
    /// stage on are discarded.
    fn edit(
        &self,
        apply: impl FnOnce(&mut SessionState) -> Option<StageId>,
    ) -> Result<(), PoeError> {
        let mut state = self.lock();
        if let Some(in_flight) = state.in_flight {
            return Err(PoeError::GenerationInProgress { in_flight });
        }
        state.last_active = Instant::now();
        if let Some(from) = apply(&mut *state) {
            let removed = state.cache.invalidate(from);
            if !removed.is_empty() {
                tracing::info!(
                    session = %self.id,
                    from = %from,
                    discarded = removed.len(),
                    "Input changed; later stage results discarded"
                );
            }
        }
        Ok(())
    }

    /// Replace all inputs. Results are discarded from the earliest stage
    /// that reads a changed field.
    ///
    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn set_inputs(&self, inputs: SessionInputs) -> Result<(), PoeError> {
        self.edit(|state| {
            let from = earliest_affected(&state.inputs, &inputs);
            state.inputs = inputs;
            from
        })
    }

    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn set_customer_name(&self, value: impl Into<String>) -> Result<(), PoeError> {
        let value = value.into();
        self.edit(|state| replace(&mut state.inputs.customer_name, value, StageId::Solution))
    }

    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn set_budget(&self, value: impl Into<String>) -> Result<(), PoeError> {
        let value = value.into();
        self.edit(|state| replace(&mut state.inputs.budget, value, StageId::Solution))
    }

    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn set_background(&self, value: impl Into<String>) -> Result<(), PoeError> {
        let value = value.into();
        self.edit(|state| replace(&mut state.inputs.background, value, StageId::Solution))
    }

    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn set_pov_window(&self, value: PovWindow) -> Result<(), PoeError> {
        self.edit(|state| replace(&mut state.inputs.pov, value, StageId::PovPlan))
    }

    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn set_team_roster(&self, value: impl Into<String>) -> Result<(), PoeError> {
        let value = value.into();
        self.edit(|state| replace(&mut state.inputs.team_roster, value, StageId::PovPlan))
    }

    /// Attach parsed resource estimates; only the migration stage reads them.
    ///
    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn upload_estimates(&self, estimates: Vec<ResourceEstimate>) -> Result<(), PoeError> {
        self.edit(|state| {
            replace(&mut state.estimates, Some(estimates), StageId::MigrationCsv)
        })
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T, affects: StageId) -> Option<StageId> {
    if *slot == value {
        return None;
    }
    *slot = value;
    Some(affects)
}

fn earliest_affected(old: &SessionInputs, new: &SessionInputs) -> Option<StageId> {
    if old.customer_name != new.customer_name
        || old.budget != new.budget
        || old.background != new.background
    {
        Some(StageId::Solution)
    } else if old.pov != new.pov || old.team_roster != new.team_roster {
        Some(StageId::PovPlan)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poegen_render::RenderedArtifact;
    use poegen_utils::types::LlmInfo;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 25).unwrap()
    }

    fn store(session: &Session, stage: StageId) -> Arc<StageResult> {
        let guard = session.begin(stage).unwrap();
        let prerequisite_revision = stage
            .prerequisite()
            .and_then(|p| session.snapshot().revision(p));
        session
            .store(
                &guard,
                PendingResult {
                    stage,
                    raw_text: format!("{stage} text"),
                    generated_at: Utc::now(),
                    prerequisite_revision,
                    llm: LlmInfo::default(),
                    artifact: RenderedArtifact {
                        file_name: format!("{stage}.bin"),
                        media_type: "application/octet-stream",
                        bytes: Vec::new(),
                        dropped_rows: 0,
                        degraded: false,
                    },
                },
            )
            .unwrap()
    }

    fn filled(session: &Session) {
        for stage in StageId::ALL {
            store(session, stage);
        }
    }

    #[test]
    fn test_in_flight_slot_is_exclusive() {
        let session = Session::new(today());
        let guard = session.begin(StageId::Solution).unwrap();
        assert_eq!(session.in_flight(), Some(StageId::Solution));
        assert!(matches!(
            session.begin(StageId::PovPlan),
            Err(PoeError::GenerationInProgress {
                in_flight: StageId::Solution
            })
        ));
        assert!(session.clear_all().is_err());
        assert!(session.set_background("x").is_err());
        drop(guard);
        assert_eq!(session.in_flight(), None);
        assert!(session.begin(StageId::Solution).is_ok());
    }

    #[test]
    fn test_customer_edit_discards_everything() {
        let session = Session::new(today());
        filled(&session);
        assert_eq!(session.pipeline_state(), PipelineState::Stage4Ready);

        session.set_customer_name("新客户").unwrap();
        assert_eq!(session.pipeline_state(), PipelineState::Empty);
    }

    #[test]
    fn test_roster_edit_keeps_solution() {
        let session = Session::new(today());
        filled(&session);
        session.set_team_roster("架构师: 李四").unwrap();
        assert_eq!(session.pipeline_state(), PipelineState::Stage1Ready);
    }

    #[test]
    fn test_estimate_upload_discards_only_migration() {
        let session = Session::new(today());
        filled(&session);
        session
            .upload_estimates(vec![ResourceEstimate {
                row: 1,
                fields: Vec::new(),
            }])
            .unwrap();
        assert_eq!(session.pipeline_state(), PipelineState::Stage3Ready);
    }

    #[test]
    fn test_unchanged_edit_keeps_results() {
        let session = Session::new(today());
        filled(&session);
        session.set_inputs(session.inputs()).unwrap();
        session.set_budget(session.inputs().budget).unwrap();
        assert_eq!(session.pipeline_state(), PipelineState::Stage4Ready);
    }

    #[test]
    fn test_set_inputs_uses_earliest_changed_stage() {
        let session = Session::new(today());
        filled(&session);
        let mut inputs = session.inputs();
        inputs.pov = PovWindow::two_weeks_from(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        session.set_inputs(inputs).unwrap();
        assert_eq!(session.pipeline_state(), PipelineState::Stage1Ready);
    }

    #[test]
    fn test_status_reports_stages_and_progress() {
        let session = Session::new(today());
        store(&session, StageId::Solution);
        let _guard = session.begin(StageId::PovPlan).unwrap();

        let status = session.status();
        assert_eq!(status.state, PipelineState::Stage1Ready);
        assert_eq!(status.in_flight, Some(StageId::PovPlan));
        assert_eq!(status.stages.len(), 1);
        assert_eq!(status.stages[0].file_name, "solution.bin");
    }

    #[test]
    fn test_snapshot_serves_prompt_source() {
        let session = Session::new(today());
        store(&session, StageId::Solution);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.stage_text(StageId::Solution), Some("solution text"));
        assert_eq!(snapshot.stage_text(StageId::PovPlan), None);
        assert_eq!(snapshot.revision(StageId::Solution), Some(1));
    }
}
