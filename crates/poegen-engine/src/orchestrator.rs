//! Pipeline orchestrator.
//!
//! Runs one stage for one session: claim the in-flight slot, build the
//! prompt, call the model, render, then store. Rendering happens before the
//! store so a result that cannot be rendered never enters the cache, and a
//! failure at any step leaves the session as it was (apart from the
//! invalidation a regeneration performs up front).

use chrono::{Local, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

use poegen_config::LlmSettings;
use poegen_llm::{LlmBackend, LlmInvocation, Message};
use poegen_prompt::{PromptBuilder, ReferenceMaterial};
use poegen_render::{RenderRequest, Renderer, TemplateSet};
use poegen_utils::error::PoeError;
use poegen_utils::logging::{log_stage_complete, log_stage_error, log_stage_start, stage_span};
use poegen_utils::types::StageId;

use crate::cache::{PendingResult, StageResult};
use crate::session::{InFlightGuard, Session, SessionStatus};

pub struct Orchestrator {
    backend: Arc<dyn LlmBackend>,
    renderer: Renderer,
    prompts: PromptBuilder,
    timeout: Duration,
}

impl Orchestrator {
    /// Orchestrator over `backend`, with prompt reference material taken
    /// from the loaded templates.
    #[must_use]
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        templates: Arc<TemplateSet>,
        timeout: Duration,
    ) -> Self {
        let references = ReferenceMaterial {
            solution_reference: templates.reference_text(StageId::Solution),
            pov_reference: templates.reference_text(StageId::PovPlan),
            migration_header: templates.migration_header().to_vec(),
        };
        Self {
            backend,
            renderer: Renderer::new(templates),
            prompts: PromptBuilder::new(references),
            timeout,
        }
    }

    /// Orchestrator over the production model client.
    ///
    /// # Errors
    ///
    /// Returns `GenerationFailed` if the HTTP client cannot be built.
    pub fn from_settings(
        settings: &LlmSettings,
        templates: Arc<TemplateSet>,
    ) -> Result<Self, PoeError> {
        let backend = poegen_llm::from_settings(settings)
            .map_err(|e| PoeError::from_llm(StageId::Solution, e))?;
        Ok(Self::new(backend, templates, settings.timeout))
    }

    #[must_use]
    pub fn templates(&self) -> &Arc<TemplateSet> {
        self.renderer.templates()
    }

    /// Produce the result of `stage`, reusing the current one if it exists.
    ///
    /// # Errors
    ///
    /// - `GenerationInProgress` while another stage of the session runs
    /// - `MissingPrerequisite` / `MissingInput` / `PromptTooLarge` before any model call
    /// - `GenerationFailed` when the model call fails
    /// - `InvalidDiagramMarkup` / `InvalidMappingOutput` / `Render` when the
    ///   answer cannot be rendered
    pub async fn generate(
        &self,
        session: &Session,
        stage: StageId,
    ) -> Result<Arc<StageResult>, PoeError> {
        let guard = session.begin(stage)?;
        if let Some(current) = session.result(stage) {
            tracing::debug!(session = %session.id(), stage = %stage, "Reusing current stage result");
            return Ok(current);
        }
        self.run(session, &guard).await
    }

    /// Discard the result of `stage` and every later stage, then generate
    /// `stage` again. The discarded results stay discarded if generation
    /// fails.
    ///
    /// # Errors
    ///
    /// As for [`generate`](Self::generate).
    pub async fn regenerate(
        &self,
        session: &Session,
        stage: StageId,
    ) -> Result<Arc<StageResult>, PoeError> {
        let guard = session.begin(stage)?;
        let removed = session.invalidate_from(&guard, stage);
        tracing::info!(
            session = %session.id(),
            stage = %stage,
            discarded = removed.len(),
            "Regenerating stage"
        );
        self.run(session, &guard).await
    }

    /// Reset the session to its empty state.
    ///
    /// # Errors
    ///
    /// Returns `GenerationInProgress` while a stage is being generated.
    pub fn clear_all(&self, session: &Session) -> Result<(), PoeError> {
        session.clear_all()?;
        tracing::info!(session = %session.id(), "Session cleared");
        Ok(())
    }

    #[must_use]
    pub fn status(&self, session: &Session) -> SessionStatus {
        session.status()
    }

    async fn run(
        &self,
        session: &Session,
        guard: &InFlightGuard<'_>,
    ) -> Result<Arc<StageResult>, PoeError> {
        let stage = guard.stage();
        let session_id = session.id().to_string();
        let span = stage_span(&session_id, stage);
        let started = Instant::now();

        let outcome = self
            .execute(session, guard, &session_id)
            .instrument(span)
            .await;

        let elapsed = started.elapsed().as_millis();
        match &outcome {
            Ok(result) => {
                log_stage_complete(&session_id, stage, elapsed, &result.artifact.file_name);
            }
            Err(err) => log_stage_error(&session_id, stage, &err.to_string(), elapsed),
        }
        outcome
    }

    async fn execute(
        &self,
        session: &Session,
        guard: &InFlightGuard<'_>,
        session_id: &str,
    ) -> Result<Arc<StageResult>, PoeError> {
        let stage = guard.stage();
        let snapshot = session.snapshot();
        let prompt = self.prompts.build(stage, &snapshot)?;
        let prerequisite_revision = stage.prerequisite().and_then(|p| snapshot.revision(p));

        log_stage_start(session_id, stage);
        let invocation = LlmInvocation::new(
            session_id,
            stage,
            self.timeout,
            vec![Message::system(prompt.system), Message::user(prompt.user)],
        );
        let answer = self
            .backend
            .invoke(invocation)
            .await
            .map_err(|e| PoeError::from_llm(stage, e))?;
        let (raw_text, llm) = answer.into_parts();

        let generated_at = Utc::now();
        let artifact = self
            .renderer
            .render(RenderRequest {
                stage,
                raw: &raw_text,
                customer: &snapshot.inputs.customer_name,
                generated_on: generated_at.with_timezone(&Local).date_naive(),
                estimates: snapshot.estimates.as_deref(),
            })
            .map_err(|e| PoeError::from_render(stage, e))?;

        session.store(
            guard,
            PendingResult {
                stage,
                raw_text,
                generated_at,
                prerequisite_revision,
                llm,
                artifact,
            },
        )
    }
}
