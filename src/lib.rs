//! poegen - pre-sales document bundles from a staged LLM pipeline
//!
//! A session holds a customer name, budget, background text, POV window and
//! team roster. Four dependent stages turn it into a document bundle:
//!
//! 1. solution architecture document (`.docx`)
//! 2. POV deployment plan (`.docx`)
//! 3. architecture diagram (`.svg`)
//! 4. migration / cost spreadsheet (`.csv`, needs uploaded estimates)
//!
//! Each stage feeds the current result of the previous one into its prompt.
//! Regenerating a stage discards every later result.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Show where each setting comes from
//! poegen config
//!
//! # Check the document templates
//! poegen templates
//!
//! # Generate stages 1-3 from a session file
//! poegen run --input session.toml
//!
//! # All four stages, with the resource estimate export
//! poegen run --input session.toml --estimates estimates.csv --out out/
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use poegen::{Config, CliArgs, Orchestrator, Session, StageId, TemplateSet};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let paths = config.template_paths();
//! let templates = Arc::new(TemplateSet::load(&paths.solution, &paths.pov, &paths.migration_header));
//! let orchestrator = Orchestrator::from_settings(&config.llm_settings()?, templates)?;
//!
//! let session = Session::new(chrono::Local::now().date_naive());
//! session.set_customer_name("宇宙无敌科技")?;
//! session.set_background("跨境电商，计划引入智能客服。")?;
//!
//! let solution = orchestrator.generate(&session, StageId::Solution).await?;
//! std::fs::write(&solution.artifact.file_name, &solution.artifact.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod cli;
pub mod session_file;

pub use poegen_config::{CliArgs, Config, LlmSettings, TemplatePaths};
pub use poegen_llm::{LlmBackend, LlmInvocation, LlmResult, Message};
pub use poegen_engine::{
    Orchestrator, PipelineState, Session, SessionRegistry, SessionStatus, StageCache, StageResult,
    StageStatus,
};
pub use poegen_render::{RenderedArtifact, TemplateSet, TemplateStatus};
pub use poegen_utils::error::{ConfigError, LlmError, PoeError, RenderError, UserFriendlyError};
pub use poegen_utils::exit_codes::ExitCode;
pub use poegen_utils::types::{PovWindow, ResourceEstimate, SessionInputs, StageId};
