//! Stage cache, sessions and pipeline orchestration for poegen
//!
//! A [`Session`] owns the user's inputs and a [`StageCache`]; the
//! [`Orchestrator`] runs stages against a session, one at a time.

pub mod cache;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod state;

pub use cache::{StageCache, StageResult};
pub use orchestrator::Orchestrator;
pub use registry::SessionRegistry;
pub use session::{Session, SessionStatus, StageStatus};
pub use state::PipelineState;
