//! Hot-reload plumbing for live shader editing: a polling file watcher
//! that coalesces write bursts, a single-slot mailbox between the watcher
//! thread and the render thread, and the orchestrator that turns a posted
//! change into a rebuilt program plus a refreshed parameter table.
//!
//! The graphics backend stays behind the [`ProgramBuilder`] and
//! [`UniformSink`] seams; nothing in this crate touches a GPU context.

mod apply;
mod mailbox;
mod orchestrator;
mod panel;
mod program;
mod watch;

pub use apply::{apply_uniforms, FrameInputs};
pub use mailbox::{Mailbox, PendingChange};
pub use orchestrator::{
    ReloadDiagnostic, ReloadError, ReloadOrchestrator, ReloadPhase, ReloadStage, ShaderArtifact,
    StageFile, TickOutcome,
};
pub use panel::{PanelRegistry, ParamsPanel};
pub use program::{BuildError, ProgramBuilder, UniformSink};
pub use watch::{ShaderWatcher, WatcherConfig};
