//! Drives the reload cycle: pick up a pending change, preprocess both
//! stages, rescan uniforms, rebuild the program, publish the new artifact.
//! At most one cycle runs per tick, on the caller's thread. A failed cycle
//! leaves the previous artifact rendering untouched and parks the machine
//! in `Failed` until the next change arrives.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info};

use glslparams::{GlslParams, PreprocessError, Preprocessor};

use crate::apply::{apply_uniforms, FrameInputs};
use crate::mailbox::{Mailbox, PendingChange};
use crate::program::{BuildError, ProgramBuilder};

/// Where the orchestrator currently is in the reload cycle. The transient
/// phases are visible to diagnostics; between ticks the machine rests in
/// `Idle` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPhase {
    Idle,
    PendingPickup,
    Preprocessing,
    Parsing,
    Building,
    Publishing,
    Failed,
}

/// Pipeline stage a failed cycle was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStage {
    Preprocess,
    Parse,
    Build,
}

impl fmt::Display for ReloadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preprocess => "preprocess",
            Self::Parse => "parse",
            Self::Build => "build",
        })
    }
}

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("stage '{id}' is not valid UTF-8")]
    SourceEncoding { id: String },

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl ReloadError {
    pub fn stage(&self) -> ReloadStage {
        match self {
            Self::Preprocess(_) => ReloadStage::Preprocess,
            Self::SourceEncoding { .. } => ReloadStage::Parse,
            Self::Build(_) => ReloadStage::Build,
        }
    }
}

/// Record of the most recent failed cycle, kept until a cycle succeeds.
#[derive(Debug, Clone)]
pub struct ReloadDiagnostic {
    pub stage: ReloadStage,
    pub message: String,
    pub at: Instant,
}

/// What a call to [`ReloadOrchestrator::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pending change; nothing ran.
    Quiet,
    /// A cycle ran and a new artifact was published.
    Reloaded,
    /// A cycle ran and failed; the previous artifact stays active.
    Failed,
}

/// A shader stage tracked by the orchestrator: a logical id matching the
/// watcher's tracked set, and the path used for disk fallback reads.
#[derive(Debug, Clone)]
pub struct StageFile {
    pub id: String,
    pub path: PathBuf,
}

impl StageFile {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// Everything a successful cycle publishes, replaced as a whole. The
/// applier never observes a half-updated pairing of program and table.
pub struct ShaderArtifact<P> {
    pub vertex_source: String,
    pub fragment_source: String,
    pub program: P,
    pub params: GlslParams,
}

pub struct ReloadOrchestrator<B: ProgramBuilder> {
    builder: B,
    preprocessor: Preprocessor,
    vertex: StageFile,
    fragment: StageFile,
    mailbox: Mailbox,
    artifact: Option<ShaderArtifact<B::Program>>,
    phase: ReloadPhase,
    diagnostic: Option<ReloadDiagnostic>,
}

impl<B: ProgramBuilder> ReloadOrchestrator<B> {
    pub fn new(
        builder: B,
        preprocessor: Preprocessor,
        vertex: StageFile,
        fragment: StageFile,
        mailbox: Mailbox,
    ) -> Self {
        Self {
            builder,
            preprocessor,
            vertex,
            fragment,
            mailbox,
            artifact: None,
            phase: ReloadPhase::Idle,
            diagnostic: None,
        }
    }

    /// Initial load from disk, before any watcher change exists.
    pub fn load(&mut self) -> Result<(), ReloadError> {
        self.attempt(PendingChange::empty())
    }

    /// Runs at most one reload cycle, and only if a change is pending.
    /// Call once per frame from the thread that owns the builder.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(change) = self.mailbox.take() else {
            return TickOutcome::Quiet;
        };
        match self.attempt(change) {
            Ok(()) => TickOutcome::Reloaded,
            Err(_) => TickOutcome::Failed,
        }
    }

    fn attempt(&mut self, change: PendingChange) -> Result<(), ReloadError> {
        match self.run_cycle(change) {
            Ok(()) => {
                self.diagnostic = None;
                Ok(())
            }
            Err(err) => {
                let stage = err.stage();
                error!(%err, %stage, "reload failed; previous program stays active");
                self.diagnostic = Some(ReloadDiagnostic {
                    stage,
                    message: err.to_string(),
                    at: Instant::now(),
                });
                self.phase = ReloadPhase::Failed;
                Err(err)
            }
        }
    }

    fn run_cycle(&mut self, change: PendingChange) -> Result<(), ReloadError> {
        self.phase = ReloadPhase::PendingPickup;
        debug!(sources = change.sources.len(), "picked up pending change");

        self.phase = ReloadPhase::Preprocessing;
        let vertex_source = expanded_stage(&self.preprocessor, &change, &self.vertex)?;
        let fragment_source = expanded_stage(&self.preprocessor, &change, &self.fragment)?;

        self.phase = ReloadPhase::Parsing;
        let outcome = GlslParams::parse_uniforms(&[&vertex_source, &fragment_source]);
        outcome.log_warnings();
        let mut params = outcome.params;
        if let Some(previous) = &self.artifact {
            params.adopt_values(&previous.params);
        }

        self.phase = ReloadPhase::Building;
        let program = self.builder.build(&vertex_source, &fragment_source)?;

        self.phase = ReloadPhase::Publishing;
        let retired = self.artifact.replace(ShaderArtifact {
            vertex_source,
            fragment_source,
            program,
            params,
        });
        // The outgoing program is released only after its successor is live.
        drop(retired);
        if let Some(artifact) = &self.artifact {
            info!(params = artifact.params.len(), "published new shader artifact");
        }
        self.phase = ReloadPhase::Idle;
        Ok(())
    }

    /// Pushes current parameter values and frame built-ins into the active
    /// program. No-op until the first successful load.
    pub fn apply(&mut self, frame: &FrameInputs) {
        if let Some(artifact) = self.artifact.as_mut() {
            apply_uniforms(&mut artifact.program, &artifact.params, frame);
        }
    }

    pub fn artifact(&self) -> Option<&ShaderArtifact<B::Program>> {
        self.artifact.as_ref()
    }

    /// Mutable parameter table of the active artifact, for UI writes.
    pub fn params_mut(&mut self) -> Option<&mut GlslParams> {
        self.artifact.as_mut().map(|artifact| &mut artifact.params)
    }

    pub fn phase(&self) -> ReloadPhase {
        self.phase
    }

    pub fn diagnostic(&self) -> Option<&ReloadDiagnostic> {
        self.diagnostic.as_ref()
    }
}

/// Expands one stage, preferring bytes captured by the watcher and falling
/// back to a disk read. Includes always come from disk, so an edited
/// include takes effect even when only the entry file was captured.
fn expanded_stage(
    preprocessor: &Preprocessor,
    change: &PendingChange,
    stage: &StageFile,
) -> Result<String, ReloadError> {
    match change.sources.get(&stage.id) {
        Some(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| ReloadError::SourceEncoding {
                id: stage.id.clone(),
            })?;
            Ok(preprocessor.expand_source(text, &stage.path)?)
        }
        None => Ok(preprocessor.expand_file(&stage.path)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::UniformSink;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct StubProgram {
        generation: usize,
    }

    impl UniformSink for StubProgram {
        fn set_bool(&mut self, _: &str, _: bool) -> bool {
            true
        }
        fn set_int(&mut self, _: &str, _: i32) -> bool {
            true
        }
        fn set_float(&mut self, _: &str, _: f32) -> bool {
            true
        }
        fn set_vec2(&mut self, _: &str, _: [f32; 2]) -> bool {
            true
        }
        fn set_vec3(&mut self, _: &str, _: [f32; 3]) -> bool {
            true
        }
        fn set_vec4(&mut self, _: &str, _: [f32; 4]) -> bool {
            true
        }
    }

    struct StubBuilder {
        fail_next: Rc<Cell<bool>>,
        builds: Rc<Cell<usize>>,
    }

    impl StubBuilder {
        fn new() -> (Self, Rc<Cell<bool>>, Rc<Cell<usize>>) {
            let fail_next = Rc::new(Cell::new(false));
            let builds = Rc::new(Cell::new(0));
            (
                Self {
                    fail_next: fail_next.clone(),
                    builds: builds.clone(),
                },
                fail_next,
                builds,
            )
        }
    }

    impl ProgramBuilder for StubBuilder {
        type Program = StubProgram;

        fn build(&mut self, _: &str, _: &str) -> Result<StubProgram, BuildError> {
            if self.fail_next.get() {
                return Err(BuildError("stub compile error".into()));
            }
            self.builds.set(self.builds.get() + 1);
            Ok(StubProgram {
                generation: self.builds.get(),
            })
        }
    }

    fn change(vert: &str, frag: &str) -> PendingChange {
        let mut sources = HashMap::new();
        sources.insert("shader.vert".to_string(), vert.as_bytes().to_vec());
        sources.insert("shader.frag".to_string(), frag.as_bytes().to_vec());
        PendingChange {
            sources,
            detected_at: Instant::now(),
        }
    }

    fn orchestrator(
        builder: StubBuilder,
    ) -> (ReloadOrchestrator<StubBuilder>, Mailbox) {
        let mailbox = Mailbox::new();
        let orchestrator = ReloadOrchestrator::new(
            builder,
            Preprocessor::new(),
            StageFile::new("shader.vert", "shader.vert"),
            StageFile::new("shader.frag", "shader.frag"),
            mailbox.clone(),
        );
        (orchestrator, mailbox)
    }

    const VERT: &str = "void main() {}\n";

    #[test]
    fn quiet_mailbox_runs_nothing() {
        let (builder, _, builds) = StubBuilder::new();
        let (mut orch, _mailbox) = orchestrator(builder);
        assert_eq!(orch.tick(), TickOutcome::Quiet);
        assert_eq!(builds.get(), 0);
        assert!(orch.artifact().is_none());
    }

    #[test]
    fn successful_cycle_publishes_program_and_params() {
        let (builder, _, _) = StubBuilder::new();
        let (mut orch, mailbox) = orchestrator(builder);
        mailbox.post(change(
            VERT,
            "uniform float speed; //slider:0.0,1.0,0.5\nvoid main() {}\n",
        ));
        assert_eq!(orch.tick(), TickOutcome::Reloaded);
        assert_eq!(orch.phase(), ReloadPhase::Idle);
        let artifact = orch.artifact().unwrap();
        assert_eq!(artifact.params.len(), 1);
        assert_eq!(artifact.params.floats()["speed"], 0.5);
        assert_eq!(artifact.program.generation, 1);
    }

    #[test]
    fn failed_build_keeps_previous_artifact() {
        let (builder, fail_next, _) = StubBuilder::new();
        let (mut orch, mailbox) = orchestrator(builder);
        mailbox.post(change(VERT, "uniform float speed; //slider:0,1,0.5\n"));
        assert_eq!(orch.tick(), TickOutcome::Reloaded);

        fail_next.set(true);
        mailbox.post(change(VERT, "uniform float broken;\n"));
        assert_eq!(orch.tick(), TickOutcome::Failed);
        assert_eq!(orch.phase(), ReloadPhase::Failed);

        let diagnostic = orch.diagnostic().unwrap();
        assert_eq!(diagnostic.stage, ReloadStage::Build);

        // Previous artifact still active, old params intact.
        let artifact = orch.artifact().unwrap();
        assert_eq!(artifact.program.generation, 1);
        assert!(artifact.params.contains("speed"));
        assert!(!artifact.params.contains("broken"));
    }

    #[test]
    fn failed_state_waits_for_the_next_change() {
        let (builder, fail_next, builds) = StubBuilder::new();
        let (mut orch, mailbox) = orchestrator(builder);

        fail_next.set(true);
        mailbox.post(change(VERT, "void main() {}\n"));
        assert_eq!(orch.tick(), TickOutcome::Failed);

        // No change posted: the machine stays parked, nothing retries.
        assert_eq!(orch.tick(), TickOutcome::Quiet);
        assert_eq!(orch.phase(), ReloadPhase::Failed);
        assert_eq!(builds.get(), 0);

        fail_next.set(false);
        mailbox.post(change(VERT, "void main() {}\n"));
        assert_eq!(orch.tick(), TickOutcome::Reloaded);
        assert_eq!(orch.phase(), ReloadPhase::Idle);
        assert!(orch.diagnostic().is_none());
    }

    #[test]
    fn tuned_value_survives_reload_with_new_bounds() {
        let (builder, _, _) = StubBuilder::new();
        let (mut orch, mailbox) = orchestrator(builder);
        mailbox.post(change(VERT, "uniform float speed; //slider:0.0,1.0,0.2\n"));
        assert_eq!(orch.tick(), TickOutcome::Reloaded);

        let params = orch.params_mut().unwrap();
        assert!(params.set_value("speed", glslparams::ParamValue::Float(0.9)));

        mailbox.post(change(VERT, "uniform float speed; //slider:0.0,2.0,0.2\n"));
        assert_eq!(orch.tick(), TickOutcome::Reloaded);

        let artifact = orch.artifact().unwrap();
        assert_eq!(artifact.params.floats()["speed"], 0.9);
        assert_eq!(artifact.params.float_range("speed"), Some((0.0, 2.0)));
        assert_eq!(artifact.program.generation, 2);
    }

    #[test]
    fn one_cycle_per_tick_even_with_rapid_posts() {
        let (builder, _, builds) = StubBuilder::new();
        let (mut orch, mailbox) = orchestrator(builder);
        mailbox.post(change(VERT, "// v1\nvoid main() {}\n"));
        mailbox.post(change(VERT, "// v2\nvoid main() {}\n"));

        assert_eq!(orch.tick(), TickOutcome::Reloaded);
        assert_eq!(builds.get(), 1);
        assert!(orch.artifact().unwrap().fragment_source.contains("v2"));

        assert_eq!(orch.tick(), TickOutcome::Quiet);
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn preprocess_failure_is_classified() {
        let (builder, _, _) = StubBuilder::new();
        let (mut orch, mailbox) = orchestrator(builder);
        mailbox.post(change(VERT, "#include \"missing.glsl\"\n"));
        assert_eq!(orch.tick(), TickOutcome::Failed);
        assert_eq!(orch.diagnostic().unwrap().stage, ReloadStage::Preprocess);
        assert!(orch.artifact().is_none());
    }
}
