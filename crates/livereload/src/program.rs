//! Seams between the reload pipeline and the graphics backend.

use thiserror::Error;

/// Compiler or linker diagnostic produced while building a program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BuildError(pub String);

/// Builds a compiled program from fully preprocessed stage sources.
///
/// Implementations wrap whatever compiler the backend provides. The
/// orchestrator owns its builder and runs on the thread that owns the
/// graphics context, so implementations need no internal synchronisation.
pub trait ProgramBuilder {
    type Program: UniformSink;

    fn build(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self::Program, BuildError>;
}

/// Typed uniform inputs of a compiled program.
///
/// Setters report whether the name is active on the program. A declared
/// uniform can be legitimately optimised out by the compiler, so a missing
/// name is the caller's cue to skip it, not an error.
pub trait UniformSink {
    fn set_bool(&mut self, name: &str, value: bool) -> bool;
    fn set_int(&mut self, name: &str, value: i32) -> bool;
    fn set_float(&mut self, name: &str, value: f32) -> bool;
    fn set_vec2(&mut self, name: &str, value: [f32; 2]) -> bool;
    fn set_vec3(&mut self, name: &str, value: [f32; 3]) -> bool;
    fn set_vec4(&mut self, name: &str, value: [f32; 4]) -> bool;
}
