//! Headless program builder: structural checks stand in for a GPU
//! compiler so the daemon exercises the full reload pipeline, including
//! the failure path, without a graphics context.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use livereload::{BuildError, ProgramBuilder, UniformSink};

#[derive(Debug, Default)]
pub struct LintBuilder;

impl ProgramBuilder for LintBuilder {
    type Program = LintedProgram;

    fn build(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<LintedProgram, BuildError> {
        lint_stage("vertex", vertex_source)?;
        lint_stage("fragment", fragment_source)?;

        let mut active = HashSet::new();
        collect_uniform_names(vertex_source, &mut active);
        collect_uniform_names(fragment_source, &mut active);
        Ok(LintedProgram {
            active,
            values: HashMap::new(),
        })
    }
}

fn lint_stage(label: &str, source: &str) -> Result<(), BuildError> {
    if !source.contains("void main") {
        return Err(BuildError(format!(
            "{label} shader has no main entry point"
        )));
    }
    let mut depth: i64 = 0;
    for ch in source.chars() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(BuildError(format!("unbalanced braces in {label} shader")));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(BuildError(format!("unbalanced braces in {label} shader")));
    }
    Ok(())
}

fn collect_uniform_names(source: &str, into: &mut HashSet<String>) {
    for line in source.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix("uniform ") else {
            continue;
        };
        let rest = rest.trim_start();
        let Some((_, rest)) = rest.split_once(char::is_whitespace) else {
            continue;
        };
        if let Some(name) = rest.split(';').next() {
            let name = name.trim();
            if !name.is_empty() {
                into.insert(name.to_string());
            }
        }
    }
}

/// Stand-in program: remembers which uniforms the sources declared and the
/// latest value pushed to each, widened to four lanes.
#[derive(Debug)]
pub struct LintedProgram {
    active: HashSet<String>,
    values: HashMap<String, [f32; 4]>,
}

impl LintedProgram {
    fn store(&mut self, name: &str, value: [f32; 4]) -> bool {
        if !self.active.contains(name) {
            return false;
        }
        trace!(uniform = name, ?value, "uniform applied");
        self.values.insert(name.to_string(), value);
        true
    }

    #[cfg(test)]
    fn value(&self, name: &str) -> Option<[f32; 4]> {
        self.values.get(name).copied()
    }
}

impl UniformSink for LintedProgram {
    fn set_bool(&mut self, name: &str, value: bool) -> bool {
        self.store(name, [if value { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0])
    }

    fn set_int(&mut self, name: &str, value: i32) -> bool {
        self.store(name, [value as f32, 0.0, 0.0, 0.0])
    }

    fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.store(name, [value, 0.0, 0.0, 0.0])
    }

    fn set_vec2(&mut self, name: &str, value: [f32; 2]) -> bool {
        self.store(name, [value[0], value[1], 0.0, 0.0])
    }

    fn set_vec3(&mut self, name: &str, value: [f32; 3]) -> bool {
        self.store(name, [value[0], value[1], value[2], 0.0])
    }

    fn set_vec4(&mut self, name: &str, value: [f32; 4]) -> bool {
        self.store(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERT: &str = "void main() { gl_Position = vec4(0.0); }\n";

    #[test]
    fn accepts_a_wellformed_pair() {
        let mut builder = LintBuilder;
        let frag = "uniform float speed;\nvoid main() { }\n";
        let program = builder.build(VERT, frag).unwrap();
        assert!(program.active.contains("speed"));
    }

    #[test]
    fn rejects_a_stage_without_main() {
        let mut builder = LintBuilder;
        let err = builder.build(VERT, "uniform float speed;\n").unwrap_err();
        assert!(err.0.contains("fragment"));
    }

    #[test]
    fn rejects_unbalanced_braces() {
        let mut builder = LintBuilder;
        let err = builder.build(VERT, "void main() { {\n").unwrap_err();
        assert!(err.0.contains("unbalanced"));
        let err = builder.build("void main() } {", "void main() {}\n").unwrap_err();
        assert!(err.0.contains("vertex"));
    }

    #[test]
    fn setters_report_active_names_only() {
        let mut builder = LintBuilder;
        let frag = "uniform float speed;\nvoid main() {}\n";
        let mut program = builder.build(VERT, frag).unwrap();
        assert!(program.set_float("speed", 0.75));
        assert!(!program.set_float("ghost", 1.0));
        assert_eq!(program.value("speed"), Some([0.75, 0.0, 0.0, 0.0]));
        assert_eq!(program.value("ghost"), None);
    }
}
