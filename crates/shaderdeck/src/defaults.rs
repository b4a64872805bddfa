//! Starter shader pack written by `--init`: a passthrough vertex stage, an
//! annotated fragment stage, and a shared include under `Common/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const VERTEX_STAGE: &str = "shader.vert";
pub const FRAGMENT_STAGE: &str = "shader.frag";
pub const COMMON_DIR: &str = "Common";

const STARTER_VERT: &str = r#"#version 150

in vec4 ciPosition;

void main() {
    gl_Position = ciPosition;
}
"#;

const STARTER_FRAG: &str = r#"#version 150

#include "constants.glsl"

uniform vec3 iResolution;
uniform float iGlobalTime;
uniform vec4 iMouse;
uniform vec4 iDate;

uniform float speed;   //slider:0.0,4.0,1.0
uniform float rings;   //dialer:1.0,24.0,8.0
uniform vec2 center;   //pad:-1.0,1.0,0.0
uniform vec4 tint;     //color:0.2,0.5,0.9,1.0
uniform bool invert;   //toggle:0

out vec4 fragColor;

void main() {
    vec2 uv = (gl_FragCoord.xy * 2.0 - iResolution.xy) / iResolution.y;
    float d = length(uv - center);
    float wave = 0.5 + 0.5 * sin(d * rings * TAU - iGlobalTime * speed);
    if (invert) {
        wave = 1.0 - wave;
    }
    fragColor = vec4(tint.rgb * wave, tint.a);
}
"#;

const STARTER_CONSTANTS: &str = r#"const float PI = 3.14159265359;
const float TAU = 6.28318530718;
"#;

/// Files written (or skipped because they already exist) by an install.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Writes the starter pack into `dir`, creating it if needed. Files that
/// already exist are left untouched and reported as skipped.
pub fn install_starter_pack(dir: &Path) -> Result<InstallReport> {
    let common = dir.join(COMMON_DIR);
    fs::create_dir_all(&common)
        .with_context(|| format!("failed to create shader directory at {}", dir.display()))?;

    let mut report = InstallReport::default();
    for (path, contents) in [
        (dir.join(VERTEX_STAGE), STARTER_VERT),
        (dir.join(FRAGMENT_STAGE), STARTER_FRAG),
        (common.join("constants.glsl"), STARTER_CONSTANTS),
    ] {
        if path.exists() {
            report.skipped.push(path);
            continue;
        }
        fs::write(&path, contents)
            .with_context(|| format!("failed to write starter file at {}", path.display()))?;
        report.written.push(path);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslparams::GlslParams;
    use tempfile::TempDir;

    #[test]
    fn installs_into_an_empty_directory() {
        let dir = TempDir::new().unwrap();
        let report = install_starter_pack(dir.path()).unwrap();
        assert_eq!(report.written.len(), 3);
        assert!(report.skipped.is_empty());
        assert!(dir.path().join(VERTEX_STAGE).is_file());
        assert!(dir.path().join(FRAGMENT_STAGE).is_file());
        assert!(dir.path().join(COMMON_DIR).join("constants.glsl").is_file());
    }

    #[test]
    fn never_overwrites_existing_files() {
        let dir = TempDir::new().unwrap();
        let frag = dir.path().join(FRAGMENT_STAGE);
        fs::write(&frag, "// my edits\n").unwrap();

        let report = install_starter_pack(dir.path()).unwrap();
        assert!(report.skipped.contains(&frag));
        assert_eq!(fs::read_to_string(&frag).unwrap(), "// my edits\n");
    }

    #[test]
    fn starter_fragment_scans_cleanly() {
        let outcome = GlslParams::parse_uniforms(&[STARTER_FRAG]);
        assert!(outcome.issues.is_empty());
        assert!(outcome.params.contains("speed"));
        assert!(outcome.params.contains("tint"));
        assert_eq!(outcome.params.floats()["speed"], 1.0);
    }
}
