use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Small persisted record of the previous session, used to pick up the
/// same shader directory when the daemon restarts without arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub last_shader_dir: Option<String>,
    pub last_reload_ok: Option<bool>,
    pub reload_count: u64,
}

impl SessionState {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read state file at {}", path.display()))?;
            let state: Self = toml::from_str(&contents)
                .with_context(|| format!("failed to parse state file at {}", path.display()))?;
            Ok(state)
        } else {
            Ok(Self::default())
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("state path has no parent: {}", path.display()))?;
        fs::create_dir_all(dir).with_context(|| {
            format!(
                "failed to prepare directory for state file at {}",
                dir.display()
            )
        })?;
        let serialized = toml::to_string_pretty(self)
            .with_context(|| "failed to serialize state file to TOML".to_string())?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write state file to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");

        let mut state = SessionState::default();
        state.last_shader_dir = Some("/tmp/shaders".to_string());
        state.last_reload_ok = Some(true);
        state.reload_count = 7;
        state.persist(&path).unwrap();

        let loaded = SessionState::load_or_default(&path).unwrap();
        assert_eq!(loaded.last_shader_dir.as_deref(), Some("/tmp/shaders"));
        assert_eq!(loaded.last_reload_ok, Some(true));
        assert_eq!(loaded.reload_count, 7);
    }

    #[test]
    fn absent_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let state = SessionState::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert!(state.last_shader_dir.is_none());
        assert_eq!(state.reload_count, 0);
    }
}
