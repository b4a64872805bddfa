//! Expands `#include "name"` directives into a single flattened source
//! string per shader stage. Resolution walks the registered search
//! directories in registration order and the first match wins. The
//! expansion is a pure function of the entry source and the directories;
//! it holds no state and is safe to call from any thread.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("include \"{name}\" not found in any search directory (referenced from {from})")]
    IncludeNotFound { name: String, from: PathBuf },

    #[error("include cycle detected at {0}")]
    IncludeCycle(PathBuf),

    #[error("malformed include directive: {0}")]
    MalformedInclude(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    search_dirs: Vec<PathBuf>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a directory to resolve includes against. Directories are
    /// consulted in registration order.
    pub fn add_search_directory(&mut self, dir: impl Into<PathBuf>) {
        self.search_dirs.push(dir.into());
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Reads and fully expands an entry file.
    pub fn expand_file(&self, entry: &Path) -> Result<String, PreprocessError> {
        let source = read_source(entry)?;
        self.expand_source(&source, entry)
    }

    /// Fully expands an in-memory source string. `origin` names where the
    /// bytes came from; it anchors cycle detection and error reporting when
    /// the caller received the bytes across a thread boundary rather than
    /// reading the file itself.
    pub fn expand_source(&self, source: &str, origin: &Path) -> Result<String, PreprocessError> {
        let mut output = String::with_capacity(source.len());
        let mut stack = vec![origin.to_path_buf()];
        self.expand_into(source, origin, &mut output, &mut stack)?;
        Ok(output)
    }

    fn expand_into(
        &self,
        source: &str,
        origin: &Path,
        output: &mut String,
        stack: &mut Vec<PathBuf>,
    ) -> Result<(), PreprocessError> {
        for line in source.lines() {
            match parse_include(line)? {
                Some(name) => {
                    let resolved = self.resolve(name).ok_or_else(|| {
                        PreprocessError::IncludeNotFound {
                            name: name.to_string(),
                            from: origin.to_path_buf(),
                        }
                    })?;
                    if stack.contains(&resolved) {
                        return Err(PreprocessError::IncludeCycle(resolved));
                    }
                    let nested = read_source(&resolved)?;
                    stack.push(resolved.clone());
                    self.expand_into(&nested, &resolved, output, stack)?;
                    stack.pop();
                }
                None => {
                    output.push_str(line);
                    output.push('\n');
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.search_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

/// Recognises `#include "name"`. Returns the quoted name, `None` for
/// ordinary lines, and an error for an include directive missing its
/// quoted operand.
fn parse_include(line: &str) -> Result<Option<&str>, PreprocessError> {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix("#include") else {
        return Ok(None);
    };
    let rest = rest.trim();
    let name = rest
        .strip_prefix('"')
        .and_then(|tail| tail.split_once('"'))
        .map(|(name, _)| name);
    match name {
        Some(name) if !name.is_empty() => Ok(Some(name)),
        _ => Err(PreprocessError::MalformedInclude(trimmed.to_string())),
    }
}

fn read_source(path: &Path) -> Result<String, PreprocessError> {
    fs::read_to_string(path).map_err(|source| PreprocessError::Io {
        path: path.to_path_buf(),
        source,
    })
}
