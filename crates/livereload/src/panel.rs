//! Named parameter panels and the registry that rebuilds them after a
//! reload. The registry is plain owned state passed by reference; panel
//! lookup is deliberately not process-wide.

use std::collections::HashMap;

use glslparams::GlslParams;

/// A UI surface that can rebuild its widget bindings from a parameter
/// table. Rebuilding replaces the panel's bindings wholesale; stale
/// widgets from the previous table must not survive.
pub trait ParamsPanel {
    fn rebuild(&mut self, params: &GlslParams);
}

/// Registry of named panels.
#[derive(Debug, Default)]
pub struct PanelRegistry<P> {
    panels: HashMap<String, P>,
}

impl<P: ParamsPanel> PanelRegistry<P> {
    pub fn new() -> Self {
        Self {
            panels: HashMap::new(),
        }
    }

    /// Registers a panel under a name, returning the displaced panel if
    /// the name was taken.
    pub fn insert(&mut self, name: impl Into<String>, panel: P) -> Option<P> {
        self.panels.insert(name.into(), panel)
    }

    pub fn remove(&mut self, name: &str) -> Option<P> {
        self.panels.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&P> {
        self.panels.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut P> {
        self.panels.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.panels.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Rebuilds exactly the named panel; every other panel is untouched.
    /// Returns false when no panel is registered under `name`.
    pub fn rebuild(&mut self, name: &str, params: &GlslParams) -> bool {
        match self.panels.get_mut(name) {
            Some(panel) => {
                panel.rebuild(params);
                true
            }
            None => false,
        }
    }
}
