//! Polls modification timestamps for a fixed set of shader files on a
//! background thread and posts a coalesced [`PendingChange`] once a write
//! burst has gone quiet. The watcher only observes and captures bytes; it
//! never parses or compiles.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use crate::mailbox::{Mailbox, PendingChange};

/// Poll cadence and write-burst coalescing for the watcher thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    /// Quiet window that must elapse after the last observed modification
    /// before a change is posted. Every further modification restarts it.
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            debounce: Duration::from_millis(200),
        }
    }
}

struct TrackedFile {
    id: String,
    path: PathBuf,
    modified: Option<SystemTime>,
}

/// Coalescing state, separated from the thread so the debounce logic can
/// be driven deterministically in tests.
struct WatchState {
    files: Vec<TrackedFile>,
    config: WatcherConfig,
    deadline: Option<Instant>,
}

impl WatchState {
    fn new(files: Vec<(String, PathBuf)>, config: WatcherConfig) -> Self {
        let files = files
            .into_iter()
            .map(|(id, path)| {
                let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
                TrackedFile { id, path, modified }
            })
            .collect();
        Self {
            files,
            config,
            deadline: None,
        }
    }

    /// One poll pass. Returns a change once the debounce window has fully
    /// elapsed with no further modifications.
    fn poll(&mut self, now: Instant) -> Option<PendingChange> {
        let mut dirty = false;
        for file in &mut self.files {
            match fs::metadata(&file.path).and_then(|m| m.modified()) {
                Ok(modified) => {
                    if file.modified != Some(modified) {
                        debug!(id = %file.id, "source modification observed");
                        file.modified = Some(modified);
                        dirty = true;
                    }
                }
                Err(err) => {
                    // Editors swap files out briefly on save; keep the last
                    // timestamp and catch the replacement on the next pass.
                    trace!(id = %file.id, %err, "stat failed");
                }
            }
        }
        if dirty {
            self.deadline = Some(now + self.config.debounce);
            return None;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(self.capture(now))
            }
            _ => None,
        }
    }

    fn capture(&self, now: Instant) -> PendingChange {
        let mut sources = HashMap::new();
        for file in &self.files {
            match fs::read(&file.path) {
                Ok(bytes) => {
                    sources.insert(file.id.clone(), bytes);
                }
                Err(err) => {
                    warn!(id = %file.id, %err, "failed to capture source bytes");
                }
            }
        }
        PendingChange {
            sources,
            detected_at: now,
        }
    }
}

/// Background watcher thread; joins on drop.
pub struct ShaderWatcher {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ShaderWatcher {
    /// Spawns the polling thread. `files` pairs a logical id with the path
    /// it tracks; the set is fixed for the watcher's lifetime.
    pub fn spawn(
        files: Vec<(String, PathBuf)>,
        config: WatcherConfig,
        mailbox: Mailbox,
    ) -> Result<Self> {
        if files.is_empty() {
            bail!("watcher needs at least one file to track");
        }
        let (stop, stop_rx) = bounded::<()>(0);
        let mut state = WatchState::new(files, config);
        let handle = thread::Builder::new()
            .name("shader-watch".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(config.poll_interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(change) = state.poll(Instant::now()) {
                            debug!(
                                sources = change.sources.len(),
                                "posting coalesced shader change"
                            );
                            mailbox.post(change);
                        }
                    }
                    _ => break,
                }
            })
            .context("failed to spawn shader watch thread")?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for ShaderWatcher {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG: WatcherConfig = WatcherConfig {
        poll_interval: Duration::from_millis(10),
        debounce: Duration::from_millis(50),
    };

    fn pause() {
        thread::sleep(Duration::from_millis(20));
    }

    #[test]
    fn quiet_files_produce_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("shader.frag");
        fs::write(&path, "void main() {}").unwrap();

        let mut state = WatchState::new(vec![("shader.frag".into(), path)], CONFIG);
        let now = Instant::now();
        assert!(state.poll(now).is_none());
        assert!(state.poll(now + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn rapid_writes_coalesce_into_one_change() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("shader.frag");
        fs::write(&path, "v0").unwrap();

        let mut state = WatchState::new(vec![("shader.frag".into(), path.clone())], CONFIG);
        pause();
        fs::write(&path, "v1").unwrap();
        let t0 = Instant::now();
        assert!(state.poll(t0).is_none(), "first write opens the window");

        pause();
        fs::write(&path, "v2").unwrap();
        let t1 = Instant::now();
        assert!(state.poll(t1).is_none(), "second write restarts the window");

        // Quiet pass before the deadline keeps waiting.
        assert!(state.poll(t1 + Duration::from_millis(10)).is_none());

        let change = state
            .poll(t1 + Duration::from_millis(100))
            .expect("debounce elapsed");
        assert_eq!(change.sources["shader.frag"], b"v2");

        // The burst is consumed; nothing further is posted.
        assert!(state.poll(t1 + Duration::from_millis(200)).is_none());
    }

    #[test]
    fn capture_covers_every_tracked_file() {
        let temp = tempfile::tempdir().unwrap();
        let vert = temp.path().join("shader.vert");
        let frag = temp.path().join("shader.frag");
        fs::write(&vert, "vert v0").unwrap();
        fs::write(&frag, "frag v0").unwrap();

        let mut state = WatchState::new(
            vec![
                ("shader.vert".into(), vert),
                ("shader.frag".into(), frag.clone()),
            ],
            CONFIG,
        );
        pause();
        fs::write(&frag, "frag v1").unwrap();
        let t0 = Instant::now();
        assert!(state.poll(t0).is_none());

        let change = state
            .poll(t0 + Duration::from_millis(100))
            .expect("debounce elapsed");
        assert_eq!(change.sources["shader.vert"], b"vert v0");
        assert_eq!(change.sources["shader.frag"], b"frag v1");
    }

    #[test]
    fn missing_file_appearing_later_is_a_change() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("shader.frag");

        let mut state = WatchState::new(vec![("shader.frag".into(), path.clone())], CONFIG);
        let t0 = Instant::now();
        assert!(state.poll(t0).is_none());

        fs::write(&path, "born").unwrap();
        let t1 = Instant::now();
        assert!(state.poll(t1).is_none());
        let change = state
            .poll(t1 + Duration::from_millis(100))
            .expect("debounce elapsed");
        assert_eq!(change.sources["shader.frag"], b"born");
    }

    #[test]
    fn watcher_thread_posts_to_mailbox() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("shader.frag");
        fs::write(&path, "v0").unwrap();

        let mailbox = Mailbox::new();
        let watcher = ShaderWatcher::spawn(
            vec![("shader.frag".into(), path.clone())],
            CONFIG,
            mailbox.clone(),
        )
        .unwrap();

        pause();
        fs::write(&path, "v1").unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let change = loop {
            if let Some(change) = mailbox.take() {
                break change;
            }
            assert!(Instant::now() < deadline, "watcher never posted");
            thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(change.sources["shader.frag"], b"v1");
        drop(watcher);
    }
}
