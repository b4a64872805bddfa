use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use glslparams::{GlslParams, Preprocessor, ValueType};
use livereload::{
    FrameInputs, Mailbox, PanelRegistry, ParamsPanel, ReloadOrchestrator, ShaderWatcher,
    StageFile, TickOutcome, WatcherConfig,
};

use crate::builder::LintBuilder;
use crate::cli::Args;
use crate::config::DeckConfig;
use crate::defaults::{install_starter_pack, COMMON_DIR, FRAGMENT_STAGE, VERTEX_STAGE};
use crate::paths::AppPaths;
use crate::state::SessionState;

const PARAMS_PANEL: &str = "params";

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    let config_path = args.config.clone().unwrap_or_else(|| paths.config_file());
    let mut config = DeckConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load configuration at {}", config_path.display()))?;

    apply_overrides(&mut config, &args)?;

    let state_path = paths.state_file();
    let mut state = SessionState::load_or_default(&state_path)?;

    let shader_dir = resolve_shader_dir(args.shader_dir.clone(), &config, &state, &paths);

    if args.init {
        let report = install_starter_pack(&shader_dir)?;
        for path in &report.written {
            info!(file = %path.display(), "wrote starter file");
        }
        for path in &report.skipped {
            info!(file = %path.display(), "kept existing file");
        }
        return Ok(());
    }

    let vertex_path = shader_dir.join(VERTEX_STAGE);
    let fragment_path = shader_dir.join(FRAGMENT_STAGE);
    ensure!(
        vertex_path.is_file() && fragment_path.is_file(),
        "shader directory {} is missing {VERTEX_STAGE} or {FRAGMENT_STAGE} (run with --init to create a starter pack)",
        shader_dir.display()
    );

    state.last_shader_dir = Some(shader_dir.display().to_string());

    let mut preprocessor = Preprocessor::new();
    preprocessor.add_search_directory(&shader_dir);
    preprocessor.add_search_directory(shader_dir.join(COMMON_DIR));
    for dir in &config.include_dirs {
        let dir = if dir.is_absolute() {
            dir.clone()
        } else {
            shader_dir.join(dir)
        };
        preprocessor.add_search_directory(dir);
    }

    let mailbox = Mailbox::new();
    let watcher = ShaderWatcher::spawn(
        tracked_files(&shader_dir, &vertex_path, &fragment_path),
        WatcherConfig {
            poll_interval: config.poll_interval,
            debounce: config.debounce,
        },
        mailbox.clone(),
    )?;

    let mut orchestrator = ReloadOrchestrator::new(
        LintBuilder,
        preprocessor,
        StageFile::new(VERTEX_STAGE, &vertex_path),
        StageFile::new(FRAGMENT_STAGE, &fragment_path),
        mailbox,
    );

    let mut panels = PanelRegistry::new();
    panels.insert(PARAMS_PANEL, TablePanel::default());

    match orchestrator.load() {
        Ok(()) => {
            if let Some(artifact) = orchestrator.artifact() {
                panels.rebuild(PARAMS_PANEL, &artifact.params);
            }
            state.last_reload_ok = Some(true);
        }
        Err(err) => {
            warn!(%err, "initial shader load failed; waiting for edits");
            state.last_reload_ok = Some(false);
        }
    }
    if let Err(err) = state.persist(&state_path) {
        warn!(%err, "failed to persist session state");
    }

    info!(
        shaders = %shader_dir.display(),
        fps = config.fps,
        width = config.resolution[0],
        height = config.resolution[1],
        "watching for shader edits"
    );

    let frame_interval = Duration::from_secs_f32(1.0 / config.fps);
    let resolution = [config.resolution[0] as f32, config.resolution[1] as f32];
    let started = Instant::now();
    let mut frame: u64 = 0;
    let mut window_start = Instant::now();
    let mut window_frames: u64 = 0;

    loop {
        let frame_started = Instant::now();

        match orchestrator.tick() {
            TickOutcome::Reloaded => {
                state.reload_count += 1;
                state.last_reload_ok = Some(true);
                if let Some(artifact) = orchestrator.artifact() {
                    panels.rebuild(PARAMS_PANEL, &artifact.params);
                }
            }
            TickOutcome::Failed => {
                state.last_reload_ok = Some(false);
            }
            TickOutcome::Quiet => {}
        }

        let inputs = FrameInputs::new(
            resolution,
            started.elapsed().as_secs_f32(),
            [0.0; 2],
            [0.0; 2],
        );
        orchestrator.apply(&inputs);

        frame += 1;
        window_frames += 1;
        if window_start.elapsed() >= Duration::from_secs(1) {
            let fps = window_frames as f32 / window_start.elapsed().as_secs_f32();
            debug!(fps = format!("{fps:.1}"), "frame pacing");
            window_start = Instant::now();
            window_frames = 0;
        }

        if let Some(limit) = args.frames {
            if frame >= limit {
                info!(frames = frame, "frame limit reached");
                break;
            }
        }

        let elapsed = frame_started.elapsed();
        if elapsed < frame_interval {
            thread::sleep(frame_interval - elapsed);
        }
    }

    drop(watcher);
    if let Err(err) = state.persist(&state_path) {
        warn!(%err, "failed to persist session state");
    }
    Ok(())
}

fn apply_overrides(config: &mut DeckConfig, args: &Args) -> Result<()> {
    if let Some(fps) = args.fps {
        ensure!(
            fps.is_finite() && fps > 0.0,
            "--fps must be a positive number"
        );
        config.fps = fps;
    }
    if let Some(ref size) = args.size {
        let (width, height) = parse_surface_size(size)?;
        config.resolution = [width, height];
    }
    Ok(())
}

/// CLI argument, then configured directory, then the directory from the
/// previous session, then the per-user default.
fn resolve_shader_dir(
    cli: Option<PathBuf>,
    config: &DeckConfig,
    state: &SessionState,
    paths: &AppPaths,
) -> PathBuf {
    cli.or_else(|| config.shader_dir.clone())
        .or_else(|| state.last_shader_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| paths.default_shader_dir())
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// The fixed watch set: both stage entry files plus everything in the
/// shared include folder, so editing an include triggers a reload too.
fn tracked_files(
    shader_dir: &std::path::Path,
    vertex_path: &std::path::Path,
    fragment_path: &std::path::Path,
) -> Vec<(String, PathBuf)> {
    let mut files = vec![
        (VERTEX_STAGE.to_string(), vertex_path.to_path_buf()),
        (FRAGMENT_STAGE.to_string(), fragment_path.to_path_buf()),
    ];
    let common = shader_dir.join(COMMON_DIR);
    if let Ok(entries) = fs::read_dir(&common) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                let id = format!("{COMMON_DIR}/{}", entry.file_name().to_string_lossy());
                files.push((id, path));
            }
        }
    }
    files
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    ensure!(width > 0 && height > 0, "size must be nonzero");
    Ok((width, height))
}

/// Logs the ordered parameter table after each reload; the terminal
/// rendition of the widget panel a windowed frontend would rebuild.
#[derive(Debug, Default)]
struct TablePanel {
    bindings: usize,
}

impl ParamsPanel for TablePanel {
    fn rebuild(&mut self, params: &GlslParams) {
        self.bindings = params.len();
        info!(params = params.len(), "rebuilding parameter panel");
        for descriptor in params.descriptors() {
            let range = match descriptor.value_type {
                ValueType::Bool => None,
                ValueType::Int => params
                    .int_range(&descriptor.name)
                    .map(|(low, high)| format!("{low}..{high}")),
                ValueType::Float => params
                    .float_range(&descriptor.name)
                    .map(|(low, high)| format!("{low}..{high}")),
                ValueType::Vec2 | ValueType::Vec3 | ValueType::Vec4 => params
                    .vector_range(&descriptor.name)
                    .map(|(low, high)| format!("{low}..{high}")),
            };
            info!(
                order = descriptor.declaration_order,
                name = %descriptor.name,
                ty = %descriptor.value_type,
                widget = %descriptor.widget,
                range = range.as_deref().unwrap_or("-"),
                "bound parameter"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_sizes() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 1920 X 1080 ").unwrap(), (1920, 1080));
    }

    #[test]
    fn rejects_malformed_sizes() {
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("wide x tall").is_err());
        assert!(parse_surface_size("0x720").is_err());
    }

    fn args_with_fps(fps: Option<f32>) -> Args {
        Args {
            shader_dir: None,
            config: None,
            fps,
            size: None,
            frames: None,
            init: false,
        }
    }

    #[test]
    fn fps_override_rejects_nonfinite_and_nonpositive_values() {
        let mut config = DeckConfig::default();
        assert!(apply_overrides(&mut config, &args_with_fps(Some(f32::INFINITY))).is_err());
        assert!(apply_overrides(&mut config, &args_with_fps(Some(f32::NAN))).is_err());
        assert!(apply_overrides(&mut config, &args_with_fps(Some(-1.0))).is_err());
        assert_eq!(config.fps, 60.0);

        assert!(apply_overrides(&mut config, &args_with_fps(Some(30.0))).is_ok());
        assert_eq!(config.fps, 30.0);
    }

    #[test]
    fn shader_dir_falls_back_to_previous_session() {
        let paths = AppPaths::from_raw(PathBuf::from("/cfg"), PathBuf::from("/data"));
        let mut config = DeckConfig::default();
        let mut state = SessionState::default();

        assert_eq!(
            resolve_shader_dir(None, &config, &state, &paths),
            PathBuf::from("/data/shaders")
        );

        state.last_shader_dir = Some("/home/me/shaders".to_string());
        assert_eq!(
            resolve_shader_dir(None, &config, &state, &paths),
            PathBuf::from("/home/me/shaders")
        );

        config.shader_dir = Some(PathBuf::from("/configured"));
        assert_eq!(
            resolve_shader_dir(None, &config, &state, &paths),
            PathBuf::from("/configured")
        );

        assert_eq!(
            resolve_shader_dir(Some(PathBuf::from("/cli")), &config, &state, &paths),
            PathBuf::from("/cli")
        );
    }

    #[test]
    fn tracked_files_cover_stages_and_common_includes() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        install_starter_pack(dir).unwrap();

        let files = tracked_files(dir, &dir.join(VERTEX_STAGE), &dir.join(FRAGMENT_STAGE));
        let ids: Vec<&str> = files.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&VERTEX_STAGE));
        assert!(ids.contains(&FRAGMENT_STAGE));
        assert!(ids.contains(&"Common/constants.glsl"));
    }

    #[test]
    fn table_panel_counts_bindings() {
        let outcome = GlslParams::parse_uniforms(&[
            "uniform float speed; //slider:0,2,1\nuniform vec4 tint; //color:1,1,1,1",
        ]);
        let mut panel = TablePanel::default();
        panel.rebuild(&outcome.params);
        assert_eq!(panel.bindings, 2);
    }
}
