use std::path::PathBuf;

use clap::Parser;

/// Watch a shader directory and hot-reload it as you edit.
#[derive(Debug, Parser)]
#[command(name = "shaderdeck", version, about)]
pub struct Args {
    /// Shader directory holding shader.vert, shader.frag, and a Common/
    /// folder for shared includes. Defaults to the configured or
    /// per-user shader directory.
    #[arg(value_name = "DIR")]
    pub shader_dir: Option<PathBuf>,

    /// Alternate configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the configured target frame rate.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Override the render resolution, e.g. 1280x720.
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Exit after this many frames instead of running until interrupted.
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<u64>,

    /// Write the starter shader pack into the shader directory and exit.
    /// Existing files are never overwritten.
    #[arg(long)]
    pub init: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
