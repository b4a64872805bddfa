//! Per-frame uniform application: the ShaderToy-style built-ins plus every
//! entry of the parameter table, pushed through the [`UniformSink`] seam.

use chrono::{Datelike, Local, Timelike};
use tracing::trace;

use glslparams::{GlslParams, ParamValue};

use crate::program::UniformSink;

/// Frame-varying values pushed alongside the parameter table.
///
/// The resolution is an input rather than ambient state so callers
/// rendering off-screen at a different size get consistent built-ins.
/// Mouse positions are in window coordinates with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub resolution: [f32; 2],
    pub elapsed_seconds: f32,
    pub mouse: [f32; 2],
    pub mouse_click: [f32; 2],
    /// Year, month, day, seconds since midnight.
    pub date: [f32; 4],
}

impl FrameInputs {
    /// Captures inputs for the current wall-clock date.
    pub fn new(
        resolution: [f32; 2],
        elapsed_seconds: f32,
        mouse: [f32; 2],
        mouse_click: [f32; 2],
    ) -> Self {
        Self {
            resolution,
            elapsed_seconds,
            mouse,
            mouse_click,
            date: current_date(),
        }
    }

    /// Overrides the date components, for deterministic rendering.
    pub fn with_date(mut self, date: [f32; 4]) -> Self {
        self.date = date;
        self
    }
}

fn current_date() -> [f32; 4] {
    let now = Local::now();
    let seconds = now.num_seconds_from_midnight() as f32 + now.nanosecond() as f32 / 1e9;
    [now.year() as f32, now.month() as f32, now.day() as f32, seconds]
}

/// Pushes the frame built-ins and every parameter value into `program`.
///
/// Names missing from the program's input surface (optimised out by the
/// compiler) are skipped; rendering proceeds with whatever is active.
pub fn apply_uniforms<S: UniformSink>(program: &mut S, params: &GlslParams, frame: &FrameInputs) {
    let [width, height] = frame.resolution;
    program.set_vec3("iResolution", [width, height, 0.0]);
    program.set_float("iGlobalTime", frame.elapsed_seconds);
    // Pointer coordinates flip to the bottom-left origin convention.
    program.set_vec4(
        "iMouse",
        [
            frame.mouse[0],
            height - frame.mouse[1],
            frame.mouse_click[0],
            height - frame.mouse_click[1],
        ],
    );
    program.set_vec4("iDate", frame.date);

    for descriptor in params.descriptors() {
        let name = descriptor.name.as_str();
        let Some(value) = params.value(name) else {
            continue;
        };
        let active = match value {
            ParamValue::Bool(v) => program.set_bool(name, v),
            ParamValue::Int(v) => program.set_int(name, v),
            ParamValue::Float(v) => program.set_float(name, v),
            ParamValue::Vec2(v) => program.set_vec2(name, v),
            ParamValue::Vec3(v) => program.set_vec3(name, v),
            ParamValue::Vec4(v) => program.set_vec4(name, v),
        };
        if !active {
            trace!(uniform = name, "declared parameter not active in program");
        }
    }
}
