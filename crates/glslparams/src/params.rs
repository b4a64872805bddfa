//! Scans preprocessed shader stage sources for annotated uniform
//! declarations and owns the typed value/range stores the rest of the
//! pipeline reads. A name lives in exactly one value store, one range store
//! (numeric types only) and one slot of the ordered descriptor table; the
//! union of names across stores is exactly the set of uniforms seen in the
//! most recent successful scan.
//!
//! Types:
//!
//! - `ParamDescriptor` carries name, value type, widget kind, and the
//!   presentation-only declaration order.
//! - `GlslParams` owns the stores and the carry-forward merge applied on
//!   hot reload.
//! - `ParseIssue` classifies per-parameter problems that are recovered
//!   locally; a single typo never blocks the rest of the scan.
//!
//! Functions:
//!
//! - `GlslParams::parse_uniforms` runs the line scan over one or more stage
//!   sources in the order they are passed.
//! - `GlslParams::adopt_values` copies values forward from a previous table
//!   for names that survived a reload.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::annotation::{Annotation, AnnotationError, WidgetKind};
use crate::ValueType;

/// Range assigned to uniforms that arrive without a usable annotation.
const DEFAULT_RANGE: (f32, f32) = (0.0, 1.0);

/// Built-ins driven per frame by the applier; never user tunables.
const RESERVED_UNIFORMS: [&str; 4] = ["iResolution", "iGlobalTime", "iMouse", "iDate"];

/// Descriptor for one tunable uniform.
///
/// `declaration_order` is assigned strictly increasing in source-appearance
/// order across all scanned stages and is the only sort key used for
/// presentation; it says nothing about memory layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub value_type: ValueType,
    pub widget: WidgetKind,
    pub declaration_order: usize,
}

impl ParamDescriptor {
    /// Per-lane labels for multi-component widgets (`name-X`, `name-Y`, ...),
    /// matching what the parameter panel renders for composite banks.
    pub fn lane_labels(&self) -> Vec<String> {
        const SUFFIXES: [&str; 4] = ["X", "Y", "Z", "W"];
        let lanes = self.value_type.lanes();
        if lanes <= 1 {
            vec![self.name.clone()]
        } else {
            (0..lanes)
                .map(|lane| format!("{}-{}", self.name, SUFFIXES[lane]))
                .collect()
        }
    }
}

/// A parameter value tagged with its type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl ParamValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Vec2(_) => ValueType::Vec2,
            Self::Vec3(_) => ValueType::Vec3,
            Self::Vec4(_) => ValueType::Vec4,
        }
    }
}

/// Per-parameter problems recovered during a scan.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseIssue {
    #[error("uniform '{name}' has unsupported type '{glsl_type}' (line {line})")]
    UnsupportedUniformType {
        name: String,
        glsl_type: String,
        line: usize,
    },
    #[error("uniform declaration '{decl}' has an unsupported declarator (line {line})")]
    UnsupportedDeclarator { decl: String, line: usize },
    #[error("uniform '{name}' has a malformed annotation (line {line}): {source}")]
    MalformedAnnotation {
        name: String,
        line: usize,
        #[source]
        source: AnnotationError,
    },
}

/// Result of scanning one or more preprocessed stage sources.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub params: GlslParams,
    pub issues: Vec<ParseIssue>,
}

impl ParseOutcome {
    pub fn log_warnings(&self) {
        for issue in &self.issues {
            warn!(%issue, "uniform scan issue");
        }
    }
}

/// Ordered parameter table plus one value store per type and one range
/// store per numeric type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlslParams {
    order: Vec<ParamDescriptor>,
    bools: HashMap<String, bool>,
    ints: HashMap<String, i32>,
    floats: HashMap<String, f32>,
    vec2s: HashMap<String, [f32; 2]>,
    vec3s: HashMap<String, [f32; 3]>,
    vec4s: HashMap<String, [f32; 4]>,
    int_ranges: HashMap<String, (i32, i32)>,
    float_ranges: HashMap<String, (f32, f32)>,
    vec2_ranges: HashMap<String, (f32, f32)>,
    vec3_ranges: HashMap<String, (f32, f32)>,
    vec4_ranges: HashMap<String, (f32, f32)>,
}

impl GlslParams {
    /// Scans stage sources in the order given and builds the parameter
    /// table. The first encounter of a name wins; later re-declarations
    /// (e.g. the same uniform in both stages) are ignored.
    pub fn parse_uniforms(sources: &[&str]) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        for source in sources {
            for (index, line) in source.lines().enumerate() {
                let line_no = index + 1;
                let Some(decl) = UniformDecl::scan(line) else {
                    continue;
                };
                outcome.register(decl, line_no);
            }
        }
        outcome
    }

    /// Copies values forward from a previous table for every name present
    /// in both tables with the same value type. Ranges and defaults always
    /// come from the newer parse, so widening a slider's bounds never
    /// resets a value the user already tuned.
    pub fn adopt_values(&mut self, previous: &GlslParams) {
        for descriptor in &self.order {
            let name = descriptor.name.as_str();
            match descriptor.value_type {
                ValueType::Bool => {
                    if let Some(value) = previous.bools.get(name) {
                        self.bools.insert(name.to_string(), *value);
                    }
                }
                ValueType::Int => {
                    if let Some(value) = previous.ints.get(name) {
                        self.ints.insert(name.to_string(), *value);
                    }
                }
                ValueType::Float => {
                    if let Some(value) = previous.floats.get(name) {
                        self.floats.insert(name.to_string(), *value);
                    }
                }
                ValueType::Vec2 => {
                    if let Some(value) = previous.vec2s.get(name) {
                        self.vec2s.insert(name.to_string(), *value);
                    }
                }
                ValueType::Vec3 => {
                    if let Some(value) = previous.vec3s.get(name) {
                        self.vec3s.insert(name.to_string(), *value);
                    }
                }
                ValueType::Vec4 => {
                    if let Some(value) = previous.vec4s.get(name) {
                        self.vec4s.insert(name.to_string(), *value);
                    }
                }
            }
        }
    }

    /// Descriptors in presentation order; index equals `declaration_order`.
    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.order
    }

    pub fn descriptor(&self, name: &str) -> Option<&ParamDescriptor> {
        self.order.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptor(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current value of a parameter, if declared.
    pub fn value(&self, name: &str) -> Option<ParamValue> {
        let descriptor = self.descriptor(name)?;
        match descriptor.value_type {
            ValueType::Bool => self.bools.get(name).map(|v| ParamValue::Bool(*v)),
            ValueType::Int => self.ints.get(name).map(|v| ParamValue::Int(*v)),
            ValueType::Float => self.floats.get(name).map(|v| ParamValue::Float(*v)),
            ValueType::Vec2 => self.vec2s.get(name).map(|v| ParamValue::Vec2(*v)),
            ValueType::Vec3 => self.vec3s.get(name).map(|v| ParamValue::Vec3(*v)),
            ValueType::Vec4 => self.vec4s.get(name).map(|v| ParamValue::Vec4(*v)),
        }
    }

    /// Writes a parameter value, typically from a UI binding. Returns false
    /// when the name is unknown or the value type does not match the
    /// declaration.
    pub fn set_value(&mut self, name: &str, value: ParamValue) -> bool {
        let Some(descriptor) = self.descriptor(name) else {
            return false;
        };
        if descriptor.value_type != value.value_type() {
            return false;
        }
        match value {
            ParamValue::Bool(v) => self.bools.insert(name.to_string(), v).is_some(),
            ParamValue::Int(v) => self.ints.insert(name.to_string(), v).is_some(),
            ParamValue::Float(v) => self.floats.insert(name.to_string(), v).is_some(),
            ParamValue::Vec2(v) => self.vec2s.insert(name.to_string(), v).is_some(),
            ParamValue::Vec3(v) => self.vec3s.insert(name.to_string(), v).is_some(),
            ParamValue::Vec4(v) => self.vec4s.insert(name.to_string(), v).is_some(),
        }
    }

    pub fn bools(&self) -> &HashMap<String, bool> {
        &self.bools
    }

    pub fn ints(&self) -> &HashMap<String, i32> {
        &self.ints
    }

    pub fn floats(&self) -> &HashMap<String, f32> {
        &self.floats
    }

    pub fn vec2s(&self) -> &HashMap<String, [f32; 2]> {
        &self.vec2s
    }

    pub fn vec3s(&self) -> &HashMap<String, [f32; 3]> {
        &self.vec3s
    }

    pub fn vec4s(&self) -> &HashMap<String, [f32; 4]> {
        &self.vec4s
    }

    pub fn int_range(&self, name: &str) -> Option<(i32, i32)> {
        self.int_ranges.get(name).copied()
    }

    pub fn float_range(&self, name: &str) -> Option<(f32, f32)> {
        self.float_ranges.get(name).copied()
    }

    /// Shared `(low, high)` pair for vector parameters; composite and pad
    /// widgets apply it to every lane.
    pub fn vector_range(&self, name: &str) -> Option<(f32, f32)> {
        self.vec2_ranges
            .get(name)
            .or_else(|| self.vec3_ranges.get(name))
            .or_else(|| self.vec4_ranges.get(name))
            .copied()
    }

    fn insert(&mut self, name: &str, ty: ValueType, annotation: Option<&Annotation>) {
        let widget = annotation
            .map(Annotation::kind)
            .unwrap_or(WidgetKind::Composite);
        let range = match annotation {
            Some(ann) => ann.range(),
            // Unannotated uniforms still get editable bounds.
            None => Some(DEFAULT_RANGE),
        };
        let lanes = annotation.map(Annotation::default_lanes).unwrap_or([0.0; 4]);

        match ty {
            ValueType::Bool => {
                self.bools.insert(name.to_string(), lanes[0] != 0.0);
            }
            ValueType::Int => {
                self.ints.insert(name.to_string(), lanes[0] as i32);
                let (low, high) = range.unwrap_or(DEFAULT_RANGE);
                self.int_ranges
                    .insert(name.to_string(), (low as i32, high as i32));
            }
            ValueType::Float => {
                self.floats.insert(name.to_string(), lanes[0]);
                self.float_ranges
                    .insert(name.to_string(), range.unwrap_or(DEFAULT_RANGE));
            }
            ValueType::Vec2 => {
                self.vec2s.insert(name.to_string(), [lanes[0], lanes[1]]);
                self.vec2_ranges
                    .insert(name.to_string(), range.unwrap_or(DEFAULT_RANGE));
            }
            ValueType::Vec3 => {
                self.vec3s
                    .insert(name.to_string(), [lanes[0], lanes[1], lanes[2]]);
                self.vec3_ranges
                    .insert(name.to_string(), range.unwrap_or(DEFAULT_RANGE));
            }
            ValueType::Vec4 => {
                self.vec4s.insert(name.to_string(), lanes);
                // Colors are picked, not ranged; everything else keeps bounds.
                if widget != WidgetKind::Color {
                    self.vec4_ranges
                        .insert(name.to_string(), range.unwrap_or(DEFAULT_RANGE));
                }
            }
        }

        let declaration_order = self.order.len();
        self.order.push(ParamDescriptor {
            name: name.to_string(),
            value_type: ty,
            widget,
            declaration_order,
        });
    }
}

impl ParseOutcome {
    fn register(&mut self, decl: UniformDecl<'_>, line: usize) {
        if self.params.contains(decl.name) || RESERVED_UNIFORMS.contains(&decl.name) {
            return;
        }
        // Arrays and other non-plain declarators; the type itself may be
        // fine, so name the whole declaration instead.
        if !is_identifier(decl.name) {
            self.issues.push(ParseIssue::UnsupportedDeclarator {
                decl: format!("{} {}", decl.glsl_type, decl.name),
                line,
            });
            return;
        }
        let Some(ty) = ValueType::from_glsl(decl.glsl_type) else {
            self.issues.push(ParseIssue::UnsupportedUniformType {
                name: decl.name.to_string(),
                glsl_type: decl.glsl_type.to_string(),
                line,
            });
            return;
        };

        let annotation = match decl.comment.map(Annotation::parse) {
            None => None,
            Some(Ok(None)) => None,
            Some(Ok(Some(annotation))) => match annotation.validate_for(ty) {
                Ok(()) => Some(annotation),
                Err(err) => {
                    self.issues.push(ParseIssue::MalformedAnnotation {
                        name: decl.name.to_string(),
                        line,
                        source: err,
                    });
                    None
                }
            },
            Some(Err(err)) => {
                self.issues.push(ParseIssue::MalformedAnnotation {
                    name: decl.name.to_string(),
                    line,
                    source: err,
                });
                None
            }
        };

        self.params.insert(decl.name, ty, annotation.as_ref());
    }
}

struct UniformDecl<'a> {
    glsl_type: &'a str,
    name: &'a str,
    comment: Option<&'a str>,
}

impl<'a> UniformDecl<'a> {
    /// Recognises `uniform <type> <name>;` with an optional trailing line
    /// comment. Anything else on the line is left alone.
    fn scan(line: &'a str) -> Option<Self> {
        let trimmed = line.trim_start();
        let rest = trimmed.strip_prefix("uniform")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim_start();
        let type_end = rest.find(char::is_whitespace)?;
        let glsl_type = &rest[..type_end];
        let rest = rest[type_end..].trim_start();
        let semi = rest.find(';')?;
        let name = rest[..semi].trim();
        if name.is_empty() {
            return None;
        }
        let tail = &rest[semi + 1..];
        let comment = tail.find("//").map(|at| &tail[at + 2..]);
        Some(Self {
            glsl_type,
            name,
            comment,
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
