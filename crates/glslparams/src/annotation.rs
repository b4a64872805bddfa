//! Grammar for the trailing annotation comment on a uniform declaration:
//! `//<kind>:<arg0>[,<arg1>[,<arg2>[,<arg3>]]]`. The kind token selects the
//! widget a parameter binds to and the arguments carry its numeric bounds
//! and defaults. Each kind has a fixed arity and a fixed set of value types
//! it may annotate; both tables live here so a typo is reported instead of
//! silently misparsed.

use std::fmt;

use thiserror::Error;

use crate::ValueType;

/// Interactive control category a parameter binds to, independent of the
/// parameter's value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Button,
    Toggle,
    Slider,
    Dialer,
    Range,
    Pad,
    /// Editable-but-unbucketed multi-lane bank; also the fallback for
    /// uniforms without a recognisable annotation.
    Composite,
    Color,
}

impl WidgetKind {
    /// Canonical annotation token for this kind.
    pub fn token(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Toggle => "toggle",
            Self::Slider => "slider",
            Self::Dialer => "dialer",
            Self::Range => "range",
            Self::Pad => "pad",
            Self::Composite => "multi",
            Self::Color => "color",
        }
    }

    /// Parses an annotation token. The legacy spellings `ui` (composite)
    /// and `xypad` (pad) are still accepted for older shader files.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "button" => Some(Self::Button),
            "toggle" => Some(Self::Toggle),
            "slider" => Some(Self::Slider),
            "dialer" => Some(Self::Dialer),
            "range" => Some(Self::Range),
            "pad" | "xypad" => Some(Self::Pad),
            "multi" | "ui" => Some(Self::Composite),
            "color" => Some(Self::Color),
            _ => None,
        }
    }

    /// Exact argument count the grammar requires for this kind.
    pub fn arity(self) -> usize {
        match self {
            Self::Button | Self::Toggle => 1,
            Self::Slider | Self::Dialer | Self::Composite | Self::Pad => 3,
            Self::Range | Self::Color => 4,
        }
    }

    /// Value types this kind may legally annotate.
    pub fn allows(self, ty: ValueType) -> bool {
        match self {
            Self::Button | Self::Toggle => matches!(ty, ValueType::Bool),
            Self::Slider | Self::Dialer => matches!(ty, ValueType::Int | ValueType::Float),
            Self::Composite => matches!(
                ty,
                ValueType::Float | ValueType::Vec2 | ValueType::Vec3 | ValueType::Vec4
            ),
            Self::Range | Self::Pad => matches!(ty, ValueType::Vec2),
            Self::Color => matches!(ty, ValueType::Vec4),
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("'{kind}' expects {expected} argument(s), found {found}")]
    Arity {
        kind: WidgetKind,
        expected: usize,
        found: usize,
    },
    #[error("invalid numeric literal '{0}'")]
    BadNumber(String),
    #[error("widget '{kind}' cannot annotate a '{ty}' uniform")]
    IncompatibleType { kind: WidgetKind, ty: ValueType },
}

/// A parsed trailing annotation.
///
/// Argument interpretation per kind:
///
/// - `button`, `toggle`: default (nonzero = on)
/// - `slider`, `dialer`, `multi`, `pad`: low, high, default
/// - `range`: low, high, default-low, default-high
/// - `color`: default r, g, b, a
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    kind: WidgetKind,
    args: Vec<f32>,
}

impl Annotation {
    /// Builds an annotation from explicit parts, enforcing arity.
    pub fn new(kind: WidgetKind, args: Vec<f32>) -> Result<Self, AnnotationError> {
        if args.len() != kind.arity() {
            return Err(AnnotationError::Arity {
                kind,
                expected: kind.arity(),
                found: args.len(),
            });
        }
        Ok(Self { kind, args })
    }

    /// Parses the text of a trailing line comment (everything after `//`).
    ///
    /// Returns `Ok(None)` when the comment is not an annotation at all: no
    /// `kind:` shape, or an unrecognised kind token. Such uniforms fall back
    /// to the composite bank. A recognised kind with malformed arguments is
    /// an error so the author sees the typo in the log.
    pub fn parse(comment: &str) -> Result<Option<Self>, AnnotationError> {
        let trimmed = comment.trim();
        let Some((token, rest)) = trimmed.split_once(':') else {
            return Ok(None);
        };
        let Some(kind) = WidgetKind::from_token(token.trim()) else {
            return Ok(None);
        };

        let mut args = Vec::with_capacity(kind.arity());
        for raw in rest.split(',') {
            let raw = raw.trim();
            let value = raw
                .parse::<f32>()
                .map_err(|_| AnnotationError::BadNumber(raw.to_string()))?;
            args.push(value);
        }
        Self::new(kind, args).map(Some)
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn args(&self) -> &[f32] {
        &self.args
    }

    /// Numeric `(low, high)` bounds, for the kinds that carry them.
    pub fn range(&self) -> Option<(f32, f32)> {
        match self.kind {
            WidgetKind::Slider
            | WidgetKind::Dialer
            | WidgetKind::Composite
            | WidgetKind::Pad
            | WidgetKind::Range => Some((self.args[0], self.args[1])),
            WidgetKind::Button | WidgetKind::Toggle | WidgetKind::Color => None,
        }
    }

    /// Default values, one per lane, splatted for single-default kinds.
    pub fn default_lanes(&self) -> [f32; 4] {
        match self.kind {
            WidgetKind::Range => [self.args[2], self.args[3], 0.0, 0.0],
            WidgetKind::Color => [self.args[0], self.args[1], self.args[2], self.args[3]],
            WidgetKind::Button | WidgetKind::Toggle => [self.args[0]; 4],
            WidgetKind::Slider | WidgetKind::Dialer | WidgetKind::Composite | WidgetKind::Pad => {
                [self.args[2]; 4]
            }
        }
    }

    /// Checks this annotation against the widget/value-type table.
    pub fn validate_for(&self, ty: ValueType) -> Result<(), AnnotationError> {
        if self.kind.allows(ty) {
            Ok(())
        } else {
            Err(AnnotationError::IncompatibleType {
                kind: self.kind,
                ty,
            })
        }
    }

    /// Renders the annotation back to its canonical comment form.
    pub fn to_comment(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("//{}:{}", self.kind.token(), args)
    }
}
