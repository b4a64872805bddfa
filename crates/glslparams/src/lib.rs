mod annotation;
mod params;
mod preprocess;

pub use annotation::{Annotation, AnnotationError, WidgetKind};
pub use params::{GlslParams, ParamDescriptor, ParamValue, ParseIssue, ParseOutcome};
pub use preprocess::{PreprocessError, Preprocessor};

use std::fmt;

/// Value categories a tunable uniform may take.
///
/// Every declared uniform maps to exactly one of these; GLSL types outside
/// this set (samplers, matrices, arrays) are reported and skipped during
/// the scan rather than aborting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl ValueType {
    /// Maps a GLSL type token to a supported value type.
    pub fn from_glsl(token: &str) -> Option<Self> {
        match token {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "vec2" => Some(Self::Vec2),
            "vec3" => Some(Self::Vec3),
            "vec4" => Some(Self::Vec4),
            _ => None,
        }
    }

    /// The GLSL spelling of this type.
    pub fn glsl_token(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
        }
    }

    /// Number of scalar lanes carried by a value of this type.
    pub fn lanes(self) -> usize {
        match self {
            Self::Bool | Self::Int | Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_glsl_types() {
        assert_eq!(ValueType::from_glsl("float"), Some(ValueType::Float));
        assert_eq!(ValueType::from_glsl("vec3"), Some(ValueType::Vec3));
        assert_eq!(ValueType::from_glsl("bool"), Some(ValueType::Bool));
    }

    #[test]
    fn rejects_unsupported_glsl_types() {
        assert_eq!(ValueType::from_glsl("sampler2D"), None);
        assert_eq!(ValueType::from_glsl("mat4"), None);
    }

    #[test]
    fn lane_counts_match_glsl() {
        assert_eq!(ValueType::Float.lanes(), 1);
        assert_eq!(ValueType::Vec2.lanes(), 2);
        assert_eq!(ValueType::Vec4.lanes(), 4);
    }
}
