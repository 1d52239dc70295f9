//! The annotation field table.

use crate::common::*;

/// Scalar type of an annotation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int64,
    Float32,
    Str,
}

/// Declared shape of an annotation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    /// Sequence whose length may differ per record.
    Variable,
    /// Single value.
    Scalar,
    /// Sequence with a fixed number of elements.
    Fixed(&'static [usize]),
}

impl FieldShape {
    pub fn is_list(&self) -> bool {
        !matches!(self, Self::Scalar)
    }

    /// Required element count of a fixed-shape field.
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            Self::Fixed(dims) => Some(dims.iter().product()),
            Self::Variable | Self::Scalar => None,
        }
    }
}

/// Type and shape of one annotation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    pub ty: FieldType,
    pub shape: FieldShape,
}

const fn spec(ty: FieldType, shape: FieldShape) -> FieldSpec {
    FieldSpec { ty, shape }
}

const FIELDS: &[(&str, FieldSpec)] = {
    use FieldShape::{Scalar, Variable};
    use FieldType::{Float32, Int64, Str};

    &[
        ("image", spec(Int64, Variable)),
        ("image/height", spec(Int64, Scalar)),
        ("image/width", spec(Int64, Scalar)),
        ("image/depth", spec(Int64, Scalar)),
        ("image/text", spec(Str, Scalar)),
        ("image/text/label", spec(Int64, Variable)),
        ("image/text/length", spec(Int64, Scalar)),
        ("image/filename", spec(Str, Scalar)),
        ("image/class/text", spec(Str, Scalar)),
        ("image/class/label", spec(Int64, Scalar)),
        ("image/object/bbox/xmin", spec(Float32, Variable)),
        ("image/object/bbox/ymin", spec(Float32, Variable)),
        ("image/object/bbox/xmax", spec(Float32, Variable)),
        ("image/object/bbox/ymax", spec(Float32, Variable)),
        ("image/object/class/text", spec(Str, Variable)),
        ("image/object/class/label", spec(Int64, Variable)),
        ("image/object/area", spec(Float32, Variable)),
        ("image/object/language", spec(Str, Variable)),
        ("image/object/text", spec(Str, Variable)),
        ("image/object/difficulty", spec(Int64, Variable)),
    ]
};

/// Field table shared by the writer and reader paths. Built once, read-only
/// afterwards.
pub static SCHEMA: Lazy<IndexMap<&'static str, FieldSpec>> =
    Lazy::new(|| FIELDS.iter().copied().collect());

/// Look up a field by name. Unknown names are a schema mismatch and a hard
/// error.
pub fn field_spec(name: &str) -> Result<FieldSpec> {
    SCHEMA
        .get(name)
        .copied()
        .ok_or_else(|| format_err!("unexpected feature name '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_resolves() {
        for &(name, spec) in FIELDS {
            assert_eq!(field_spec(name).unwrap(), spec);
        }
        assert_eq!(SCHEMA.len(), FIELDS.len());
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = field_spec("image/object/unknown").unwrap_err();
        assert!(err.to_string().contains("image/object/unknown"));
    }

    #[test]
    fn shape_helpers() {
        assert!(FieldShape::Variable.is_list());
        assert!(!FieldShape::Scalar.is_list());
        assert_eq!(FieldShape::Fixed(&[2, 3]).fixed_len(), Some(6));
        assert_eq!(FieldShape::Variable.fixed_len(), None);
    }
}
