//! Conversion between annotation records and TFRecord examples.

use crate::common::*;
use super::*;

/// Serialize an annotation record into a TFRecord example.
///
/// When an image payload is present, the `image/height`, `image/width` and
/// `image/depth` fields are populated from its shape unless already set, and
/// the payload is flattened to a one-dimensional int64 list for storage.
///
/// A field name missing from the schema, or a value contradicting its
/// declared type and shape, is a fatal error and no partial output is
/// produced.
pub fn to_example(record: AnnotationRecord) -> Result<Example> {
    let mut fields: IndexMap<String, Value> = record.into_iter().collect();

    let image = match fields.shift_remove("image") {
        Some(Value::Image(image)) => Some(image),
        Some(value) => {
            fields.insert("image".to_owned(), value);
            None
        }
        None => None,
    };
    if let Some(image) = image {
        let extents = [
            ("image/height", image.height() as i64),
            ("image/width", image.width() as i64),
            ("image/depth", image.depth() as i64),
        ];
        for (name, extent) in extents {
            if !fields.contains_key(name) {
                fields.insert(name.to_owned(), extent.into());
            }
        }
        fields.insert("image".to_owned(), Value::Int64List(image.into_pixels()));
    }

    let feature: HashMap<String, Feature> = fields
        .into_iter()
        .map(|(name, value)| -> Result<_> {
            let spec = field_spec(&name)?;
            let feature = to_feature(&name, spec, value)?;
            Ok((name, feature))
        })
        .try_collect()?;

    Ok(Example {
        features: Some(Features { feature }),
    })
}

fn to_feature(name: &str, spec: FieldSpec, value: Value) -> Result<Feature> {
    use FieldShape as S;
    use FieldType as T;

    let kind = match (spec.ty, spec.shape, value) {
        (T::Int64, S::Scalar, Value::Int64(value)) => Kind::Int64List(Int64List { value: vec![value] }),
        (T::Float32, S::Scalar, Value::Float32(value)) => {
            Kind::FloatList(FloatList { value: vec![value] })
        }
        (T::Str, S::Scalar, Value::Str(value)) => Kind::BytesList(BytesList {
            value: vec![value.into_bytes()],
        }),
        (T::Int64, S::Variable | S::Fixed(_), Value::Int64List(value)) => {
            Kind::Int64List(Int64List { value })
        }
        (T::Float32, S::Variable | S::Fixed(_), Value::Float32List(value)) => {
            Kind::FloatList(FloatList { value })
        }
        (T::Str, S::Variable | S::Fixed(_), Value::StrList(value)) => Kind::BytesList(BytesList {
            value: value.into_iter().map(String::into_bytes).collect(),
        }),
        (_, _, value) => bail!(
            "value of feature '{}' does not match its declared type and shape: {:?}",
            name,
            value
        ),
    };

    Ok(Feature { kind: Some(kind) })
}

/// Reconstruct an annotation record from a TFRecord example.
///
/// Every schema field is parsed with its declared type. Variable-length
/// fields densify to concrete sequences and absent fields densify to the
/// type-appropriate default. When a non-empty image list is present, the
/// height/width/depth fields must be positive and consistent with its
/// length, and the flat list is reshaped into an image payload.
pub fn from_example(example: Example) -> Result<AnnotationRecord> {
    let mut feature = example
        .features
        .map(|features| features.feature)
        .unwrap_or_default();

    let mut record = AnnotationRecord::new();
    for (&name, &spec) in SCHEMA.iter() {
        let kind = feature.remove(name).and_then(|feature| feature.kind);
        record.insert(name, parse_feature(name, spec, kind)?);
    }

    if let Some(Value::Int64List(pixels)) = record.remove("image") {
        if pixels.is_empty() {
            record.insert("image", Value::Int64List(pixels));
        } else {
            let height = record.as_int64("image/height").unwrap_or(0);
            let width = record.as_int64("image/width").unwrap_or(0);
            let depth = record.as_int64("image/depth").unwrap_or(0);
            ensure!(
                height > 0 && width > 0 && depth > 0,
                "the image feature requires positive image/height, image/width and image/depth, \
                 but got {}x{}x{}",
                height,
                width,
                depth
            );
            ensure!(
                height * width * depth == pixels.len() as i64,
                "image shape {}x{}x{} does not match the {} stored pixel values",
                height,
                width,
                depth,
                pixels.len()
            );
            let image = ImagePayload::try_new(height as usize, width as usize, depth as usize, pixels)?;
            record.insert("image", image);
        }
    }

    Ok(record)
}

fn parse_feature(name: &str, spec: FieldSpec, kind: Option<Kind>) -> Result<Value> {
    match spec.ty {
        FieldType::Int64 => {
            let values = match kind {
                Some(Kind::Int64List(list)) => list.value,
                None => vec![],
                Some(_) => bail!("feature '{}' must hold int64 values", name),
            };
            shaped(name, spec.shape, values, 0, Value::Int64, Value::Int64List)
        }
        FieldType::Float32 => {
            let values = match kind {
                Some(Kind::FloatList(list)) => list.value,
                None => vec![],
                Some(_) => bail!("feature '{}' must hold float values", name),
            };
            shaped(name, spec.shape, values, 0.0, Value::Float32, Value::Float32List)
        }
        FieldType::Str => {
            let values: Vec<String> = match kind {
                Some(Kind::BytesList(list)) => list
                    .value
                    .into_iter()
                    .map(|bytes| {
                        String::from_utf8(bytes)
                            .map_err(|_| format_err!("feature '{}' is not valid UTF-8", name))
                    })
                    .try_collect()?,
                None => vec![],
                Some(_) => bail!("feature '{}' must hold byte strings", name),
            };
            shaped(name, spec.shape, values, String::new(), Value::Str, Value::StrList)
        }
    }
}

fn shaped<T>(
    name: &str,
    shape: FieldShape,
    mut values: Vec<T>,
    default: T,
    scalar: impl FnOnce(T) -> Value,
    list: impl FnOnce(Vec<T>) -> Value,
) -> Result<Value> {
    match shape {
        FieldShape::Scalar => {
            ensure!(
                values.len() <= 1,
                "feature '{}' must hold at most one value, but got {}",
                name,
                values.len()
            );
            Ok(scalar(values.pop().unwrap_or(default)))
        }
        FieldShape::Variable => Ok(list(values)),
        FieldShape::Fixed(dims) => {
            let expected: usize = dims.iter().product();
            ensure!(
                values.len() == expected,
                "feature '{}' must hold {} values, but got {}",
                name,
                expected,
                values.len()
            );
            Ok(list(values))
        }
    }
}
