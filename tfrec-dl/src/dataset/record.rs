//! In-memory annotation records.

use crate::common::*;

/// Decoded image pixels in row-major height-width-channel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    height: usize,
    width: usize,
    depth: usize,
    pixels: Vec<i64>,
}

impl ImagePayload {
    pub fn try_new(height: usize, width: usize, depth: usize, pixels: Vec<i64>) -> Result<Self> {
        ensure!(depth == 1 || depth == 3, "depth must be 1 or 3, but got {}", depth);
        ensure!(
            pixels.len() == height * width * depth,
            "pixel count {} does not match shape {}x{}x{}",
            pixels.len(),
            height,
            width,
            depth
        );
        Ok(Self {
            height,
            width,
            depth,
            pixels,
        })
    }

    /// Decode an image file into a payload. Grayscale files keep depth 1;
    /// everything else converts to RGB.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to decode image '{}'", path.display()))?;
        Ok(image.into())
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn pixels(&self) -> &[i64] {
        &self.pixels
    }

    /// Flatten to the storage representation.
    pub fn into_pixels(self) -> Vec<i64> {
        self.pixels
    }

    /// Mirror the image along the vertical axis, keeping the channel order
    /// of every pixel.
    pub fn flip_horizontal(&self) -> Self {
        let row_len = self.width * self.depth;
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for row in self.pixels.chunks(row_len) {
            for pixel in row.chunks(self.depth).rev() {
                pixels.extend_from_slice(pixel);
            }
        }
        Self {
            height: self.height,
            width: self.width,
            depth: self.depth,
            pixels,
        }
    }
}

impl From<image::DynamicImage> for ImagePayload {
    fn from(from: image::DynamicImage) -> Self {
        match from {
            image::DynamicImage::ImageLuma8(gray) => {
                let (width, height) = gray.dimensions();
                Self {
                    height: height as usize,
                    width: width as usize,
                    depth: 1,
                    pixels: gray.into_raw().into_iter().map(i64::from).collect(),
                }
            }
            image => {
                let rgb = image.to_rgb8();
                let (width, height) = rgb.dimensions();
                Self {
                    height: height as usize,
                    width: width as usize,
                    depth: 3,
                    pixels: rgb.into_raw().into_iter().map(i64::from).collect(),
                }
            }
        }
    }
}

/// One annotation field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int64(i64),
    Float32(f32),
    Str(String),
    Int64List(Vec<i64>),
    Float32List(Vec<f32>),
    StrList(Vec<String>),
    Image(ImagePayload),
}

impl From<i64> for Value {
    fn from(from: i64) -> Self {
        Self::Int64(from)
    }
}

impl From<f32> for Value {
    fn from(from: f32) -> Self {
        Self::Float32(from)
    }
}

impl From<&str> for Value {
    fn from(from: &str) -> Self {
        Self::Str(from.to_owned())
    }
}

impl From<String> for Value {
    fn from(from: String) -> Self {
        Self::Str(from)
    }
}

impl From<Vec<i64>> for Value {
    fn from(from: Vec<i64>) -> Self {
        Self::Int64List(from)
    }
}

impl From<Vec<f32>> for Value {
    fn from(from: Vec<f32>) -> Self {
        Self::Float32List(from)
    }
}

impl From<Vec<String>> for Value {
    fn from(from: Vec<String>) -> Self {
        Self::StrList(from)
    }
}

impl From<ImagePayload> for Value {
    fn from(from: ImagePayload) -> Self {
        Self::Image(from)
    }
}

/// Per-image annotation fields keyed by schema name. Field names are only
/// validated against the schema when the record is serialized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationRecord {
    fields: IndexMap<String, Value>,
}

impl AnnotationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn as_int64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Int64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_float32_list(&self, name: &str) -> Option<&[f32]> {
        match self.get(name)? {
            Value::Float32List(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str_list(&self, name: &str) -> Option<&[String]> {
        match self.get(name)? {
            Value::StrList(value) => Some(value),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        match self.get("image")? {
            Value::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Left-right mirror of the whole annotation: the image payload, the box
    /// x coordinates and all text fields flip together.
    ///
    /// The mirror width comes from the explicit `image/width` field when
    /// present, else from the image payload. With neither, box coordinates
    /// are left untouched.
    pub fn rollover(mut self) -> Self {
        let mut image_width = None;

        if let Some(Value::Image(image)) = self.fields.get("image") {
            let flipped = image.flip_horizontal();
            image_width = Some(flipped.width() as i64);
            self.fields.insert("image".to_owned(), flipped.into());
        }
        if let Some(Value::Int64(width)) = self.fields.get("image/width") {
            image_width = Some(*width);
        }

        if let Some(Value::Str(text)) = self.fields.get("image/text") {
            let reversed: String = text.chars().rev().collect();
            self.fields.insert("image/text".to_owned(), reversed.into());
        }
        if let Some(Value::Int64List(labels)) = self.fields.get("image/text/label") {
            let reversed: Vec<i64> = labels.iter().rev().copied().collect();
            self.fields
                .insert("image/text/label".to_owned(), reversed.into());
        }

        if let Some(width) = image_width {
            let lists = match (
                self.fields.get("image/object/bbox/xmin"),
                self.fields.get("image/object/bbox/xmax"),
            ) {
                (Some(Value::Float32List(xmin)), Some(Value::Float32List(xmax))) => {
                    Some((xmin.clone(), xmax.clone()))
                }
                _ => None,
            };

            if let Some((mut xmin, mut xmax)) = lists {
                let width = width as f32;
                // paired by position up to the shorter list
                let length = xmin.len().min(xmax.len());
                for index in 0..length {
                    let flipped = (width - xmax[index] - 1.0, width - xmin[index] - 1.0);
                    xmin[index] = flipped.0;
                    xmax[index] = flipped.1;
                }
                self.fields
                    .insert("image/object/bbox/xmin".to_owned(), xmin.into());
                self.fields
                    .insert("image/object/bbox/xmax".to_owned(), xmax.into());
            }
        }

        if let Some(Value::StrList(texts)) = self.fields.get("image/object/text") {
            let reversed: Vec<String> = texts
                .iter()
                .map(|text| text.chars().rev().collect())
                .collect();
            self.fields
                .insert("image/object/text".to_owned(), reversed.into());
        }

        self
    }
}

impl IntoIterator for AnnotationRecord {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, Value)> for AnnotationRecord {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn checkerboard() -> ImagePayload {
        // 2x3 grayscale image
        ImagePayload::try_new(2, 3, 1, vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn payload_shape_is_validated() {
        assert!(ImagePayload::try_new(2, 3, 1, vec![0; 6]).is_ok());
        assert!(ImagePayload::try_new(2, 3, 1, vec![0; 5]).is_err());
        assert!(ImagePayload::try_new(2, 3, 2, vec![0; 12]).is_err());
    }

    #[test]
    fn flip_horizontal_reverses_rows() {
        let flipped = checkerboard().flip_horizontal();
        assert_eq!(flipped.pixels(), &[3, 2, 1, 6, 5, 4]);

        // rgb pixels keep their channel order
        let rgb = ImagePayload::try_new(1, 2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(rgb.flip_horizontal().pixels(), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn double_flip_is_identity() {
        let image = checkerboard();
        assert_eq!(image.flip_horizontal().flip_horizontal(), image);
    }

    #[test]
    fn rollover_flips_boxes_against_declared_width() {
        let mut record = AnnotationRecord::new();
        record.insert("image/width", 20i64);
        record.insert("image/object/bbox/xmin", vec![0.0f32, 12.0]);
        record.insert("image/object/bbox/xmax", vec![10.0f32, 20.0]);

        let flipped = record.rollover();
        let xmin = flipped.as_float32_list("image/object/bbox/xmin").unwrap();
        let xmax = flipped.as_float32_list("image/object/bbox/xmax").unwrap();
        assert_abs_diff_eq!(xmin[0], 9.0);
        assert_abs_diff_eq!(xmax[0], 19.0);
        assert_abs_diff_eq!(xmin[1], -1.0);
        assert_abs_diff_eq!(xmax[1], 7.0);
    }

    #[test]
    fn rollover_reverses_text() {
        let mut record = AnnotationRecord::new();
        record.insert("image/text", "abc def");
        record.insert("image/text/label", vec![1i64, 2, 3]);
        record.insert(
            "image/object/text",
            vec!["first".to_owned(), "second".to_owned()],
        );

        let flipped = record.rollover();
        assert_eq!(flipped.as_str("image/text"), Some("fed cba"));
        assert_eq!(
            flipped.get("image/text/label"),
            Some(&Value::Int64List(vec![3, 2, 1]))
        );
        // per-string reversal, list order kept
        assert_eq!(
            flipped.as_str_list("image/object/text"),
            Some(&["tsrif".to_owned(), "dnoces".to_owned()][..])
        );
    }

    #[test]
    fn double_rollover_is_identity() {
        let mut record = AnnotationRecord::new();
        record.insert("image/width", 32i64);
        record.insert("image/text", "hello");
        record.insert("image/object/bbox/xmin", vec![2.0f32, 8.0]);
        record.insert("image/object/bbox/xmax", vec![6.0f32, 30.0]);
        record.insert("image/object/text", vec!["ab".to_owned(), "cd".to_owned()]);
        record.insert(
            "image",
            ImagePayload::try_new(1, 32, 1, (0..32).collect()).unwrap(),
        );

        let round_trip = record.clone().rollover().rollover();
        assert_eq!(round_trip, record);
    }

    #[test]
    fn rollover_without_width_keeps_boxes() {
        let mut record = AnnotationRecord::new();
        record.insert("image/object/bbox/xmin", vec![1.0f32]);
        record.insert("image/object/bbox/xmax", vec![2.0f32]);
        record.insert("image/text", "ab");

        let flipped = record.rollover();
        assert_eq!(
            flipped.as_float32_list("image/object/bbox/xmin"),
            Some(&[1.0f32][..])
        );
        assert_eq!(flipped.as_str("image/text"), Some("ba"));
    }

    #[test]
    fn rollover_pairs_up_to_shorter_list() {
        let mut record = AnnotationRecord::new();
        record.insert("image/width", 10i64);
        record.insert("image/object/bbox/xmin", vec![0.0f32, 5.0]);
        record.insert("image/object/bbox/xmax", vec![4.0f32]);

        let flipped = record.rollover();
        let xmin = flipped.as_float32_list("image/object/bbox/xmin").unwrap();
        assert_abs_diff_eq!(xmin[0], 5.0);
        // the unpaired tail is untouched
        assert_abs_diff_eq!(xmin[1], 5.0);
    }
}
