//! COCO-Text annotation loading.

use crate::common::*;
use crate::dataset::{AnnotationRecord, ImagePayload};
use super::LabelMap;

/// The COCO-Text annotation JSON.
///
/// `imgs` and `anns` are keyed by the stringified image and annotation ids.
#[derive(Debug, Clone, Deserialize)]
pub struct CocoTextDataset {
    pub imgs: HashMap<String, ImageEntry>,
    pub anns: HashMap<String, AnnotationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageEntry {
    pub id: i64,
    pub file_name: String,
    pub width: i64,
    pub height: i64,
}

/// One annotated text instance.
///
/// `language` is one of "english", "not english" and "na"; `legibility` is
/// "legible" or "illegible"; `class` is one of "machine printed",
/// "handwritten" and "others". `utf8_string` is missing on illegible
/// instances.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationEntry {
    pub id: i64,
    pub image_id: i64,
    pub bbox: [f32; 4],
    pub area: f32,
    pub class: String,
    pub language: String,
    pub legibility: String,
    #[serde(default)]
    pub utf8_string: Option<String>,
}

impl CocoTextDataset {
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path).with_context(|| {
            format!("failed to open annotation file '{}'", path.display())
        })?);
        let dataset = serde_json::from_reader(reader).with_context(|| {
            format!("failed to parse annotation file '{}'", path.display())
        })?;
        Ok(dataset)
    }

    /// One annotation record per annotated image, ordered by image id.
    ///
    /// Degenerate annotation boxes are silently skipped. With an image
    /// directory, the decoded pixels are attached to the record; a file
    /// that cannot be decoded logs a warning and the payload is omitted.
    /// Class names resolve to labels through `labels`, extending it on
    /// unseen names.
    pub fn records<'a>(
        &'a self,
        image_dir: Option<&'a Path>,
        labels: &'a mut LabelMap,
    ) -> impl Iterator<Item = Result<AnnotationRecord>> + 'a {
        let mut groups: Vec<(i64, Vec<&AnnotationEntry>)> = self
            .anns
            .values()
            .map(|ann| (ann.image_id, ann))
            .into_group_map()
            .into_iter()
            .collect();
        groups.sort_by_key(|(image_id, _)| *image_id);

        groups.into_iter().map(move |(image_id, mut anns)| -> Result<AnnotationRecord> {
            let entry = self.imgs.get(&image_id.to_string()).ok_or_else(|| {
                format_err!("annotation refers to unknown image id {}", image_id)
            })?;
            anns.sort_by_key(|ann| ann.id);

            let mut xmin = vec![];
            let mut ymin = vec![];
            let mut xmax = vec![];
            let mut ymax = vec![];
            let mut class_text = vec![];
            let mut class_label = vec![];
            let mut area = vec![];
            let mut difficulty = vec![];
            let mut language = vec![];
            let mut text = vec![];

            for ann in anns {
                let [x, y, w, h] = ann.bbox;
                if w <= 0.0 || h <= 0.0 {
                    continue;
                }
                xmin.push(x);
                ymin.push(y);
                xmax.push(x + w);
                ymax.push(y + h);
                class_text.push(ann.class.clone());
                class_label.push(labels.get_or_insert(&ann.class));
                area.push(ann.area);
                difficulty.push((ann.legibility == "illegible") as i64);
                language.push(ann.language.clone());
                text.push(ann.utf8_string.clone().unwrap_or_default());
            }

            let mut record = AnnotationRecord::new();
            if let Some(dir) = image_dir {
                let path = dir.join(&entry.file_name);
                match ImagePayload::open(&path) {
                    Ok(image) => record.insert("image", image),
                    Err(err) => warn!("unable to load image '{}': {}", path.display(), err),
                }
            }
            record.insert("image/filename", entry.file_name.clone());
            record.insert("image/height", entry.height);
            record.insert("image/width", entry.width);
            record.insert("image/object/bbox/xmin", xmin);
            record.insert("image/object/bbox/ymin", ymin);
            record.insert("image/object/bbox/xmax", xmax);
            record.insert("image/object/bbox/ymax", ymax);
            record.insert("image/object/class/text", class_text);
            record.insert("image/object/class/label", class_label);
            record.insert("image/object/area", area);
            record.insert("image/object/difficulty", difficulty);
            record.insert("image/object/language", language);
            record.insert("image/object/text", text);
            Ok(record)
        })
    }
}
