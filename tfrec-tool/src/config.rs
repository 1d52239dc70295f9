//! Converter configuration format.

use anyhow::{Context, Result};
use clap::ArgEnum;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Supported annotation input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ArgEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationFormat {
    CocoText,
}

/// The convert subcommand configuration. Every field is optional so that
/// command-line flags override file values one by one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub annotype: Option<AnnotationFormat>,
    pub annofile: Vec<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub label_file: Option<PathBuf>,
    pub rollover: Option<bool>,
    pub tfrecord: TfrecordConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TfrecordConfig {
    pub dir: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub ratio: Option<[f64; 3]>,
    pub name_formats: Option<[String; 3]>,
}

impl ConvertConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()))?;
        let config = json5::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_json5() {
        let config: ConvertConfig = json5::from_str(
            r#"{
                // comments are allowed
                annotype: "coco-text",
                annofile: ["anns.json"],
                rollover: true,
                tfrecord: {
                    batch_size: 100,
                    ratio: [0.8, 0.1, 0.1],
                },
            }"#,
        )
        .unwrap();

        assert_eq!(config.annotype, Some(AnnotationFormat::CocoText));
        assert_eq!(config.annofile, vec![PathBuf::from("anns.json")]);
        assert_eq!(config.rollover, Some(true));
        assert_eq!(config.tfrecord.batch_size, Some(100));
        assert_eq!(config.tfrecord.ratio, Some([0.8, 0.1, 0.1]));
        assert_eq!(config.tfrecord.dir, None);
    }
}
