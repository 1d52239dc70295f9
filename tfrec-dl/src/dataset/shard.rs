//! Sharded TFRecord dataset files.

use crate::common::*;
use super::*;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_RATIO: [f64; 3] = [0.99, 0.01, 0.0];

pub fn default_name_formats() -> [String; 3] {
    [
        "{index}-trainset.tfrecord".to_owned(),
        "{index}-testset.tfrecord".to_owned(),
        "{index}-validationset.tfrecord".to_owned(),
    ]
}

/// Tunables for the shard writer.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardWriterInit {
    /// Directory the shard files are written to. Created if missing.
    pub output_dir: PathBuf,
    /// Number of records per shard file.
    pub batch_size: usize,
    /// Train/test/validation split ratio. Normalized to sum to one.
    pub ratio: [f64; 3],
    /// Shard file name template per split. The `{index}` placeholder is
    /// replaced with the zero-padded shard index.
    pub name_formats: [String; 3],
}

impl ShardWriterInit {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            ratio: DEFAULT_RATIO,
            name_formats: default_name_formats(),
        }
    }

    pub fn build(self) -> Result<ShardWriter> {
        let Self {
            output_dir,
            batch_size,
            ratio,
            name_formats,
        } = self;

        ensure!(batch_size > 0, "batch_size must be positive");
        ensure!(
            ratio.iter().all(|&ratio| ratio.is_finite() && ratio >= 0.0),
            "split ratios must be non-negative"
        );
        let sum: f64 = ratio.iter().sum();
        ensure!(sum > 0.0, "the sum of split ratios must be positive");
        for format in &name_formats {
            ensure!(
                format.contains("{index}"),
                "shard name format '{}' has no {{index}} placeholder",
                format
            );
        }
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("failed to create output directory '{}'", output_dir.display())
        })?;

        Ok(ShardWriter {
            output_dir,
            batch_size,
            ratio: ratio.map(|ratio| ratio / sum),
            splits: name_formats.map(|name_format| SplitState {
                name_format,
                writer: None,
                in_shard: 0,
                shard_index: 0,
                written: 0,
            }),
        })
    }
}

struct SplitState {
    name_format: String,
    writer: Option<RecordWriter<Example, BufWriter<File>>>,
    in_shard: usize,
    shard_index: usize,
    written: usize,
}

/// Writes examples to train/test/validation shard files, rolling over to a
/// new file every `batch_size` records.
pub struct ShardWriter {
    output_dir: PathBuf,
    batch_size: usize,
    ratio: [f64; 3],
    splits: [SplitState; 3],
}

impl ShardWriter {
    /// Append one example to the split currently furthest below its target
    /// ratio. The assignment is deterministic; ties break toward the split
    /// with the larger ratio.
    pub fn write(&mut self, example: Example) -> Result<()> {
        let index = self.pick_split();
        let batch_size = self.batch_size;
        let output_dir = &self.output_dir;
        let split = &mut self.splits[index];

        let writer = match &mut split.writer {
            Some(writer) if split.in_shard < batch_size => writer,
            writer => {
                let file_name = split
                    .name_format
                    .replace("{index}", &format!("{:08}", split.shard_index));
                let path = output_dir.join(file_name);
                let new_writer = RecordWriterInit::create(&path)
                    .with_context(|| format!("failed to create shard file '{}'", path.display()))?;
                split.shard_index += 1;
                split.in_shard = 0;
                writer.insert(new_writer)
            }
        };

        writer.send(example)?;
        split.in_shard += 1;
        split.written += 1;
        Ok(())
    }

    fn pick_split(&self) -> usize {
        let total: usize = self.splits.iter().map(|split| split.written).sum();
        let deficit = |index: usize| {
            self.ratio[index] * (total + 1) as f64 - self.splits[index].written as f64
        };

        (0..self.splits.len())
            .reduce(|best, index| {
                if deficit(index) > deficit(best)
                    || (deficit(index) == deficit(best) && self.ratio[index] > self.ratio[best])
                {
                    index
                } else {
                    best
                }
            })
            .unwrap_or(0)
    }

    /// Close all open shard files and report the record count per split.
    pub fn finish(self) -> Result<[usize; 3]> {
        Ok(self.splits.map(|split| split.written))
    }
}

/// Lazily iterate the annotation records stored in a list of shard files,
/// in order. The sequence is finite and consumed in one pass.
pub fn shard_records(
    paths: impl IntoIterator<Item = PathBuf>,
) -> impl Iterator<Item = Result<AnnotationRecord>> {
    paths
        .into_iter()
        .flat_map(|path| -> Box<dyn Iterator<Item = Result<AnnotationRecord>>> {
            let reader: Result<RecordReader<Example, BufReader<File>>, _> =
                RecordReaderInit {
                    check_integrity: true,
                }
                .open(&path);

            match reader {
                Ok(reader) => Box::new(reader.map(move |example| {
                    let example = example
                        .with_context(|| format!("failed to read shard '{}'", path.display()))?;
                    from_example(example)
                })),
                Err(err) => Box::new(std::iter::once(Err(Error::new(err).context(format!(
                    "failed to open shard '{}'",
                    path.display()
                ))))),
            }
        })
}
