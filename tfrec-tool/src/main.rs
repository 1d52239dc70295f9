use anyhow::{ensure, format_err, Context, Result};
use clap::{Args, Parser, Subcommand};
use itertools::Itertools as _;
use log::{info, warn};
use prettytable::{cell, row, Table};
use std::path::PathBuf;
use tfrec_dl::{
    annotation::{CocoTextDataset, LabelMap},
    dataset::{
        default_name_formats, shard_records, to_example, ShardWriterInit, DEFAULT_BATCH_SIZE,
        DEFAULT_RATIO,
    },
};

mod config;
use config::{AnnotationFormat, ConvertConfig};

/// TFRecord dataset tools.
#[derive(Debug, Clone, Parser)]
struct Opts {
    /// increase log verbosity; repeat for more detail
    #[clap(short, long, parse(from_occurrences), global = true)]
    verbose: u64,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// convert an annotation dataset into TFRecord shards
    Convert(ConvertOpts),
    /// summarize the records stored in TFRecord shards
    Inspect(InspectOpts),
    /// detect and merge text-like regions in an image
    Regions(RegionsOpts),
}

#[derive(Debug, Clone, Args)]
struct ConvertOpts {
    /// annotation format of the input files
    #[clap(long, arg_enum)]
    annotype: Option<AnnotationFormat>,
    /// annotation files; only the first is used
    #[clap(long)]
    annofile: Vec<PathBuf>,
    /// directory of source images; omit to write records without pixels
    #[clap(long)]
    image_dir: Option<PathBuf>,
    /// seed file for the class label table
    #[clap(long)]
    label_file: Option<PathBuf>,
    /// also write a horizontally mirrored copy of every record
    #[clap(long)]
    rollover: bool,
    /// output directory of the shard files
    #[clap(long)]
    output_dir: Option<PathBuf>,
    /// number of records per shard file
    #[clap(long)]
    batch_size: Option<usize>,
    /// train/test/validation split ratio
    #[clap(long, number_of_values = 3)]
    ratio: Option<Vec<f64>>,
    /// shard file name template per split, with an {index} placeholder
    #[clap(long, number_of_values = 3)]
    name_formats: Option<Vec<String>>,
    /// JSON5 configuration file supplying defaults for the flags above
    #[clap(long)]
    config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct InspectOpts {
    /// shard files or glob patterns
    #[clap(required = true)]
    filenames: Vec<String>,
}

#[derive(Debug, Clone, Args)]
struct RegionsOpts {
    /// input image file
    image_file: PathBuf,
    /// maximum pixel gap between two boxes of one region
    #[clap(long, default_value_t = 16)]
    min_gap: i64,
    /// minimum bounding area of a region
    #[clap(long)]
    min_area: Option<i64>,
    /// maximum bounding area of a region
    #[clap(long)]
    max_area: Option<i64>,
    /// minimum area-to-perimeter ratio of a region
    #[clap(long, default_value_t = 4.0)]
    min_area_perimeter_ratio: f64,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logger(opts.verbose);

    match opts.command {
        Command::Convert(opts) => convert(opts)?,
        Command::Inspect(opts) => inspect(opts)?,
        Command::Regions(opts) => regions(opts)?,
    }

    Ok(())
}

fn init_logger(verbosity: u64) {
    use log::LevelFilter;

    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(level);
        }
    }
    builder.init();
}

fn convert(opts: ConvertOpts) -> Result<()> {
    let config = match &opts.config_file {
        Some(path) => ConvertConfig::open(path)?,
        None => ConvertConfig::default(),
    };

    let annotype = opts.annotype.or(config.annotype).ok_or_else(|| {
        format_err!("no annotation format given; pass --annotype or set it in the config file")
    })?;
    let annofiles = if !opts.annofile.is_empty() {
        opts.annofile
    } else {
        config.annofile
    };
    ensure!(
        !annofiles.is_empty(),
        "no annotation file given; pass --annofile or set it in the config file"
    );
    if annofiles.len() > 1 {
        warn!(
            "only the first annotation file '{}' will be used",
            annofiles[0].display()
        );
    }
    let annofile = &annofiles[0];
    let image_dir = opts.image_dir.or(config.image_dir);
    let label_file = opts.label_file.or(config.label_file);
    let rollover = opts.rollover || config.rollover.unwrap_or(false);
    let output_dir = opts
        .output_dir
        .or(config.tfrecord.dir)
        .unwrap_or_else(|| PathBuf::from("tfrecord"));
    let batch_size = opts
        .batch_size
        .or(config.tfrecord.batch_size)
        .unwrap_or(DEFAULT_BATCH_SIZE);
    let ratio = match opts.ratio {
        Some(values) => triple(values, "--ratio")?,
        None => config.tfrecord.ratio.unwrap_or(DEFAULT_RATIO),
    };
    let name_formats = match opts.name_formats {
        Some(values) => triple(values, "--name-formats")?,
        None => config
            .tfrecord
            .name_formats
            .unwrap_or_else(default_name_formats),
    };

    let mut labels = match &label_file {
        Some(path) => LabelMap::open(path)?,
        None => LabelMap::new(),
    };
    let mut writer = ShardWriterInit {
        batch_size,
        ratio,
        name_formats,
        output_dir: output_dir.clone(),
    }
    .build()?;

    match annotype {
        AnnotationFormat::CocoText => {
            let dataset = CocoTextDataset::load(annofile)?;
            info!(
                "loaded {} annotations over {} images from '{}'",
                dataset.anns.len(),
                dataset.imgs.len(),
                annofile.display()
            );

            let mut count = 0;
            for record in dataset.records(image_dir.as_deref(), &mut labels) {
                let record = record?;
                if rollover {
                    writer.write(to_example(record.clone())?)?;
                    writer.write(to_example(record.rollover())?)?;
                } else {
                    writer.write(to_example(record)?)?;
                }
                count += 1;
            }
            info!("converted {} records", count);
        }
    }

    let [train, test, validation] = writer.finish()?;
    info!(
        "wrote {} train, {} test and {} validation records under '{}'",
        train,
        test,
        validation,
        output_dir.display()
    );

    if !labels.is_empty() {
        let label_path = output_dir.join("labels.txt");
        labels.save(&label_path)?;
        info!(
            "saved {} class labels to '{}'",
            labels.len(),
            label_path.display()
        );
    }

    Ok(())
}

fn triple<T>(values: Vec<T>, flag: &str) -> Result<[T; 3]> {
    values
        .try_into()
        .map_err(|_| format_err!("{} takes exactly three values", flag))
}

fn inspect(opts: InspectOpts) -> Result<()> {
    let mut paths = vec![];
    for pattern in &opts.filenames {
        let entries =
            glob::glob(pattern).with_context(|| format!("invalid file pattern '{}'", pattern))?;
        for entry in entries {
            paths.push(entry?);
        }
    }
    paths.sort();
    ensure!(!paths.is_empty(), "no shard file matches the given patterns");

    let mut table = Table::new();
    table.add_row(row!["filename", "image", "objects", "text"]);

    let mut count = 0;
    for record in shard_records(paths) {
        let record = record?;
        let filename = record.as_str("image/filename").unwrap_or("").to_owned();
        let shape = record
            .image()
            .map(|image| format!("{}x{}x{}", image.height(), image.width(), image.depth()))
            .unwrap_or_else(|| "-".to_owned());
        let objects = record
            .as_float32_list("image/object/bbox/xmin")
            .map(|xmins| xmins.len())
            .unwrap_or(0);
        let preview = record
            .as_str_list("image/object/text")
            .unwrap_or(&[])
            .iter()
            .filter(|text| !text.is_empty())
            .take(3)
            .join(" ");
        table.add_row(row![filename, shape, objects, preview]);
        count += 1;
    }

    table.printstd();
    info!("{} records in total", count);
    Ok(())
}

#[cfg(feature = "opencv")]
fn regions(opts: RegionsOpts) -> Result<()> {
    use noisy_float::types::R64;
    use region::{detect_regions_file, RegionMergerInit};

    let RegionsOpts {
        image_file,
        min_gap,
        min_area,
        max_area,
        min_area_perimeter_ratio,
    } = opts;
    let ratio = R64::try_new(min_area_perimeter_ratio)
        .ok_or_else(|| format_err!("min_area_perimeter_ratio must be a number"))?;

    let bboxes = detect_regions_file(&image_file)?;
    info!(
        "detected {} raw boxes in '{}'",
        bboxes.len(),
        image_file.display()
    );

    let merger = RegionMergerInit {
        min_gap,
        min_area,
        max_area,
        min_area_perimeter_ratio: Some(ratio),
    }
    .build();
    let merged = merger.merge(bboxes);

    let mut table = Table::new();
    table.add_row(row!["xmin", "ymin", "xmax", "ymax", "area"]);
    merged.iter().for_each(|bbox| {
        table.add_row(row![
            bbox.xmin(),
            bbox.ymin(),
            bbox.xmax(),
            bbox.ymax(),
            bbox.area()
        ]);
    });
    table.printstd();

    Ok(())
}

#[cfg(not(feature = "opencv"))]
fn regions(_opts: RegionsOpts) -> Result<()> {
    use anyhow::bail;
    bail!("'opencv' feature must be enabled to run this command");
}
