pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools as _;
pub use log::{debug, info, warn};
pub use once_cell::sync::Lazy;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};
pub use tfrecord::{
    protobuf::{feature::Kind, BytesList, Example, Feature, Features, FloatList, Int64List},
    RecordReader, RecordReaderInit, RecordWriter, RecordWriterInit,
};
