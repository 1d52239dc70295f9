//! Annotation record schema and TFRecord serialization.

mod example;
mod record;
mod schema;
mod shard;

pub use example::*;
pub use record::*;
pub use schema::*;
pub use shard::*;
