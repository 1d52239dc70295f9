//! Merging of adjacent bounding boxes into regions.

mod common;

pub use merge::*;
pub mod merge;

#[cfg(feature = "opencv")]
pub use with_opencv::*;
#[cfg(feature = "opencv")]
mod with_opencv;
