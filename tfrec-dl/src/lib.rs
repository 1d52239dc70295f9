//! Annotation dataset to TFRecord serialization toolkit.

mod common;

pub mod annotation;
pub mod dataset;
