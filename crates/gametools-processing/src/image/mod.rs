//! Image handling module
//!
//! Decoding checks and in-memory WebP re-encoding for bundle derivatives.

pub mod processor;

pub use processor::{ImageInfo, ImageProcessor};
