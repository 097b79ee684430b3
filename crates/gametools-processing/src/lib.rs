//! Game Tools Asset Processing Library
//!
//! Turns a handful of uploaded thumbnails into a downloadable bundle:
//! classify files by role, validate them, compress and re-encode the roles
//! that need it, and pack everything into nested zip archives.

pub mod archive;
pub mod classifier;
pub mod image;
pub mod pipeline;
pub mod traits;
pub mod validator;

// Re-export commonly used types
pub use archive::{bundle, bundle_file_name, BundleFolders};
pub use classifier::{classify, AssetBucket};
pub use self::image::ImageProcessor;
pub use pipeline::{check_game_name, AssetPipeline, ProcessedAsset};
pub use traits::ImageCompressor;
pub use validator::{UploadValidator, ValidationError};
