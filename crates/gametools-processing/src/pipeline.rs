//! Asset pipeline
//!
//! Runs each classified upload through the steps its role needs
//! (compression, WebP rendition) and lays the results out as bundle folders.

use std::sync::Arc;

use bytes::Bytes;
use gametools_core::{AppError, AppResult, AssetRole, BundleProfile};
use tracing::{debug, info, instrument};

use crate::archive::BundleFolders;
use crate::classifier::AssetBucket;
use crate::image::ImageProcessor;
use crate::traits::ImageCompressor;

/// Trimmed game name, usable as a bundle file stem.
///
/// Path separators and `..` are rejected since archive entries keep only
/// their base name.
pub fn check_game_name(game_name: &str) -> AppResult<&str> {
    let game_name = game_name.trim();
    if game_name.is_empty() {
        return Err(AppError::MissingField("game name".to_string()));
    }
    if game_name.contains(['/', '\\']) || game_name.contains("..") {
        return Err(AppError::InvalidInput(format!(
            "Game name must not contain '/', '\\' or '..': {}",
            game_name
        )));
    }
    Ok(game_name)
}

/// Output for one role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAsset {
    /// Compressed bytes, or the upload unchanged when the role is not compressed
    pub original: Bytes,
    pub webp: Option<Bytes>,
}

pub struct AssetPipeline {
    compressor: Arc<dyn ImageCompressor>,
    profile: BundleProfile,
}

impl AssetPipeline {
    pub fn new(compressor: Arc<dyn ImageCompressor>, profile: BundleProfile) -> Self {
        Self {
            compressor,
            profile,
        }
    }

    pub fn profile(&self) -> &BundleProfile {
        &self.profile
    }

    /// Process one upload according to its role spec.
    ///
    /// Roles outside the profile pass through untouched.
    pub async fn process(&self, raw: Bytes, role: AssetRole) -> AppResult<ProcessedAsset> {
        let Some(spec) = self.profile.spec_for(role) else {
            return Ok(ProcessedAsset {
                original: raw,
                webp: None,
            });
        };

        let original = if spec.compress {
            let input_size = raw.len();
            let compressed = self.compressor.compress(raw).await?;
            debug!(
                role = %role,
                compressor = self.compressor.name(),
                input_size,
                output_size = compressed.len(),
                "Compressed image"
            );
            compressed
        } else {
            raw
        };

        let webp = if spec.webp {
            Some(ImageProcessor::to_webp(&original)?)
        } else {
            None
        };

        Ok(ProcessedAsset { original, webp })
    }

    /// Process every role in the profile and name the outputs after the game
    #[instrument(skip(self, bucket), fields(profile = self.profile.name))]
    pub async fn build_folders(
        &self,
        bucket: &AssetBucket,
        game_name: &str,
    ) -> AppResult<BundleFolders> {
        let game_name = check_game_name(game_name)?;
        bucket.require(&self.profile)?;

        let mut folders = BundleFolders::new();
        for spec in &self.profile.roles {
            let Some(upload) = bucket.get(spec.role) else {
                continue;
            };

            let processed = self.process(upload.bytes.clone(), spec.role).await?;
            folders.insert(
                spec.role,
                format!("{}{}", game_name, spec.extension),
                processed.original,
            );
            if let Some(webp) = processed.webp {
                folders.insert(spec.role, format!("{}.webp", game_name), webp);
            }
        }

        info!(files = folders.file_count(), "Bundle folders ready");
        Ok(folders)
    }
}
