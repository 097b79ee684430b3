//! Thumbnail bundle workflow: uploads in, downloadable zip out.

use std::sync::Arc;

use gametools_core::{
    AppError, AppResult, AssetRole, Config, SessionContext, TicketRef, UploadedFile,
};
use gametools_processing::{
    bundle, bundle_file_name, check_game_name, AssetBucket, AssetPipeline, ImageCompressor,
    UploadValidator,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::duplicates::base_title;

/// A finished bundle ready to be written or served
#[derive(Debug, Clone, Serialize)]
pub struct BundleOutput {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub size_bytes: usize,
    /// Roles included, in bundle order
    pub roles: Vec<AssetRole>,
    /// Uploads that matched no role and were left out
    pub unclassified: Vec<String>,
}

/// The fetched ticket a bundle is made for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleTarget {
    pub title: String,
    /// Base title, used when no game name is given
    pub game_name: String,
    pub ticket: TicketRef,
}

impl BundleTarget {
    /// Pick a ticket from the session's last fetch by its full title
    pub fn from_session(session: &SessionContext, title: &str) -> AppResult<Self> {
        if !session.has_issues() {
            return Err(AppError::InvalidInput("Fetch games first".to_string()));
        }
        let title = title.trim();
        let ticket = session.issue(title).ok_or_else(|| {
            let fetched: Vec<&str> = session.issue_titles().collect();
            AppError::NotFound(format!(
                "No fetched game titled '{}' (fetched: {})",
                title,
                fetched.join(", ")
            ))
        })?;

        Ok(Self {
            title: title.to_string(),
            game_name: base_title(title).to_string(),
            ticket: ticket.clone(),
        })
    }
}

pub struct ThumbnailBundler {
    validator: UploadValidator,
    pipeline: AssetPipeline,
}

impl ThumbnailBundler {
    pub fn new(validator: UploadValidator, pipeline: AssetPipeline) -> Self {
        Self {
            validator,
            pipeline,
        }
    }

    pub fn from_config(config: &Config, compressor: Arc<dyn ImageCompressor>) -> Self {
        Self::new(
            UploadValidator::from_config(config),
            AssetPipeline::new(compressor, config.bundle_profile.clone()),
        )
    }

    /// Validate, classify, process and pack. Input problems are reported
    /// before any upload reaches the compression service.
    #[instrument(skip(self, uploads), fields(uploads = uploads.len()))]
    pub async fn run(
        &self,
        uploads: Vec<UploadedFile>,
        game_name: &str,
    ) -> AppResult<BundleOutput> {
        let game_name = check_game_name(game_name)?;
        self.validator.validate_all(&uploads)?;

        let (bucket, unclassified) = AssetBucket::from_uploads(uploads)?;
        let profile = self.pipeline.profile();
        bucket.require(profile)?;

        let folders = self.pipeline.build_folders(&bucket, game_name).await?;
        let bytes = bundle(&folders, &profile.sub_archive_roles())?;
        let roles: Vec<AssetRole> = folders.iter().map(|(role, _)| role).collect();

        let output = BundleOutput {
            file_name: bundle_file_name(game_name),
            size_bytes: bytes.len(),
            bytes,
            roles,
            unclassified,
        };
        info!(
            file_name = %output.file_name,
            size_bytes = output.size_bytes,
            "Bundle created"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use gametools_core::{BundleProfile, ErrorMetadata, UserKey};
    use crate::test_helpers::ticket;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::{Cursor, Read};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCompressor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageCompressor for CountingCompressor {
        fn name(&self) -> &str {
            "counting"
        }

        async fn compress(&self, data: Bytes) -> AppResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(data)
        }
    }

    fn jpeg() -> Vec<u8> {
        let img = RgbImage::from_pixel(12, 18, Rgb([30, 60, 90]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        buffer
    }

    fn bundler(compressor: Arc<CountingCompressor>) -> ThumbnailBundler {
        ThumbnailBundler::new(
            UploadValidator::new(1024 * 1024, vec!["jpg".into(), "jpeg".into(), "png".into()]),
            AssetPipeline::new(compressor, BundleProfile::standard()),
        )
    }

    fn entry_names(data: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        let mut names = Vec::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let mut sink = Vec::new();
            file.read_to_end(&mut sink).unwrap();
            names.push(file.name().to_string());
        }
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_run_produces_named_bundle() {
        let compressor = Arc::new(CountingCompressor::default());
        let output = bundler(compressor.clone())
            .run(
                vec![
                    UploadedFile::new("box.jpg", jpeg()),
                    UploadedFile::new("portrait.jpg", jpeg()),
                    UploadedFile::new("extra.png", jpeg()),
                ],
                "Nebula",
            )
            .await
            .unwrap();

        assert_eq!(output.file_name, "Nebula_bundle.zip");
        assert_eq!(output.roles, vec![AssetRole::Box, AssetRole::Portrait]);
        assert_eq!(output.unclassified, vec!["extra.png"]);
        assert_eq!(output.size_bytes, output.bytes.len());
        assert_eq!(compressor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            entry_names(&output.bytes),
            vec![
                "Box/Nebula.jpg",
                "Portrait.zip",
                "Portrait/Nebula.jpg",
                "Portrait/Nebula.webp",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_role_aborts_before_compression() {
        let compressor = Arc::new(CountingCompressor::default());
        let err = bundler(compressor.clone())
            .run(vec![UploadedFile::new("portrait.jpg", jpeg())], "Nebula")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Missing required files for: box");
        assert_eq!(compressor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_upload_is_input_error() {
        let err = bundler(Arc::new(CountingCompressor::default()))
            .run(
                vec![
                    UploadedFile::new("box.gif", jpeg()),
                    UploadedFile::new("portrait.jpg", jpeg()),
                ],
                "Nebula",
            )
            .await
            .unwrap_err();
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn test_blank_game_name_is_missing_field() {
        let err = bundler(Arc::new(CountingCompressor::default()))
            .run(vec![UploadedFile::new("box.jpg", jpeg())], " ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField(_)));
    }

    #[tokio::test]
    async fn test_slash_in_game_name_is_rejected_before_compression() {
        let compressor = Arc::new(CountingCompressor::default());
        let err = bundler(compressor.clone())
            .run(
                vec![
                    UploadedFile::new("box.jpg", jpeg()),
                    UploadedFile::new("portrait.jpg", jpeg()),
                ],
                "AC/DC Rocks",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(err.is_input_error());
        assert_eq!(compressor.calls.load(Ordering::SeqCst), 0);
    }

    fn fetched_session() -> SessionContext {
        let mut session =
            SessionContext::start(UserKey::new("ana", "lin_api_key", "Ready")).unwrap();
        session.replace_issues(&[
            ticket("1", "Mystic Forest - Acme/Zed", "Ready", None),
            ticket("2", "Sky Racer - Zed", "Ready", None),
        ]);
        session
    }

    #[test]
    fn test_target_uses_base_title_as_game_name() {
        let target =
            BundleTarget::from_session(&fetched_session(), "Mystic Forest - Acme/Zed").unwrap();
        assert_eq!(target.game_name, "Mystic Forest");
        assert_eq!(target.ticket.identifier, "GL-1");
        assert_eq!(target.ticket.url, "https://linear.app/issue/1");
    }

    #[test]
    fn test_target_requires_a_fetch_first() {
        let session = SessionContext::start(UserKey::new("ana", "key", "Ready")).unwrap();
        let err = BundleTarget::from_session(&session, "Sky Racer - Zed").unwrap_err();
        assert_eq!(err.client_message(), "Fetch games first");
    }

    #[test]
    fn test_unknown_target_lists_fetched_titles() {
        let err = BundleTarget::from_session(&fetched_session(), "Nebula - Acme").unwrap_err();
        match err {
            AppError::NotFound(msg) => {
                assert!(msg.contains("Mystic Forest - Acme/Zed"));
                assert!(msg.contains("Sky Racer - Zed"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
