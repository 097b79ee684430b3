//! Filename classifier
//!
//! Maps uploads to roles by case-insensitive keyword search in the file name.
//! Keywords are tried in [`AssetRole::CLASSIFICATION_ORDER`] (box, landscape,
//! portrait), so `box_portrait.jpg` is a box image.

use std::collections::BTreeMap;

use gametools_core::{AppError, AppResult, AssetRole, BundleProfile, UploadedFile};
use tracing::{debug, warn};

/// Role for a file name, or `None` when no keyword is present
pub fn classify(filename: &str) -> Option<AssetRole> {
    let name = filename.to_lowercase();
    AssetRole::CLASSIFICATION_ORDER
        .into_iter()
        .find(|role| name.contains(role.keyword()))
}

/// At most one upload per role
#[derive(Debug, Default)]
pub struct AssetBucket {
    files: BTreeMap<AssetRole, UploadedFile>,
}

impl AssetBucket {
    /// Classify uploads into a bucket.
    ///
    /// Returns the bucket and the names of files that matched no role; those
    /// are left out of the bundle. Two files for the same role is an input error.
    pub fn from_uploads(
        uploads: impl IntoIterator<Item = UploadedFile>,
    ) -> AppResult<(Self, Vec<String>)> {
        let mut bucket = AssetBucket::default();
        let mut unclassified = Vec::new();

        for upload in uploads {
            match classify(&upload.name) {
                Some(role) => {
                    debug!(file = %upload.name, role = %role, "Classified upload");
                    if let Some(existing) = bucket.files.get(&role) {
                        return Err(AppError::InvalidInput(format!(
                            "Both {} and {} look like the {} image; upload only one",
                            existing.name, upload.name, role
                        )));
                    }
                    bucket.files.insert(role, upload);
                }
                None => {
                    warn!(file = %upload.name, "Upload matches no role keyword, skipping");
                    unclassified.push(upload.name);
                }
            }
        }

        Ok((bucket, unclassified))
    }

    /// Fail with every role the profile needs but the bucket lacks
    pub fn require(&self, profile: &BundleProfile) -> AppResult<()> {
        let missing: Vec<String> = profile
            .required_roles()
            .filter(|role| !self.files.contains_key(role))
            .map(|role| role.keyword().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingAssets { missing })
        }
    }

    pub fn get(&self, role: AssetRole) -> Option<&UploadedFile> {
        self.files.get(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = AssetRole> + '_ {
        self.files.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_single_keyword() {
        assert_eq!(classify("box.jpg"), Some(AssetRole::Box));
        assert_eq!(classify("Dragon_PORTRAIT.png"), Some(AssetRole::Portrait));
        assert_eq!(classify("hero-landscape-final.jpeg"), Some(AssetRole::Landscape));
    }

    #[test]
    fn test_classify_no_keyword() {
        assert_eq!(classify("cover.jpg"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn test_classify_priority_order() {
        assert_eq!(classify("box_portrait.jpg"), Some(AssetRole::Box));
        assert_eq!(classify("portrait_landscape.jpg"), Some(AssetRole::Landscape));
    }

    #[test]
    fn test_bucket_collects_roles_and_unclassified() {
        let (bucket, unclassified) = AssetBucket::from_uploads(vec![
            UploadedFile::new("box.jpg", vec![1u8]),
            UploadedFile::new("portrait.jpg", vec![2u8]),
            UploadedFile::new("notes.txt", vec![3u8]),
        ])
        .unwrap();

        assert_eq!(bucket.len(), 2);
        assert_eq!(unclassified, vec!["notes.txt"]);
        assert_eq!(bucket.get(AssetRole::Box).unwrap().name, "box.jpg");
        assert!(bucket.require(&BundleProfile::standard()).is_ok());
    }

    #[test]
    fn test_bucket_rejects_two_files_for_one_role() {
        let err = AssetBucket::from_uploads(vec![
            UploadedFile::new("box.jpg", vec![1u8]),
            UploadedFile::new("BOX-2.png", vec![2u8]),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_require_lists_missing_roles() {
        let (bucket, _) =
            AssetBucket::from_uploads(vec![UploadedFile::new("portrait.jpg", vec![1u8])]).unwrap();

        match bucket.require(&BundleProfile::full()) {
            Err(AppError::MissingAssets { missing }) => {
                assert_eq!(missing, vec!["box", "landscape"]);
            }
            other => panic!("expected MissingAssets, got {:?}", other),
        }
    }
}
