use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// An image handed over by the user for one bundling action
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Semantic category of an uploaded thumbnail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    Box,
    Portrait,
    Landscape,
}

impl AssetRole {
    /// Classification order: a filename containing several keywords gets the first one.
    pub const CLASSIFICATION_ORDER: [AssetRole; 3] =
        [AssetRole::Box, AssetRole::Landscape, AssetRole::Portrait];

    /// Lowercase keyword searched for in file names
    pub fn keyword(self) -> &'static str {
        match self {
            AssetRole::Box => "box",
            AssetRole::Portrait => "portrait",
            AssetRole::Landscape => "landscape",
        }
    }

    /// Folder name used inside the bundle
    pub fn folder_name(self) -> &'static str {
        match self {
            AssetRole::Box => "Box",
            AssetRole::Portrait => "Portrait",
            AssetRole::Landscape => "Landscape",
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for AssetRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "box" => Ok(AssetRole::Box),
            "portrait" => Ok(AssetRole::Portrait),
            "landscape" => Ok(AssetRole::Landscape),
            other => Err(AppError::InvalidInput(format!("Unknown asset role: {}", other))),
        }
    }
}

/// How one role is turned into bundle entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub role: AssetRole,
    /// Extension (with dot) of the main output file
    pub extension: &'static str,
    /// Send through the compression service first
    pub compress: bool,
    /// Also emit a `.webp` rendition
    pub webp: bool,
    /// Embed `<Folder>.zip` with just this role's files at the bundle root
    pub sub_archive: bool,
}

/// The set of roles a bundling action requires, with per-role rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleProfile {
    pub name: &'static str,
    pub roles: Vec<RoleSpec>,
}

impl BundleProfile {
    /// Box and portrait; the portrait is compressed and gets a WebP copy.
    pub fn standard() -> Self {
        Self {
            name: "standard",
            roles: vec![
                RoleSpec {
                    role: AssetRole::Box,
                    extension: ".jpg",
                    compress: false,
                    webp: false,
                    sub_archive: false,
                },
                RoleSpec {
                    role: AssetRole::Portrait,
                    extension: ".jpg",
                    compress: true,
                    webp: true,
                    sub_archive: true,
                },
            ],
        }
    }

    /// Standard plus a compressed landscape image.
    pub fn full() -> Self {
        let mut profile = Self::standard();
        profile.name = "full";
        profile.roles.push(RoleSpec {
            role: AssetRole::Landscape,
            extension: ".jpg",
            compress: true,
            webp: false,
            sub_archive: false,
        });
        profile
    }

    pub fn spec_for(&self, role: AssetRole) -> Option<&RoleSpec> {
        self.roles.iter().find(|spec| spec.role == role)
    }

    pub fn required_roles(&self) -> impl Iterator<Item = AssetRole> + '_ {
        self.roles.iter().map(|spec| spec.role)
    }

    pub fn sub_archive_roles(&self) -> Vec<AssetRole> {
        self.roles
            .iter()
            .filter(|spec| spec.sub_archive)
            .map(|spec| spec.role)
            .collect()
    }
}

impl FromStr for BundleProfile {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(BundleProfile::standard()),
            "full" => Ok(BundleProfile::full()),
            other => Err(AppError::Config(format!("Unknown bundle profile: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_keyword() {
        for role in AssetRole::CLASSIFICATION_ORDER {
            assert_eq!(role.keyword().parse::<AssetRole>().unwrap(), role);
        }
        assert!("thumbnail".parse::<AssetRole>().is_err());
    }

    #[test]
    fn test_folder_names_are_capitalised() {
        assert_eq!(AssetRole::Box.folder_name(), "Box");
        assert_eq!(AssetRole::Portrait.folder_name(), "Portrait");
        assert_eq!(AssetRole::Landscape.folder_name(), "Landscape");
    }

    #[test]
    fn test_standard_profile() {
        let profile = BundleProfile::standard();
        let roles: Vec<_> = profile.required_roles().collect();
        assert_eq!(roles, vec![AssetRole::Box, AssetRole::Portrait]);
        assert_eq!(profile.sub_archive_roles(), vec![AssetRole::Portrait]);

        let portrait = profile.spec_for(AssetRole::Portrait).unwrap();
        assert!(portrait.compress);
        assert!(portrait.webp);
        assert!(!profile.spec_for(AssetRole::Box).unwrap().compress);
        assert!(profile.spec_for(AssetRole::Landscape).is_none());
    }

    #[test]
    fn test_full_profile_adds_landscape() {
        let profile: BundleProfile = "FULL".parse().unwrap();
        assert_eq!(profile.roles.len(), 3);
        assert!(profile.spec_for(AssetRole::Landscape).unwrap().compress);
    }

    #[test]
    fn test_uploaded_file_debug_omits_bytes() {
        let file = UploadedFile::new("box.jpg", vec![1u8, 2, 3]);
        assert_eq!(
            format!("{:?}", file),
            "UploadedFile { name: \"box.jpg\", size_bytes: 3 }"
        );
    }
}
