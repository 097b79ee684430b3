use gametools_core::{AppError, Config, UploadedFile};
use std::path::Path;

/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{name}: file too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { name: String, size: usize, max: usize },

    #[error("{name}: invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        name: String,
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("{0}: empty file")]
    EmptyFile(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Checks uploads before anything is sent to an external service
pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_upload_size_bytes,
            config.allowed_extensions.clone(),
        )
    }

    pub fn validate_file_size(&self, name: &str, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile(name.to_string()));
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                name: name.to_string(),
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                name: filename.to_string(),
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    pub fn validate(&self, file: &UploadedFile) -> Result<(), ValidationError> {
        self.validate_extension(&file.name)?;
        self.validate_file_size(&file.name, file.len())
    }

    pub fn validate_all<'a>(
        &self,
        files: impl IntoIterator<Item = &'a UploadedFile>,
    ) -> Result<(), ValidationError> {
        files.into_iter().try_for_each(|file| self.validate(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> UploadValidator {
        UploadValidator::new(
            1024,
            vec!["jpg".to_string(), ".JPEG".to_string(), "png".to_string()],
        )
    }

    #[test]
    fn test_validate_file_size_ok() {
        assert!(test_validator().validate_file_size("box.jpg", 512).is_ok());
    }

    #[test]
    fn test_validate_file_size_too_large() {
        let result = test_validator().validate_file_size("box.jpg", 2048);
        assert!(matches!(result, Err(ValidationError::FileTooLarge { .. })));
    }

    #[test]
    fn test_validate_file_size_empty() {
        let result = test_validator().validate_file_size("box.jpg", 0);
        assert!(matches!(result, Err(ValidationError::EmptyFile(_))));
    }

    #[test]
    fn test_validate_extension_ok_case_insensitive() {
        let validator = test_validator();
        assert!(validator.validate_extension("box.JPG").is_ok());
        assert!(validator.validate_extension("portrait.jpeg").is_ok());
    }

    #[test]
    fn test_validate_extension_invalid() {
        let result = test_validator().validate_extension("portrait.gif");
        assert!(matches!(
            result,
            Err(ValidationError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_validate_extension_no_extension() {
        let result = test_validator().validate_extension("portrait");
        assert!(matches!(result, Err(ValidationError::InvalidFilename(_))));
    }

    #[test]
    fn test_validate_all_stops_at_first_failure() {
        let files = vec![
            UploadedFile::new("box.jpg", vec![1u8; 10]),
            UploadedFile::new("portrait.jpg", Vec::<u8>::new()),
        ];
        let err = test_validator().validate_all(&files).unwrap_err();
        assert_eq!(err.to_string(), "portrait.jpg: empty file");

        let app_err: AppError = err.into();
        assert!(app_err.is_input_error());
    }
}
