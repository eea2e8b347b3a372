use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Reasons an upload is refused before anything is stored or classified
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    /// The request carried no `image` file part
    #[error("No image file provided")]
    MissingFile,
    /// A file part was present but its filename was empty
    #[error("No image selected")]
    EmptyFilename,
    /// The filename has no extension or one outside the allowed set
    #[error("Invalid file type")]
    DisallowedExtension(Option<String>),
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Check an uploaded filename and return its lowercased extension
    pub fn validate_upload_filename(filename: &str, allowed_extensions: &[String]) -> Result<String, UploadRejection> {
        if filename.is_empty() {
            return Err(UploadRejection::EmptyFilename);
        }

        let Some((_, extension)) = filename.rsplit_once('.') else {
            return Err(UploadRejection::DisallowedExtension(None));
        };

        let extension = extension.to_ascii_lowercase();
        if allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&extension)) {
            Ok(extension)
        } else {
            Err(UploadRejection::DisallowedExtension(Some(extension)))
        }
    }

    /// Reduce a client-supplied filename to a safe ASCII basename.
    ///
    /// Path separators become spaces, whitespace runs become `_`, anything
    /// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are
    /// stripped, so the result can never climb out of the upload directory.
    /// May return an empty string.
    #[must_use]
    pub fn sanitize_filename(filename: &str) -> String {
        let ascii: String = filename
            .nfkd()
            .filter(char::is_ascii)
            .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
            .collect();

        let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

        joined
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
            .collect::<String>()
            .trim_matches(|c| c == '.' || c == '_')
            .to_string()
    }

    /// Sanitized filename that still carries the validated extension
    #[must_use]
    pub fn storage_filename(filename: &str, extension: &str) -> String {
        let sanitized = Self::sanitize_filename(filename);
        let keeps_extension = sanitized
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(extension));

        if keeps_extension {
            sanitized
        } else {
            format!("upload.{extension}")
        }
    }
}
