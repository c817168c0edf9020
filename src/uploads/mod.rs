//! Upload collaborator interface.
//!
//! The core never moves bytes itself; it validates file metadata
//! against the policy and stores the relative paths the storage layout
//! dictates. The uploads directory is served statically by the router.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum number of files accepted per attachment batch
pub const MAX_FILES: usize = 5;

/// Per-file size limit in megabytes
pub const MAX_FILE_SIZE_MB: u64 = 20;

/// File extensions accepted for lesson materials and homework
pub const ALLOWED_EXTENSIONS: [&str; 9] = [
    "pdf", "doc", "docx", "ppt", "pptx", "txt", "jpg", "jpeg", "png",
];

/// Metadata describing one transferred file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub size_bytes: u64,
}

/// Upload constraint violations, surfaced as client errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Too many files. Max allowed is {max}")]
    TooManyFiles { max: usize },

    #[error("File {filename} exceeds {max_mb} MB limit")]
    FileTooLarge { filename: String, max_mb: u64 },

    #[error("Unsupported file type: {extension}")]
    UnsupportedType { extension: String },
}

/// File-count, size, and extension constraints for attachment batches
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_file_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    /// Validates a batch of file metadata against all constraints
    pub fn validate_batch(&self, files: &[FileMetadata]) -> Result<(), UploadError> {
        if files.len() > self.max_files {
            return Err(UploadError::TooManyFiles {
                max: self.max_files,
            });
        }

        for file in files {
            self.validate_extension(&file.filename)?;

            if file.size_bytes > self.max_file_bytes {
                return Err(UploadError::FileTooLarge {
                    filename: file.filename.clone(),
                    max_mb: self.max_file_bytes / (1024 * 1024),
                });
            }
        }

        Ok(())
    }

    fn validate_extension(&self, filename: &str) -> Result<(), UploadError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            Ok(())
        } else {
            Err(UploadError::UnsupportedType { extension })
        }
    }
}

/// Relative URL path under which a stored file is reachable
///
/// Layout: `/uploads/{student-slug}/{lesson-date}/{filename}` — one
/// directory per student, one per lesson date.
pub fn storage_path(student_slug: &str, lesson_date: NaiveDate, filename: &str) -> String {
    format!(
        "/uploads/{}/{}/{}",
        student_slug,
        lesson_date.format("%Y-%m-%d"),
        filename
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> FileMetadata {
        FileMetadata {
            filename: name.to_string(),
            size_bytes: size,
        }
    }

    #[test]
    fn test_accepts_allowed_extensions() {
        let policy = UploadPolicy::default();
        let files = vec![file("notes.pdf", 1024), file("scan.JPG", 2048)];

        assert!(policy.validate_batch(&files).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        let policy = UploadPolicy::default();
        let files = vec![file("malware.exe", 10)];

        let err = policy.validate_batch(&files).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { ref extension } if extension == "exe"));
    }

    #[test]
    fn test_rejects_missing_extension() {
        let policy = UploadPolicy::default();

        assert!(policy.validate_batch(&[file("README", 10)]).is_err());
    }

    #[test]
    fn test_rejects_too_many_files() {
        let policy = UploadPolicy::default();
        let files: Vec<_> = (0..6).map(|i| file(&format!("f{i}.pdf"), 10)).collect();

        let err = policy.validate_batch(&files).unwrap_err();
        assert!(matches!(err, UploadError::TooManyFiles { max: 5 }));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let policy = UploadPolicy::default();
        let files = vec![file("big.pdf", 21 * 1024 * 1024)];

        let err = policy.validate_batch(&files).unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { max_mb: 20, .. }));
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let policy = UploadPolicy::default();
        let files = vec![file("exact.pdf", 20 * 1024 * 1024)];

        assert!(policy.validate_batch(&files).is_ok());
    }

    #[test]
    fn test_empty_batch_is_valid() {
        assert!(UploadPolicy::default().validate_batch(&[]).is_ok());
    }

    #[test]
    fn test_storage_path_layout() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();

        assert_eq!(
            storage_path("anna-kovalenko", date, "worksheet.pdf"),
            "/uploads/anna-kovalenko/2024-09-02/worksheet.pdf"
        );
    }
}
