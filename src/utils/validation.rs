//! Validation and sanitising helpers for names that end up in files and worklists.

/// Longest output filename accepted
pub const MAX_FILENAME_LENGTH: usize = 255;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Filename too long: exceeds {MAX_FILENAME_LENGTH} characters")]
    FilenameTooLong,
    #[error("Invalid filename '{0}': contains path separators or control characters")]
    InvalidFilename(String),
    #[error("Empty filename provided")]
    EmptyFilename,
}

/// Replace commas, which would shift worklist and manifest columns
///
/// # Examples
///
/// ```
/// use lims_liquid::utils::validation::sanitize_csv_field;
///
/// assert_eq!(sanitize_csv_field("Pool 1, lane 2"), "Pool 1; lane 2");
/// ```
#[must_use]
pub fn sanitize_csv_field(text: &str) -> String {
    text.replace(',', ";")
}

/// Check that a generated filename is a single safe path component.
///
/// Process ids, flowcell ids and technician names all flow into output filenames.
///
/// # Errors
///
/// Returns `ValidationError::EmptyFilename` if the filename is empty,
/// `ValidationError::FilenameTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidFilename` if it could escape the output directory.
pub fn validate_filename(filename: &str) -> Result<&str, ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    if filename.len() > MAX_FILENAME_LENGTH {
        return Err(ValidationError::FilenameTooLong);
    }

    let traversal = filename == "." || filename.contains("..") || filename.contains(['/', '\\']);
    if traversal || filename.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFilename(filename.to_string()));
    }

    Ok(filename)
}

/// Keep the characters that are safe in a filename component, dropping the rest
#[must_use]
pub fn filename_component(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_csv_field() {
        assert_eq!(sanitize_csv_field("a,b,c"), "a;b;c");
        assert_eq!(sanitize_csv_field("plain"), "plain");
    }

    #[test]
    fn test_validate_filename_safe() {
        assert!(validate_filename("zika_worklist_norm_24-1234_240101_120000.csv").is_ok());
        assert!(validate_filename("AVITI_run_manifest_FC1_24-1_240101_120000_JaneDoe.zip").is_ok());
    }

    #[test]
    fn test_validate_filename_dangerous() {
        assert_eq!(validate_filename(""), Err(ValidationError::EmptyFilename));
        assert!(matches!(
            validate_filename("../etc/passwd"),
            Err(ValidationError::InvalidFilename(_))
        ));
        assert!(validate_filename("a/b.csv").is_err());
        assert!(validate_filename("a\\b.csv").is_err());
        assert!(validate_filename("a\0b.csv").is_err());
        assert_eq!(
            validate_filename(&"a".repeat(300)),
            Err(ValidationError::FilenameTooLong)
        );
    }

    #[test]
    fn test_filename_component() {
        assert_eq!(filename_component("Jane Doe"), "JaneDoe");
        assert_eq!(filename_component("24-1234/../x"), "24-1234..x");
    }
}
