use thiserror::Error;

/// Coarse classification of a [`RustyPbixError`], used by callers that only
/// care about which stage of the pipeline rejected the input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The declared input format is not one the loader understands
    UnsupportedFormat,
    /// The bytes do not parse as the declared format, or yield no data
    MalformedInput,
    /// Too few time periods for forecasting; callers may proceed without forecasts
    InsufficientData,
    /// The data model references something it does not declare
    SchemaIntegrity,
    /// A package entry could not be produced
    Serialization,
    /// Any other failure (I/O, configuration)
    Other,
}

/// Main error type for the analysis and packaging pipeline.
/// Aggregates the pipeline taxonomy with errors from the standard library, dependencies, and helper modules.
#[derive(Error, Debug)]
pub enum RustyPbixError {
    // Pipeline taxonomy
    #[error("Unsupported input format '{0}'")]
    UnsupportedFormatError(String),

    #[error("Malformed input: {0}")]
    MalformedInputError(String),

    #[error("Insufficient data: {0} dated period(s) available, at least 2 are required")]
    InsufficientDataError(usize),

    #[error("Schema integrity violated: {0}")]
    SchemaIntegrityError(String),

    #[error("Serialization failed: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    // Helper module errors
    #[error("{0}")]
    CfbHelperError(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    Biff8HelperError(#[from] crate::helpers::biff8::Biff8Error),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    XlsError(#[from] crate::spreadsheet::xls::XlsError),
}

impl RustyPbixError {
    /// Returns the pipeline stage classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormatError(_) => ErrorKind::UnsupportedFormat,
            Self::MalformedInputError(_) => ErrorKind::MalformedInput,
            Self::InsufficientDataError(_) => ErrorKind::InsufficientData,
            Self::SchemaIntegrityError(_) => ErrorKind::SchemaIntegrity,
            Self::SerializationError(_) => ErrorKind::Serialization,
            _ => ErrorKind::Other,
        }
    }

    /// Returns true if the pipeline may continue without the failed step.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::InsufficientData
    }
}

pub(crate) trait ResultOptionChain {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self;
}

impl<T, E> ResultOptionChain for Result<Option<T>, E> {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match self {
            Ok(None) => f(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    /// Folds every low-level failure into `MalformedInputError`, keeping
    /// taxonomy errors raised further down untouched.
    fn or_malformed(self, message: &str) -> Self;

    /// Folds every failure into `SerializationError`.
    fn or_serialization(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, RustyPbixError> {
    fn or_malformed(self, message: &str) -> Self {
        self.map_err(|e| match e {
            RustyPbixError::UnsupportedFormatError(_) | RustyPbixError::MalformedInputError(_) => e,
            _ => RustyPbixError::MalformedInputError(format!("{}: {}", message, e)),
        })
    }

    fn or_serialization(self, message: &str) -> Self {
        self.map_err(|e| match e {
            RustyPbixError::SerializationError(_) => e,
            _ => RustyPbixError::SerializationError(format!("{}: {}", message, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_of_taxonomy_variants() {
        assert_eq!(RustyPbixError::UnsupportedFormatError("pdf".into()).kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(RustyPbixError::InsufficientDataError(1).kind(), ErrorKind::InsufficientData);
        assert!(RustyPbixError::InsufficientDataError(0).is_recoverable());
        assert!(!RustyPbixError::SchemaIntegrityError("x".into()).is_recoverable());
    }

    #[test]
    fn or_malformed_keeps_taxonomy_errors() {
        let unsupported: Result<(), RustyPbixError> = Err(RustyPbixError::UnsupportedFormatError("pdf".into()));
        assert_eq!(unsupported.or_malformed("csv").unwrap_err().kind(), ErrorKind::UnsupportedFormat);

        let io: Result<(), RustyPbixError> = Err(std::io::Error::other("truncated").into());
        let error = io.or_malformed("xlsx").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput);
        assert_eq!(error.to_string(), "Malformed input: xlsx: truncated");
    }
}
