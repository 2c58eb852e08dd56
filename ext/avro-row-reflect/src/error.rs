use avro_row_core::ConversionError;
use thiserror::Error;

/// Errors raised while deriving schemas from host types or converting host values
#[derive(Error, Debug)]
pub enum ReflectError {
    /// Schema translation or value conversion failed
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The field-descriptor table of a host type is inconsistent
    #[error("Invalid descriptor for {record}.{field}: {message}")]
    InvalidDescriptor {
        record: String,
        field: String,
        message: String,
    },
}

/// Result type alias for reflection operations
pub type Result<T> = std::result::Result<T, ReflectError>;

impl ReflectError {
    pub fn invalid_descriptor<R, F, M>(record: R, field: F, message: M) -> Self
    where
        R: Into<String>,
        F: Into<String>,
        M: Into<String>,
    {
        ReflectError::InvalidDescriptor {
            record: record.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// The underlying conversion error, if this is one
    pub fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            ReflectError::Conversion(e) => Some(e),
            _ => None,
        }
    }
}
