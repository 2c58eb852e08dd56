use std::fmt;
use thiserror::Error;

/// One step on the way from a record root to a nested value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named field of a record or row
    Field(String),
    /// An element of an array
    Index(usize),
    /// A value of a map
    Key(String),
}

/// Field-name chain attached to conversion errors and schema advisories
///
/// Rendered as `array[1].int` or `map["k1"].BOOL_NON_NULLABLE`. An empty path
/// refers to the value handed to the converter and renders as `<root>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The path of the value passed to a conversion call
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Return a new path extended by one segment
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Insert a segment at the front; used while an error unwinds outwards
    pub fn prepend(&mut self, segment: PathSegment) {
        self.segments.insert(0, segment);
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if idx == 0 => write!(f, "{}", name)?,
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
                PathSegment::Key(key) => write!(f, "[{:?}]", key)?,
            }
        }
        Ok(())
    }
}

/// Core error type for schema translation and value conversion
#[derive(Error, Debug)]
pub enum ConversionError {
    /// A type or type combination outside the supported catalog
    #[error("Unsupported type at {path}: {message}")]
    UnsupportedType { path: FieldPath, message: String },

    /// A fixed-length byte value whose length disagrees with the schema
    #[error("Size mismatch at {path}: fixed bytes expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: FieldPath,
        expected: usize,
        actual: usize,
    },

    /// A decimal rescale that would drop nonzero digits, or exceed the declared precision
    #[error("Precision loss at {path}: {message}")]
    PrecisionLoss { path: FieldPath, message: String },

    /// An enum symbol or ordinal outside the declared symbol set
    #[error("Unknown enum symbol at {path}: {symbol:?} is not one of {symbols:?}")]
    UnknownEnumSymbol {
        path: FieldPath,
        symbol: String,
        symbols: Vec<String>,
    },

    /// A null value against a non-nullable field
    #[error("Unexpected null at {path}: field is not nullable")]
    UnexpectedNull { path: FieldPath },

    /// Source and target shapes disagree (field count, order or type)
    #[error("Schema mismatch at {path}: {message}")]
    SchemaMismatch { path: FieldPath, message: String },

    /// A value that cannot be represented on the other side (out of range, malformed)
    #[error("Invalid value at {path}: {message}")]
    InvalidValue { path: FieldPath, message: String },

    /// Schema construction errors
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Errors raised by the Avro library while building native schemas
    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),
}

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConversionError>;

impl ConversionError {
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        ConversionError::UnsupportedType {
            path: FieldPath::root(),
            message: msg.into(),
        }
    }

    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        ConversionError::SizeMismatch {
            path: FieldPath::root(),
            expected,
            actual,
        }
    }

    pub fn precision_loss<S: Into<String>>(msg: S) -> Self {
        ConversionError::PrecisionLoss {
            path: FieldPath::root(),
            message: msg.into(),
        }
    }

    pub fn unknown_enum_symbol<S: Into<String>>(symbol: S, symbols: &[String]) -> Self {
        ConversionError::UnknownEnumSymbol {
            path: FieldPath::root(),
            symbol: symbol.into(),
            symbols: symbols.to_vec(),
        }
    }

    pub fn unexpected_null() -> Self {
        ConversionError::UnexpectedNull {
            path: FieldPath::root(),
        }
    }

    pub fn schema_mismatch<S: Into<String>>(msg: S) -> Self {
        ConversionError::SchemaMismatch {
            path: FieldPath::root(),
            message: msg.into(),
        }
    }

    pub fn invalid_value<S: Into<String>>(msg: S) -> Self {
        ConversionError::InvalidValue {
            path: FieldPath::root(),
            message: msg.into(),
        }
    }

    pub fn invalid_schema<S: Into<String>>(msg: S) -> Self {
        ConversionError::InvalidSchema(msg.into())
    }

    /// The location of the failing value, when the error is tied to one
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            ConversionError::UnsupportedType { path, .. }
            | ConversionError::SizeMismatch { path, .. }
            | ConversionError::PrecisionLoss { path, .. }
            | ConversionError::UnknownEnumSymbol { path, .. }
            | ConversionError::UnexpectedNull { path }
            | ConversionError::SchemaMismatch { path, .. }
            | ConversionError::InvalidValue { path, .. } => Some(path),
            ConversionError::InvalidSchema(_) | ConversionError::Avro(_) => None,
        }
    }

    /// Prefix the error path with one more enclosing segment
    pub fn within(mut self, segment: PathSegment) -> Self {
        match &mut self {
            ConversionError::UnsupportedType { path, .. }
            | ConversionError::SizeMismatch { path, .. }
            | ConversionError::PrecisionLoss { path, .. }
            | ConversionError::UnknownEnumSymbol { path, .. }
            | ConversionError::UnexpectedNull { path }
            | ConversionError::SchemaMismatch { path, .. }
            | ConversionError::InvalidValue { path, .. } => path.prepend(segment),
            ConversionError::InvalidSchema(_) | ConversionError::Avro(_) => {}
        }
        self
    }
}

/// Extension trait to attach the field-name chain to errors as they propagate
pub trait ErrorContext<T> {
    /// The error happened inside the named field
    fn in_field(self, name: &str) -> Result<T>;

    /// The error happened inside the array element at `index`
    fn at_index(self, index: usize) -> Result<T>;

    /// The error happened inside the map value stored under `key`
    fn at_key(self, key: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ConversionError>,
{
    fn in_field(self, name: &str) -> Result<T> {
        self.map_err(|e| e.into().within(PathSegment::Field(name.to_string())))
    }

    fn at_index(self, index: usize) -> Result<T> {
        self.map_err(|e| e.into().within(PathSegment::Index(index)))
    }

    fn at_key(self, key: &str) -> Result<T> {
        self.map_err(|e| e.into().within(PathSegment::Key(key.to_string())))
    }
}
