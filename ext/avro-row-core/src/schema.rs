use crate::error::{ConversionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Full name of the native named type (record, enum or fixed) a generic type
/// was translated from, or should be translated to.
///
/// This is metadata only: two `NativeName`s always compare equal, so generic
/// schemas keep structural equality while native names survive a
/// native → generic → native round trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeName(Option<String>);

impl NativeName {
    pub fn new<S: Into<String>>(name: S) -> Self {
        NativeName(Some(name.into()))
    }

    pub fn none() -> Self {
        NativeName(None)
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl PartialEq for NativeName {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for NativeName {}

impl Hash for NativeName {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

/// Generic data types understood by the row model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bytes,
    FixedBytes { size: usize, name: NativeName },
    Decimal { precision: u32, scale: u32 },
    Date,
    Timestamp,
    Enum { symbols: Vec<String>, name: NativeName },
    Row(Arc<Schema>),
    Array(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
}

impl DataType {
    /// Get the type name for display
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Int16 => "INT16",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Float32 => "FLOAT32",
            DataType::Float64 => "FLOAT64",
            DataType::String => "STRING",
            DataType::Bytes => "BYTES",
            DataType::FixedBytes { .. } => "FIXED_BYTES",
            DataType::Decimal { .. } => "DECIMAL",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Enum { .. } => "ENUM",
            DataType::Row(_) => "ROW",
            DataType::Array(_) => "ARRAY",
            DataType::Map(_, _) => "MAP",
        }
    }

    /// Name of the logical type catalog entry responsible for this type, if any
    pub fn logical_name(&self) -> Option<&'static str> {
        use crate::logical::names;

        match self {
            DataType::FixedBytes { .. } => Some(names::FIXED),
            DataType::Decimal { .. } => Some(names::DECIMAL),
            DataType::Date => Some(names::DATE),
            DataType::Timestamp => Some(names::TIMESTAMP_MILLIS),
            DataType::Enum { .. } => Some(names::ENUM),
            _ => None,
        }
    }

    /// Map keys are restricted to hashable scalars
    pub fn is_map_key_compatible(&self) -> bool {
        matches!(
            self,
            DataType::Boolean
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::String
                | DataType::Bytes
                | DataType::FixedBytes { .. }
                | DataType::Date
                | DataType::Timestamp
                | DataType::Enum { .. }
        )
    }

    fn validate(&self) -> Result<()> {
        match self {
            DataType::Decimal { precision, scale } => {
                if *precision == 0 || scale > precision {
                    return Err(ConversionError::invalid_schema(format!(
                        "decimal precision {} and scale {} are invalid",
                        precision, scale
                    )));
                }
            }
            DataType::Enum { symbols, .. } => {
                if symbols.is_empty() {
                    return Err(ConversionError::invalid_schema(
                        "enumeration requires at least one symbol",
                    ));
                }
                let mut seen = HashSet::new();
                for symbol in symbols {
                    if !seen.insert(symbol.as_str()) {
                        return Err(ConversionError::invalid_schema(format!(
                            "duplicate enumeration symbol: {}",
                            symbol
                        )));
                    }
                }
            }
            DataType::Array(element) => element.data_type.validate()?,
            DataType::Map(key, value) => {
                if !key.data_type.is_map_key_compatible() || key.nullable {
                    return Err(ConversionError::invalid_schema(format!(
                        "map key must be a non-nullable scalar, got {}",
                        key
                    )));
                }
                value.data_type.validate()?;
            }
            // Nested schemas were validated by their own builder
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::FixedBytes { size, .. } => write!(f, "FIXED_BYTES({})", size),
            DataType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({}, {})", precision, scale)
            }
            DataType::Enum { symbols, .. } => write!(f, "ENUM({})", symbols.join(", ")),
            DataType::Row(schema) => {
                f.write_str("ROW<")?;
                for (idx, field) in schema.fields().iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name(), field.field_type())?;
                }
                f.write_str(">")
            }
            DataType::Array(element) => write!(f, "ARRAY<{}>", element),
            DataType::Map(key, value) => write!(f, "MAP<{}, {}>", key, value),
            other => f.write_str(other.type_name()),
        }
    }
}

/// A data type together with its nullability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub data_type: DataType,
    pub nullable: bool,
}

impl FieldType {
    pub fn new(data_type: DataType, nullable: bool) -> Self {
        Self {
            data_type,
            nullable,
        }
    }

    /// A non-nullable field type
    pub fn of(data_type: DataType) -> Self {
        Self::new(data_type, false)
    }

    pub fn boolean() -> Self {
        Self::of(DataType::Boolean)
    }

    pub fn int16() -> Self {
        Self::of(DataType::Int16)
    }

    pub fn int32() -> Self {
        Self::of(DataType::Int32)
    }

    pub fn int64() -> Self {
        Self::of(DataType::Int64)
    }

    pub fn float32() -> Self {
        Self::of(DataType::Float32)
    }

    pub fn float64() -> Self {
        Self::of(DataType::Float64)
    }

    pub fn string() -> Self {
        Self::of(DataType::String)
    }

    pub fn bytes() -> Self {
        Self::of(DataType::Bytes)
    }

    pub fn fixed_bytes(size: usize) -> Self {
        Self::of(DataType::FixedBytes {
            size,
            name: NativeName::none(),
        })
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self::of(DataType::Decimal { precision, scale })
    }

    pub fn date() -> Self {
        Self::of(DataType::Date)
    }

    pub fn timestamp() -> Self {
        Self::of(DataType::Timestamp)
    }

    pub fn enumeration<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(DataType::Enum {
            symbols: symbols.into_iter().map(Into::into).collect(),
            name: NativeName::none(),
        })
    }

    pub fn row(schema: impl Into<Arc<Schema>>) -> Self {
        Self::of(DataType::Row(schema.into()))
    }

    pub fn array(element: FieldType) -> Self {
        Self::of(DataType::Array(Box::new(element)))
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        Self::of(DataType::Map(Box::new(key), Box::new(value)))
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Attach the native name used for records, enums and fixed types
    pub fn with_native_name<S: Into<String>>(mut self, native: S) -> Self {
        match &mut self.data_type {
            DataType::FixedBytes { name, .. } | DataType::Enum { name, .. } => {
                *name = NativeName::new(native);
            }
            DataType::Row(schema) => {
                let renamed = Schema {
                    name: NativeName::new(native),
                    fields: schema.fields.clone(),
                };
                *schema = Arc::new(renamed);
            }
            _ => {}
        }
        self
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl From<DataType> for FieldType {
    fn from(data_type: DataType) -> Self {
        FieldType::of(data_type)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{} NULLABLE", self.data_type)
        } else {
            write!(f, "{}", self.data_type)
        }
    }
}

/// A named, typed field of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    field_type: FieldType,
}

impl Field {
    pub fn new<S: Into<String>>(name: S, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// Create a field that accepts null regardless of `field_type`'s own flag
    pub fn nullable<S: Into<String>>(name: S, field_type: FieldType) -> Self {
        Self::new(name, field_type.with_nullable(true))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn data_type(&self) -> &DataType {
        &self.field_type.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.field_type.nullable
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }
}

/// Ordered, immutable sequence of uniquely named fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    name: NativeName,
    fields: Vec<Field>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The native record name this schema was translated from, if any
    pub fn native_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Builder for creating schemas
pub struct SchemaBuilder {
    name: NativeName,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            name: NativeName::none(),
            fields: Vec::new(),
        }
    }

    /// Set the native record name used when translating this schema
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = NativeName::new(name);
        self
    }

    pub(crate) fn with_native_name(mut self, name: NativeName) -> Self {
        self.name = name;
        self
    }

    pub fn add_field<S: Into<String>>(mut self, name: S, field_type: FieldType) -> Self {
        self.fields.push(Field::new(name, field_type));
        self
    }

    pub fn add_nullable_field<S: Into<String>>(mut self, name: S, field_type: FieldType) -> Self {
        self.fields.push(Field::nullable(name, field_type));
        self
    }

    pub fn add(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn add_fields<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ConversionError::invalid_schema(format!(
                    "duplicate field name: {}",
                    field.name
                )));
            }
            field.field_type.data_type.validate()?;
        }

        Ok(Schema {
            name: self.name,
            fields: self.fields,
        })
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_schema() -> Schema {
        Schema::builder()
            .add_field("BOOL_NON_NULLABLE", FieldType::boolean())
            .add_nullable_field("int", FieldType::int32())
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_creation() {
        let schema = sub_schema();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.index_of("int"), Some(1));
        assert!(!schema.fields()[0].is_nullable());
        assert!(schema.field_by_name("int").unwrap().is_nullable());
        assert!(schema.field_by_name("missing").is_none());
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let result = Schema::builder()
            .add_field("id", FieldType::int64())
            .add_field("id", FieldType::string())
            .build();
        assert!(matches!(result, Err(ConversionError::InvalidSchema(_))));
    }

    #[test]
    fn test_map_key_must_be_scalar() {
        let result = Schema::builder()
            .add_field(
                "map",
                FieldType::map(FieldType::row(sub_schema()), FieldType::int32()),
            )
            .build();
        assert!(matches!(result, Err(ConversionError::InvalidSchema(_))));

        let ok = Schema::builder()
            .add_field("map", FieldType::map(FieldType::int64(), FieldType::int32()))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_invalid_decimal_and_enum() {
        let decimal = Schema::builder()
            .add_field("d", FieldType::decimal(2, 3))
            .build();
        assert!(decimal.is_err());

        let empty_enum = Schema::builder()
            .add_field("e", FieldType::enumeration(Vec::<String>::new()))
            .build();
        assert!(empty_enum.is_err());

        let duplicate_enum = Schema::builder()
            .add_field("e", FieldType::enumeration(["abc", "abc"]))
            .build();
        assert!(duplicate_enum.is_err());
    }

    #[test]
    fn test_native_name_is_ignored_by_equality() {
        let named = Schema::builder()
            .with_name("TestAvroNested")
            .add_field("BOOL_NON_NULLABLE", FieldType::boolean())
            .add_nullable_field("int", FieldType::int32())
            .build()
            .unwrap();

        assert_eq!(named, sub_schema());
        assert_eq!(named.native_name(), Some("TestAvroNested"));
        assert_eq!(sub_schema().native_name(), None);

        let fixed = FieldType::fixed_bytes(4).with_native_name("fixed4");
        assert_eq!(fixed, FieldType::fixed_bytes(4));
        assert_ne!(fixed, FieldType::fixed_bytes(8));
    }

    #[test]
    fn test_nullability_is_part_of_equality() {
        let a = Schema::builder()
            .add_field("short", FieldType::int16())
            .build()
            .unwrap();
        let b = Schema::builder()
            .add_nullable_field("short", FieldType::int16())
            .build()
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let t = FieldType::map(
            FieldType::string(),
            FieldType::row(sub_schema()).with_nullable(true),
        );
        assert_eq!(
            t.to_string(),
            "MAP<STRING, ROW<BOOL_NON_NULLABLE: BOOLEAN, int: INT32 NULLABLE> NULLABLE>"
        );
        assert_eq!(FieldType::decimal(10, 2).to_string(), "DECIMAL(10, 2)");
    }
}
