use crate::decimal::Decimal;
use crate::error::{ConversionError, ErrorContext, Result};
use crate::schema::{DataType, FieldType, Schema};
use bytes::Bytes;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// A single value of a generic row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowValue {
    Null,
    Boolean(bool),

    // Numeric types
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),

    String(Arc<str>),
    Bytes(Bytes), // BYTES and FIXED_BYTES

    // Logical types
    Decimal(Decimal),
    Date(jiff::civil::Date),
    Timestamp(jiff::Timestamp),
    Enum(Arc<str>),

    // Complex types
    Row(Row),
    Array(Vec<RowValue>),
    Map(IndexMap<RowValue, RowValue>), // equality ignores insertion order
}

impl std::hash::Hash for RowValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            RowValue::Null => 0_i32.hash(state),
            RowValue::Boolean(b) => b.hash(state),
            RowValue::Int16(i) => i.hash(state),
            RowValue::Int32(i) => i.hash(state),
            RowValue::Int64(i) => i.hash(state),
            RowValue::Float32(f) => f.hash(state),
            RowValue::Float64(f) => f.hash(state),
            RowValue::String(s) => s.hash(state),
            RowValue::Bytes(b) => b.hash(state),
            RowValue::Decimal(d) => d.hash(state),
            RowValue::Date(d) => d.hash(state),
            RowValue::Timestamp(ts) => ts.hash(state),
            RowValue::Enum(s) => s.hash(state),
            RowValue::Row(r) => r.hash(state),
            RowValue::Array(items) => items.hash(state),
            // Entry order is not significant, so only the size feeds the hash
            RowValue::Map(m) => m.len().hash(state),
        }
    }
}

impl RowValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, RowValue::Null)
    }

    /// Create an enumeration value from its symbol
    pub fn enum_symbol<S: AsRef<str>>(symbol: S) -> Self {
        RowValue::Enum(Arc::from(symbol.as_ref()))
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            RowValue::Null => "Null",
            RowValue::Boolean(_) => "Boolean",
            RowValue::Int16(_) => "Int16",
            RowValue::Int32(_) => "Int32",
            RowValue::Int64(_) => "Int64",
            RowValue::Float32(_) => "Float32",
            RowValue::Float64(_) => "Float64",
            RowValue::String(_) => "String",
            RowValue::Bytes(_) => "Bytes",
            RowValue::Decimal(_) => "Decimal",
            RowValue::Date(_) => "Date",
            RowValue::Timestamp(_) => "Timestamp",
            RowValue::Enum(_) => "Enum",
            RowValue::Row(_) => "Row",
            RowValue::Array(_) => "Array",
            RowValue::Map(_) => "Map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RowValue::String(s) | RowValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            RowValue::Row(r) => Some(r),
            _ => None,
        }
    }

    /// Label used for this value when it appears as a map key in an error path
    pub(crate) fn key_label(&self) -> String {
        match self {
            RowValue::String(s) | RowValue::Enum(s) => s.to_string(),
            RowValue::Boolean(b) => b.to_string(),
            RowValue::Int16(i) => i.to_string(),
            RowValue::Int32(i) => i.to_string(),
            RowValue::Int64(i) => i.to_string(),
            RowValue::Date(d) => d.to_string(),
            RowValue::Timestamp(ts) => ts.to_string(),
            other => format!("{:?}", other),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RowValue {
                fn from(v: $ty) -> Self {
                    RowValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    &str => String,
    String => String,
    Vec<u8> => Bytes,
    Bytes => Bytes,
    Decimal => Decimal,
    jiff::civil::Date => Date,
    jiff::Timestamp => Timestamp,
    Row => Row,
    Vec<RowValue> => Array,
    IndexMap<RowValue, RowValue> => Map,
}

impl<T: Into<RowValue>> From<Option<T>> for RowValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RowValue::Null, Into::into)
    }
}

/// An ordered sequence of values aligned positionally to a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<RowValue>,
}

impl std::hash::Hash for Row {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

impl Row {
    /// Start building a row for `schema`
    pub fn with_schema(schema: impl Into<Arc<Schema>>) -> RowBuilder {
        RowBuilder {
            schema: schema.into(),
            values: Vec::new(),
        }
    }

    /// Create a row, validating every value against its field
    pub fn new(schema: impl Into<Arc<Schema>>, values: Vec<RowValue>) -> Result<Self> {
        Row::with_schema(schema).add_values(values).build()
    }

    /// Assemble a row whose values were produced against `schema` already
    pub(crate) fn from_validated(schema: Arc<Schema>, values: Vec<RowValue>) -> Self {
        Row { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn values(&self) -> &[RowValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&RowValue> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&RowValue> {
        self.schema.index_of(name).and_then(|idx| self.values.get(idx))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<RowValue> {
        self.values
    }
}

/// Builder for creating rows
pub struct RowBuilder {
    schema: Arc<Schema>,
    values: Vec<RowValue>,
}

impl RowBuilder {
    pub fn add_value<V: Into<RowValue>>(mut self, value: V) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn add_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValue>,
    {
        self.values.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Row> {
        if self.values.len() != self.schema.len() {
            return Err(ConversionError::schema_mismatch(format!(
                "row has {} values but schema has {} fields",
                self.values.len(),
                self.schema.len()
            )));
        }

        for (value, field) in self.values.iter().zip(self.schema.fields()) {
            validate_value(value, field.field_type()).in_field(field.name())?;
        }

        Ok(Row {
            schema: self.schema,
            values: self.values,
        })
    }
}

/// Check that a value satisfies a field type, recursing into nested values
pub fn validate_value(value: &RowValue, field_type: &FieldType) -> Result<()> {
    use RowValue::*;

    // Null handling
    if value.is_null() {
        if !field_type.nullable {
            return Err(ConversionError::unexpected_null());
        }
        return Ok(());
    }

    match (value, &field_type.data_type) {
        (Boolean(_), DataType::Boolean)
        | (Int16(_), DataType::Int16)
        | (Int32(_), DataType::Int32)
        | (Int64(_), DataType::Int64)
        | (Float32(_), DataType::Float32)
        | (Float64(_), DataType::Float64)
        | (String(_), DataType::String)
        | (Bytes(_), DataType::Bytes)
        | (Date(_), DataType::Date)
        | (Timestamp(_), DataType::Timestamp) => Ok(()),

        (Bytes(b), DataType::FixedBytes { size, .. }) => {
            if b.len() != *size {
                return Err(ConversionError::size_mismatch(*size, b.len()));
            }
            Ok(())
        }

        (Decimal(d), DataType::Decimal { precision, scale }) => {
            if d.scale() != *scale {
                return Err(ConversionError::schema_mismatch(format!(
                    "decimal has scale {}, field declares scale {}",
                    d.scale(),
                    scale
                )));
            }
            if d.precision() > *precision {
                return Err(ConversionError::precision_loss(format!(
                    "{} needs {} digits, declared precision is {}",
                    d,
                    d.precision(),
                    precision
                )));
            }
            Ok(())
        }

        (Enum(symbol), DataType::Enum { symbols, .. }) => {
            if !symbols.iter().any(|s| s.as_str() == &**symbol) {
                return Err(ConversionError::unknown_enum_symbol(&**symbol, symbols));
            }
            Ok(())
        }

        // Nested rows were validated when they were built
        (Row(row), DataType::Row(schema)) => {
            if row.schema() != schema {
                return Err(ConversionError::schema_mismatch(
                    "nested row schema does not match the field schema",
                ));
            }
            Ok(())
        }

        (Array(items), DataType::Array(element)) => {
            for (idx, item) in items.iter().enumerate() {
                validate_value(item, element).at_index(idx)?;
            }
            Ok(())
        }

        (Map(entries), DataType::Map(key_type, value_type)) => {
            for (key, val) in entries {
                let label = key.key_label();
                validate_value(key, key_type).at_key(&label)?;
                validate_value(val, value_type).at_key(&label)?;
            }
            Ok(())
        }

        // Type mismatch
        (value, _) => Err(ConversionError::schema_mismatch(format!(
            "expected {}, got {}",
            field_type,
            value.type_name()
        ))),
    }
}
