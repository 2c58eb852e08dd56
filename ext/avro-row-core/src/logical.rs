//! Registry of logical types and their native encodings
//!
//! Each supported logical type (decimal, date, timestamp-millis, enumeration,
//! fixed bytes) is a [`LogicalCodec`] registered under its catalog name. The
//! type mapper asks the catalog for native schemas and generic types, the value
//! converter asks it to encode and decode values.

use crate::decimal::Decimal;
use crate::error::{ConversionError, Result};
use crate::schema::{DataType, NativeName};
use crate::value::RowValue;
use apache_avro::schema::Schema as AvroSchema;
use apache_avro::types::Value as AvroValue;
use bytes::Bytes;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{Span, Timestamp};
use num::Signed;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Catalog names of the standard logical types
pub mod names {
    pub const DECIMAL: &str = "decimal";
    pub const DATE: &str = "date";
    pub const TIMESTAMP_MILLIS: &str = "timestamp-millis";
    pub const ENUM: &str = "enum";
    pub const FIXED: &str = "fixed";
}

/// Day zero of native date values and millisecond zero of native timestamps
pub const EPOCH_DATE: Date = jiff::civil::date(1970, 1, 1);

/// Time zone used whenever a calendar date has to become an instant, or an
/// instant has to become a calendar date
pub const REFERENCE_TIME_ZONE: TimeZone = TimeZone::UTC;

/// Encode/decode pair for one logical type
pub trait LogicalCodec: Send + Sync {
    /// Catalog name, e.g. `"decimal"`
    fn name(&self) -> &'static str;

    /// Native schema JSON for a generic type. `name` is only used by named
    /// native types (enum, fixed).
    fn native_schema(&self, data_type: &DataType, name: &str) -> Result<serde_json::Value>;

    /// Generic data type for a native schema
    fn generic_type(&self, native: &AvroSchema) -> Result<DataType>;

    /// Generic value to native value, shaped by the target native schema
    fn encode(&self, value: &RowValue, native: &AvroSchema) -> Result<AvroValue>;

    /// Native value (described by `native`) to a generic value of `data_type`
    fn decode(&self, value: &AvroValue, native: &AvroSchema, data_type: &DataType)
        -> Result<RowValue>;
}

/// Read-only registry of logical type codecs keyed by name
pub struct LogicalTypeCatalog {
    codecs: HashMap<&'static str, Arc<dyn LogicalCodec>>,
}

impl LogicalTypeCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder {
            codecs: HashMap::new(),
        }
    }

    /// The process-wide catalog holding the standard logical types
    pub fn standard() -> Arc<LogicalTypeCatalog> {
        static STANDARD: OnceLock<Arc<LogicalTypeCatalog>> = OnceLock::new();
        STANDARD
            .get_or_init(|| Arc::new(LogicalTypeCatalog::builder().with_standard_types().build()))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<&dyn LogicalCodec> {
        self.codecs.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// Registered names in alphabetical order
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.codecs.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Codec responsible for a generic data type, if the type is a logical one
    pub fn for_generic(&self, data_type: &DataType) -> Result<Option<&dyn LogicalCodec>> {
        match data_type.logical_name() {
            Some(name) => self.require(name).map(Some),
            None => Ok(None),
        }
    }

    /// Codec responsible for a native schema, if the schema is a logical one
    pub fn for_native(&self, native: &AvroSchema) -> Result<Option<&dyn LogicalCodec>> {
        match native_logical_name(native) {
            Some(name) => self.require(name).map(Some),
            None => Ok(None),
        }
    }

    fn require(&self, name: &str) -> Result<&dyn LogicalCodec> {
        self.get(name).ok_or_else(|| {
            ConversionError::unsupported(format!("logical type '{}' is not registered", name))
        })
    }
}

impl std::fmt::Debug for LogicalTypeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalTypeCatalog")
            .field("codecs", &self.names())
            .finish()
    }
}

/// Builder for logical type catalogs
pub struct CatalogBuilder {
    codecs: HashMap<&'static str, Arc<dyn LogicalCodec>>,
}

impl CatalogBuilder {
    /// Register a codec, replacing any codec already registered under its name
    pub fn register<C: LogicalCodec + 'static>(mut self, codec: C) -> Self {
        tracing::trace!(name = codec.name(), "registering logical type codec");
        self.codecs.insert(codec.name(), Arc::new(codec));
        self
    }

    pub fn with_standard_types(self) -> Self {
        self.register(DecimalCodec)
            .register(DateCodec)
            .register(TimestampMillisCodec)
            .register(EnumCodec)
            .register(FixedCodec)
    }

    pub fn build(self) -> LogicalTypeCatalog {
        LogicalTypeCatalog {
            codecs: self.codecs,
        }
    }
}

/// Catalog name for a native schema carrying a logical or named type
pub fn native_logical_name(native: &AvroSchema) -> Option<&'static str> {
    match native {
        AvroSchema::Decimal(_) => Some(names::DECIMAL),
        AvroSchema::Date => Some(names::DATE),
        AvroSchema::TimestampMillis | AvroSchema::TimestampMicros | AvroSchema::TimestampNanos => {
            Some(names::TIMESTAMP_MILLIS)
        }
        AvroSchema::Enum(_) => Some(names::ENUM),
        AvroSchema::Fixed(_) => Some(names::FIXED),
        _ => None,
    }
}

/// Short description of a native value's shape, for error messages
pub fn native_kind(value: &AvroValue) -> &'static str {
    match value {
        AvroValue::Null => "null",
        AvroValue::Boolean(_) => "boolean",
        AvroValue::Int(_) => "int",
        AvroValue::Long(_) => "long",
        AvroValue::Float(_) => "float",
        AvroValue::Double(_) => "double",
        AvroValue::Bytes(_) => "bytes",
        AvroValue::String(_) => "string",
        AvroValue::Fixed(_, _) => "fixed",
        AvroValue::Enum(_, _) => "enum",
        AvroValue::Union(_, _) => "union",
        AvroValue::Array(_) => "array",
        AvroValue::Map(_) => "map",
        AvroValue::Record(_) => "record",
        AvroValue::Date(_) => "date",
        AvroValue::Decimal(_) => "decimal",
        AvroValue::TimestampMillis(_) => "timestamp-millis",
        AvroValue::TimestampMicros(_) => "timestamp-micros",
        AvroValue::TimestampNanos(_) => "timestamp-nanos",
        _ => "unsupported native value",
    }
}

fn unexpected_native(expected: &str, value: &AvroValue) -> ConversionError {
    ConversionError::schema_mismatch(format!(
        "expected native {}, got {}",
        expected,
        native_kind(value)
    ))
}

fn unexpected_generic(expected: &str, value: &RowValue) -> ConversionError {
    ConversionError::schema_mismatch(format!(
        "expected {} value, got {}",
        expected,
        value.type_name()
    ))
}

// Temporal helpers

/// Days between [`EPOCH_DATE`] and `date`
pub fn days_since_epoch(date: Date) -> Result<i32> {
    let span = date
        .since(EPOCH_DATE)
        .map_err(|e| ConversionError::invalid_value(format!("date {}: {}", date, e)))?;
    Ok(span.get_days())
}

/// Calendar date `days` days after [`EPOCH_DATE`]
pub fn date_from_days(days: i32) -> Result<Date> {
    Span::new()
        .try_days(days)
        .and_then(|span| EPOCH_DATE.checked_add(span))
        .map_err(|e| ConversionError::invalid_value(format!("day count {}: {}", days, e)))
}

/// Milliseconds since the epoch, rounding sub-millisecond instants down
pub fn timestamp_millis(ts: Timestamp) -> i64 {
    ts.as_nanosecond().div_euclid(1_000_000) as i64
}

pub fn timestamp_from_millis(millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis)
        .map_err(|e| ConversionError::invalid_value(format!("timestamp {} ms: {}", millis, e)))
}

/// The first instant of `date` in [`REFERENCE_TIME_ZONE`]
pub fn start_of_day(date: Date) -> Result<Timestamp> {
    date.to_zoned(REFERENCE_TIME_ZONE)
        .map(|zoned| zoned.timestamp())
        .map_err(|e| ConversionError::invalid_value(format!("date {}: {}", date, e)))
}

/// Calendar date of an instant in [`REFERENCE_TIME_ZONE`]
pub fn date_of(ts: Timestamp) -> Date {
    ts.to_zoned(REFERENCE_TIME_ZONE).date()
}

fn checked_scale(millis: i64, factor: i64) -> Result<i64> {
    millis.checked_mul(factor).ok_or_else(|| {
        ConversionError::invalid_value(format!("timestamp {} ms overflows the native unit", millis))
    })
}

/// A native temporal value: either a calendar date or an instant
enum Temporal {
    Day(Date),
    Instant(Timestamp),
}

impl Temporal {
    fn from_native(value: &AvroValue, native: &AvroSchema) -> Result<Self> {
        match value {
            AvroValue::Date(days) => Ok(Temporal::Day(date_from_days(*days)?)),
            AvroValue::Int(days) if matches!(native, AvroSchema::Date) => {
                Ok(Temporal::Day(date_from_days(*days)?))
            }
            AvroValue::TimestampMillis(ms) => Ok(Temporal::Instant(timestamp_from_millis(*ms)?)),
            AvroValue::TimestampMicros(us) => Ok(Temporal::Instant(timestamp_from_millis(
                us.div_euclid(1_000),
            )?)),
            AvroValue::TimestampNanos(ns) => Ok(Temporal::Instant(timestamp_from_millis(
                ns.div_euclid(1_000_000),
            )?)),
            AvroValue::Long(raw) => {
                let millis = match native {
                    AvroSchema::TimestampMicros => raw.div_euclid(1_000),
                    AvroSchema::TimestampNanos => raw.div_euclid(1_000_000),
                    _ => *raw,
                };
                Ok(Temporal::Instant(timestamp_from_millis(millis)?))
            }
            other => Err(unexpected_native("date or timestamp", other)),
        }
    }

    fn from_generic(value: &RowValue) -> Result<Self> {
        match value {
            RowValue::Date(d) => Ok(Temporal::Day(*d)),
            RowValue::Timestamp(ts) => Ok(Temporal::Instant(*ts)),
            other => Err(unexpected_generic("date or timestamp", other)),
        }
    }

    fn into_date(self) -> Date {
        match self {
            Temporal::Day(d) => d,
            Temporal::Instant(ts) => date_of(ts),
        }
    }

    fn into_timestamp(self) -> Result<Timestamp> {
        match self {
            Temporal::Day(d) => start_of_day(d),
            Temporal::Instant(ts) => Ok(ts),
        }
    }

    fn into_generic(self, data_type: &DataType) -> Result<RowValue> {
        match data_type {
            DataType::Date => Ok(RowValue::Date(self.into_date())),
            DataType::Timestamp => Ok(RowValue::Timestamp(self.into_timestamp()?)),
            other => Err(ConversionError::schema_mismatch(format!(
                "temporal value cannot become {}",
                other
            ))),
        }
    }
}

/// `decimal(precision, scale)` over native bytes or fixed
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalCodec;

impl LogicalCodec for DecimalCodec {
    fn name(&self) -> &'static str {
        names::DECIMAL
    }

    fn native_schema(&self, data_type: &DataType, _name: &str) -> Result<serde_json::Value> {
        match data_type {
            DataType::Decimal { precision, scale } => Ok(json!({
                "type": "bytes",
                "logicalType": "decimal",
                "precision": precision,
                "scale": scale,
            })),
            other => Err(ConversionError::unsupported(format!(
                "decimal codec cannot map {}",
                other
            ))),
        }
    }

    fn generic_type(&self, native: &AvroSchema) -> Result<DataType> {
        match native {
            AvroSchema::Decimal(decimal) => Ok(DataType::Decimal {
                precision: decimal.precision as u32,
                scale: decimal.scale as u32,
            }),
            _ => Err(ConversionError::unsupported("decimal codec expects a decimal schema")),
        }
    }

    fn encode(&self, value: &RowValue, native: &AvroSchema) -> Result<AvroValue> {
        let AvroSchema::Decimal(schema) = native else {
            return Err(ConversionError::schema_mismatch(
                "decimal value needs a native decimal schema",
            ));
        };
        let RowValue::Decimal(decimal) = value else {
            return Err(unexpected_generic("decimal", value));
        };

        let fitted = decimal.fit(schema.precision as u32, schema.scale as u32)?;
        let mut bytes = fitted.to_be_bytes();

        if let AvroSchema::Fixed(fixed) = schema.inner.as_ref() {
            if bytes.len() > fixed.size {
                return Err(ConversionError::size_mismatch(fixed.size, bytes.len()));
            }
            // Sign-extend to the fixed width
            let fill = if fitted.unscaled().is_negative() { 0xff } else { 0x00 };
            let mut padded = vec![fill; fixed.size - bytes.len()];
            padded.append(&mut bytes);
            bytes = padded;
        }

        Ok(AvroValue::Decimal(apache_avro::Decimal::from(bytes)))
    }

    fn decode(
        &self,
        value: &AvroValue,
        native: &AvroSchema,
        data_type: &DataType,
    ) -> Result<RowValue> {
        let DataType::Decimal { precision, scale } = data_type else {
            return Err(ConversionError::schema_mismatch(format!(
                "decimal value cannot become {}",
                data_type
            )));
        };
        let native_scale = match native {
            AvroSchema::Decimal(schema) => schema.scale as u32,
            _ => *scale,
        };

        let bytes: Vec<u8> = match value {
            AvroValue::Decimal(d) => Vec::<u8>::try_from(d)?,
            AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => b.clone(),
            other => return Err(unexpected_native("decimal", other)),
        };

        let decimal = Decimal::from_be_bytes(&bytes, native_scale).fit(*precision, *scale)?;
        Ok(RowValue::Decimal(decimal))
    }
}

/// `date`: days since [`EPOCH_DATE`] as a native int
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl LogicalCodec for DateCodec {
    fn name(&self) -> &'static str {
        names::DATE
    }

    fn native_schema(&self, _data_type: &DataType, _name: &str) -> Result<serde_json::Value> {
        Ok(json!({ "type": "int", "logicalType": "date" }))
    }

    fn generic_type(&self, _native: &AvroSchema) -> Result<DataType> {
        Ok(DataType::Date)
    }

    fn encode(&self, value: &RowValue, _native: &AvroSchema) -> Result<AvroValue> {
        let date = Temporal::from_generic(value)?.into_date();
        Ok(AvroValue::Date(days_since_epoch(date)?))
    }

    fn decode(
        &self,
        value: &AvroValue,
        native: &AvroSchema,
        data_type: &DataType,
    ) -> Result<RowValue> {
        Temporal::from_native(value, native)?.into_generic(data_type)
    }
}

/// `timestamp-millis`: milliseconds since the epoch as a native long.
///
/// Native `timestamp-micros` and `timestamp-nanos` values are read too, and
/// truncated to milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampMillisCodec;

impl LogicalCodec for TimestampMillisCodec {
    fn name(&self) -> &'static str {
        names::TIMESTAMP_MILLIS
    }

    fn native_schema(&self, _data_type: &DataType, _name: &str) -> Result<serde_json::Value> {
        Ok(json!({ "type": "long", "logicalType": "timestamp-millis" }))
    }

    fn generic_type(&self, _native: &AvroSchema) -> Result<DataType> {
        Ok(DataType::Timestamp)
    }

    fn encode(&self, value: &RowValue, native: &AvroSchema) -> Result<AvroValue> {
        let millis = timestamp_millis(Temporal::from_generic(value)?.into_timestamp()?);
        match native {
            AvroSchema::TimestampMicros => Ok(AvroValue::TimestampMicros(checked_scale(
                millis, 1_000,
            )?)),
            AvroSchema::TimestampNanos => Ok(AvroValue::TimestampNanos(checked_scale(
                millis, 1_000_000,
            )?)),
            _ => Ok(AvroValue::TimestampMillis(millis)),
        }
    }

    fn decode(
        &self,
        value: &AvroValue,
        native: &AvroSchema,
        data_type: &DataType,
    ) -> Result<RowValue> {
        Temporal::from_native(value, native)?.into_generic(data_type)
    }
}

/// `enum`: an ordinal/symbol pair checked against the declared symbols
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumCodec;

impl LogicalCodec for EnumCodec {
    fn name(&self) -> &'static str {
        names::ENUM
    }

    fn native_schema(&self, data_type: &DataType, name: &str) -> Result<serde_json::Value> {
        match data_type {
            DataType::Enum { symbols, .. } => Ok(json!({
                "type": "enum",
                "name": name,
                "symbols": symbols,
            })),
            other => Err(ConversionError::unsupported(format!(
                "enum codec cannot map {}",
                other
            ))),
        }
    }

    fn generic_type(&self, native: &AvroSchema) -> Result<DataType> {
        match native {
            AvroSchema::Enum(schema) => Ok(DataType::Enum {
                symbols: schema.symbols.clone(),
                name: NativeName::new(schema.name.fullname(None)),
            }),
            _ => Err(ConversionError::unsupported("enum codec expects an enum schema")),
        }
    }

    fn encode(&self, value: &RowValue, native: &AvroSchema) -> Result<AvroValue> {
        let AvroSchema::Enum(schema) = native else {
            return Err(ConversionError::schema_mismatch(
                "enum value needs a native enum schema",
            ));
        };
        let symbol = match value {
            RowValue::Enum(s) | RowValue::String(s) => s,
            other => return Err(unexpected_generic("enum", other)),
        };

        let ordinal = schema
            .symbols
            .iter()
            .position(|s| s.as_str() == &**symbol)
            .ok_or_else(|| ConversionError::unknown_enum_symbol(&**symbol, &schema.symbols))?;
        Ok(AvroValue::Enum(ordinal as u32, symbol.to_string()))
    }

    fn decode(
        &self,
        value: &AvroValue,
        native: &AvroSchema,
        data_type: &DataType,
    ) -> Result<RowValue> {
        let DataType::Enum { symbols, .. } = data_type else {
            return Err(ConversionError::schema_mismatch(format!(
                "enum value cannot become {}",
                data_type
            )));
        };

        let symbol = match value {
            AvroValue::Enum(_, s) | AvroValue::String(s) => s.clone(),
            AvroValue::Int(ordinal) => match native {
                AvroSchema::Enum(schema) => usize::try_from(*ordinal)
                    .ok()
                    .and_then(|i| schema.symbols.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        ConversionError::unknown_enum_symbol(ordinal.to_string(), &schema.symbols)
                    })?,
                _ => return Err(unexpected_native("enum", value)),
            },
            other => return Err(unexpected_native("enum", other)),
        };

        if !symbols.contains(&symbol) {
            return Err(ConversionError::unknown_enum_symbol(symbol, symbols));
        }
        Ok(RowValue::enum_symbol(symbol))
    }
}

/// `fixed`: byte sequences of exactly the declared size
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCodec;

impl LogicalCodec for FixedCodec {
    fn name(&self) -> &'static str {
        names::FIXED
    }

    fn native_schema(&self, data_type: &DataType, name: &str) -> Result<serde_json::Value> {
        match data_type {
            DataType::FixedBytes { size, .. } => Ok(json!({
                "type": "fixed",
                "name": name,
                "size": size,
            })),
            other => Err(ConversionError::unsupported(format!(
                "fixed codec cannot map {}",
                other
            ))),
        }
    }

    fn generic_type(&self, native: &AvroSchema) -> Result<DataType> {
        match native {
            AvroSchema::Fixed(schema) => Ok(DataType::FixedBytes {
                size: schema.size,
                name: NativeName::new(schema.name.fullname(None)),
            }),
            _ => Err(ConversionError::unsupported("fixed codec expects a fixed schema")),
        }
    }

    fn encode(&self, value: &RowValue, native: &AvroSchema) -> Result<AvroValue> {
        let AvroSchema::Fixed(schema) = native else {
            return Err(ConversionError::schema_mismatch(
                "fixed value needs a native fixed schema",
            ));
        };
        let RowValue::Bytes(bytes) = value else {
            return Err(unexpected_generic("fixed bytes", value));
        };

        if bytes.len() != schema.size {
            return Err(ConversionError::size_mismatch(schema.size, bytes.len()));
        }
        Ok(AvroValue::Fixed(schema.size, bytes.to_vec()))
    }

    fn decode(
        &self,
        value: &AvroValue,
        _native: &AvroSchema,
        data_type: &DataType,
    ) -> Result<RowValue> {
        let DataType::FixedBytes { size, .. } = data_type else {
            return Err(ConversionError::schema_mismatch(format!(
                "fixed value cannot become {}",
                data_type
            )));
        };

        let bytes = match value {
            AvroValue::Fixed(_, b) | AvroValue::Bytes(b) => b,
            other => return Err(unexpected_native("fixed", other)),
        };
        if bytes.len() != *size {
            return Err(ConversionError::size_mismatch(*size, bytes.len()));
        }
        Ok(RowValue::Bytes(Bytes::copy_from_slice(bytes)))
    }
}
