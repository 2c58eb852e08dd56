use crate::descriptor::{HostType, RecordDescriptor};
use apache_avro::schema::RecordSchema;
use avro_row_core::logical::{
    date_from_days, date_of, days_since_epoch, native_kind, start_of_day, timestamp_from_millis,
    timestamp_millis,
};
use avro_row_core::{
    AvroSchema, AvroValue, ConversionError, DataType, Decimal, ErrorContext, NativeNames,
    RecordAdapter, Result, RowValue, TypeMapper, ValueConverter,
};
use bytes::Bytes;
use jiff::civil::Date;
use jiff::Timestamp;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

static OPAQUE: HostType = HostType::Opaque;
static MISSING: AvroValue = AvroValue::Null;

/// "Specific record" representation: typed host structs, moved to and from
/// native values through their serde form.
///
/// Host values are serialized with `apache_avro::to_value`, which keeps
/// every scalar (non-finite floats included) intact. The resulting tree is
/// keyed by declared field names; this adapter reshapes it into a native
/// record keyed by exposed names, and back. Excluded fields are never
/// written and are left out on read so serde can fill in their defaults.
///
/// Leaf values are converted by declared host type as well as target type:
/// with a DATE override an integer host field carries days since the epoch,
/// with a TIMESTAMP override it carries milliseconds since the epoch, and
/// `Date`/`Timestamp` host fields convert to each other at the start of the
/// day in the reference time zone.
pub struct SpecificRecordAdapter<T> {
    descriptor: Arc<RecordDescriptor>,
    mapper: TypeMapper,
    values: ValueConverter,
    _host: PhantomData<fn() -> T>,
}

impl<T> SpecificRecordAdapter<T> {
    pub fn new(descriptor: Arc<RecordDescriptor>) -> Self {
        Self {
            descriptor,
            mapper: TypeMapper::new(),
            values: ValueConverter::new(),
            _host: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &RecordDescriptor {
        &self.descriptor
    }

    /// Serialized host record to a native record shaped by `schema`
    pub fn host_to_native(&self, host: &AvroValue, schema: &AvroSchema) -> Result<AvroValue> {
        let names = NativeNames::collect(schema);
        let record = record_schema(names.resolve(schema)?)?;
        self.native_record(host, Some(self.descriptor.as_ref()), record, &names)
    }

    /// Native record to the serialized form of a host record
    pub fn native_to_host(&self, value: &AvroValue, schema: &AvroSchema) -> Result<AvroValue> {
        let names = NativeNames::collect(schema);
        let record = record_schema(names.resolve(schema)?)?;
        let fields = match strip_union(value) {
            AvroValue::Record(fields) => fields,
            other => {
                return Err(ConversionError::schema_mismatch(format!(
                    "expected native record, got {}",
                    native_kind(other)
                )))
            }
        };
        self.host_record(fields, Some(self.descriptor.as_ref()), record, &names)
    }

    fn native_record(
        &self,
        host: &AvroValue,
        descriptor: Option<&RecordDescriptor>,
        record: &RecordSchema,
        names: &NativeNames,
    ) -> Result<AvroValue> {
        let host_fields = match strip_union(host) {
            AvroValue::Record(fields) => fields,
            other => return Err(unexpected_host("struct", other)),
        };

        let mut fields = Vec::with_capacity(record.fields.len());
        for native_field in &record.fields {
            let (key, host_type) = host_field(descriptor, &native_field.name);
            let value = host_fields
                .iter()
                .find(|(name, _)| name.as_str() == key)
                .map(|(_, value)| value)
                .unwrap_or(&MISSING);
            let native = self
                .native_value(value, host_type, &native_field.schema, names)
                .in_field(&native_field.name)?;
            fields.push((native_field.name.clone(), native));
        }
        Ok(AvroValue::Record(fields))
    }

    fn native_value(
        &self,
        host: &AvroValue,
        host_type: &HostType,
        native: &AvroSchema,
        names: &NativeNames,
    ) -> Result<AvroValue> {
        let native = names.resolve(native)?;
        let host = strip_union(host);

        if let AvroSchema::Union(union) = native {
            let variants = union.variants();
            if let AvroValue::Null = host {
                let idx = variants
                    .iter()
                    .position(|v| matches!(v, AvroSchema::Null))
                    .ok_or_else(ConversionError::unexpected_null)?;
                return Ok(AvroValue::Union(idx as u32, Box::new(AvroValue::Null)));
            }
            let (idx, branch) = non_null_branch(variants)?;
            let inner = self.native_value(host, host_type.without_optional(), branch, names)?;
            return Ok(AvroValue::Union(idx as u32, Box::new(inner)));
        }

        if let AvroValue::Null = host {
            return Err(ConversionError::unexpected_null());
        }

        match native {
            AvroSchema::Record(record) => {
                self.native_record(host, record_descriptor(host_type), record, names)
            }
            AvroSchema::Array(array) => {
                let AvroValue::Array(items) = host else {
                    return Err(unexpected_host("sequence", host));
                };
                let element = element_host(host_type);
                let mut converted = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    converted.push(
                        self.native_value(item, element, &array.items, names)
                            .at_index(idx)?,
                    );
                }
                Ok(AvroValue::Array(converted))
            }
            AvroSchema::Map(map) => {
                let AvroValue::Map(entries) = host else {
                    return Err(unexpected_host("map", host));
                };
                let value_host = element_host(host_type);
                let mut converted = HashMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    let native = self
                        .native_value(entry, value_host, &map.types, names)
                        .at_key(key)?;
                    converted.insert(key.clone(), native);
                }
                Ok(AvroValue::Map(converted))
            }
            leaf => {
                let field_type = self.mapper.to_generic(leaf)?;
                let value =
                    generic_scalar(host, host_type.without_optional(), &field_type.data_type)?;
                self.values.to_native(&value, &field_type, leaf)
            }
        }
    }

    fn host_record(
        &self,
        fields: &[(String, AvroValue)],
        descriptor: Option<&RecordDescriptor>,
        record: &RecordSchema,
        names: &NativeNames,
    ) -> Result<AvroValue> {
        let mut host = Vec::with_capacity(record.fields.len());
        for native_field in &record.fields {
            let value = fields
                .iter()
                .find(|(name, _)| *name == native_field.name)
                .map(|(_, value)| value)
                .ok_or_else(|| {
                    ConversionError::schema_mismatch(format!(
                        "native record has no value for field '{}'",
                        native_field.name
                    ))
                })
                .in_field(&native_field.name)?;

            let (key, host_type) = host_field(descriptor, &native_field.name);
            let converted = self
                .host_value(value, host_type, &native_field.schema, names)
                .in_field(&native_field.name)?;
            host.push((key.to_string(), converted));
        }
        Ok(AvroValue::Record(host))
    }

    fn host_value(
        &self,
        value: &AvroValue,
        host_type: &HostType,
        native: &AvroSchema,
        names: &NativeNames,
    ) -> Result<AvroValue> {
        let value = strip_union(value);
        if let AvroValue::Null = value {
            return host_null(host_type);
        }

        let native = match names.resolve(native)? {
            AvroSchema::Union(union) => names.resolve(non_null_branch(union.variants())?.1)?,
            other => other,
        };
        let present = self.host_present(value, host_type.without_optional(), native, names)?;

        // serde reads `Option` only from a union
        if host_type.is_optional() {
            return Ok(AvroValue::Union(1, Box::new(present)));
        }
        Ok(present)
    }

    fn host_present(
        &self,
        value: &AvroValue,
        host_type: &HostType,
        native: &AvroSchema,
        names: &NativeNames,
    ) -> Result<AvroValue> {
        match (value, native) {
            (AvroValue::Record(fields), AvroSchema::Record(record)) => {
                self.host_record(fields, record_descriptor(host_type), record, names)
            }
            (AvroValue::Array(items), AvroSchema::Array(array)) => {
                let element = element_host(host_type);
                let mut converted = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    converted.push(
                        self.host_value(item, element, &array.items, names)
                            .at_index(idx)?,
                    );
                }
                Ok(AvroValue::Array(converted))
            }
            (AvroValue::Map(entries), AvroSchema::Map(map)) => {
                let value_host = element_host(host_type);
                let mut converted = HashMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    let host = self
                        .host_value(entry, value_host, &map.types, names)
                        .at_key(key)?;
                    converted.insert(key.clone(), host);
                }
                Ok(AvroValue::Map(converted))
            }
            (leaf, schema) => {
                let field_type = self.mapper.to_generic(schema)?;
                let value = self.values.to_generic(leaf, schema, &field_type)?;
                host_scalar(value, host_type, &field_type.data_type)
            }
        }
    }
}

impl<T> Clone for SpecificRecordAdapter<T> {
    fn clone(&self) -> Self {
        Self::new(self.descriptor.clone())
    }
}

impl<T> std::fmt::Debug for SpecificRecordAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecificRecordAdapter")
            .field("record", &self.descriptor.name)
            .finish()
    }
}

impl<T> RecordAdapter for SpecificRecordAdapter<T>
where
    T: Serialize + DeserializeOwned,
{
    type Record = T;

    fn to_native(&self, record: &T, schema: &AvroSchema) -> Result<AvroValue> {
        let host = apache_avro::to_value(record).map_err(host_error)?;
        self.host_to_native(&host, schema)
    }

    fn from_native(&self, value: AvroValue, schema: &AvroSchema) -> Result<T> {
        let host = self.native_to_host(&value, schema)?;
        apache_avro::from_value(&host).map_err(host_error)
    }
}

fn host_error(err: apache_avro::Error) -> ConversionError {
    ConversionError::invalid_value(format!("host value does not fit its serde form: {}", err))
}

fn record_schema(schema: &AvroSchema) -> Result<&RecordSchema> {
    match schema {
        AvroSchema::Record(record) => Ok(record),
        _ => Err(ConversionError::schema_mismatch(
            "native schema of a record must be a record schema",
        )),
    }
}

/// Serde key and declared host type of the field exposed as `exposed`
fn host_field<'a>(
    descriptor: Option<&'a RecordDescriptor>,
    exposed: &'a str,
) -> (&'a str, &'a HostType) {
    match descriptor.and_then(|d| d.by_exposed_name(exposed)) {
        Some(field) => (field.name.as_str(), &field.host_type),
        None => (exposed, &OPAQUE),
    }
}

fn record_descriptor(host: &HostType) -> Option<&RecordDescriptor> {
    match host.without_optional() {
        HostType::Record(descriptor) => Some(descriptor),
        _ => None,
    }
}

fn element_host(host: &HostType) -> &HostType {
    match host.without_optional() {
        HostType::List(element) | HostType::Map(element) => element,
        _ => &OPAQUE,
    }
}

fn non_null_branch(variants: &[AvroSchema]) -> Result<(usize, &AvroSchema)> {
    variants
        .iter()
        .enumerate()
        .find(|(_, v)| !matches!(v, AvroSchema::Null))
        .ok_or_else(|| ConversionError::schema_mismatch("union has no non-null branch"))
}

/// Serde wraps every `Option` in a union; the content is what matters here
fn strip_union(value: &AvroValue) -> &AvroValue {
    match value {
        AvroValue::Union(_, inner) => strip_union(inner),
        other => other,
    }
}

fn host_null(host_type: &HostType) -> Result<AvroValue> {
    match host_type {
        HostType::Optional(_) | HostType::Opaque => {
            Ok(AvroValue::Union(0, Box::new(AvroValue::Null)))
        }
        _ => Err(ConversionError::unexpected_null()),
    }
}

fn unexpected_host(expected: &str, value: &AvroValue) -> ConversionError {
    ConversionError::schema_mismatch(format!(
        "expected {} host value, got {}",
        expected,
        native_kind(value)
    ))
}

fn parse<V>(text: &str) -> Result<V>
where
    V: FromStr,
    V::Err: Display,
{
    text.parse()
        .map_err(|e| ConversionError::invalid_value(format!("'{}': {}", text, e)))
}

fn narrow(value: i64) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| ConversionError::invalid_value(format!("{} does not fit in 32 bits", value)))
}

/// `Vec<u8>` and `[u8; N]` serialize as sequences of small integers
fn byte_sequence(items: &[AvroValue]) -> Result<Bytes> {
    items
        .iter()
        .map(|item| match item {
            AvroValue::Int(i) => u8::try_from(*i)
                .map_err(|_| ConversionError::invalid_value(format!("{} is not a byte", i))),
            other => Err(unexpected_host("byte", other)),
        })
        .collect::<Result<Vec<u8>>>()
        .map(Bytes::from)
}

/// Serialized host scalar to the generic value of `data_type`
fn generic_scalar(host: &AvroValue, host_type: &HostType, data_type: &DataType) -> Result<RowValue> {
    let value = match (data_type, host) {
        (DataType::Boolean, AvroValue::Boolean(b)) => RowValue::Boolean(*b),

        (DataType::Int16 | DataType::Int32, AvroValue::Int(i)) => RowValue::Int32(*i),
        (DataType::Int16 | DataType::Int32, AvroValue::Long(l)) => RowValue::Int32(narrow(*l)?),
        (DataType::Int64, AvroValue::Int(i)) => RowValue::Int64(i64::from(*i)),
        (DataType::Int64, AvroValue::Long(l)) => RowValue::Int64(*l),

        (DataType::Float32, AvroValue::Float(f)) => RowValue::from(*f),
        (DataType::Float32, AvroValue::Double(d)) => RowValue::from(*d as f32),
        (DataType::Float64, AvroValue::Float(f)) => RowValue::from(f64::from(*f)),
        (DataType::Float64, AvroValue::Double(d)) => RowValue::from(*d),

        (DataType::String, AvroValue::String(s) | AvroValue::Enum(_, s)) => {
            RowValue::from(s.as_str())
        }
        (DataType::Enum { .. }, AvroValue::String(s) | AvroValue::Enum(_, s)) => {
            RowValue::enum_symbol(s)
        }

        (
            DataType::Bytes | DataType::FixedBytes { .. },
            AvroValue::Bytes(b) | AvroValue::Fixed(_, b),
        ) => RowValue::Bytes(Bytes::copy_from_slice(b)),
        (DataType::Bytes | DataType::FixedBytes { .. }, AvroValue::Array(items)) => {
            RowValue::Bytes(byte_sequence(items)?)
        }

        (DataType::Decimal { .. }, AvroValue::String(s)) => RowValue::Decimal(s.parse()?),
        (DataType::Decimal { .. }, AvroValue::Int(i)) => RowValue::Decimal(Decimal::new(*i, 0)),
        (DataType::Decimal { .. }, AvroValue::Long(l)) => RowValue::Decimal(Decimal::new(*l, 0)),

        (DataType::Date, AvroValue::Int(days)) => RowValue::Date(date_from_days(*days)?),
        (DataType::Date, AvroValue::Long(days)) => RowValue::Date(date_from_days(narrow(*days)?)?),
        (DataType::Date, AvroValue::String(s)) => RowValue::Date(match host_type {
            HostType::Timestamp => date_of(parse::<Timestamp>(s)?),
            _ => parse::<Date>(s)?,
        }),

        (DataType::Timestamp, AvroValue::Int(millis)) => {
            RowValue::Timestamp(timestamp_from_millis(i64::from(*millis))?)
        }
        (DataType::Timestamp, AvroValue::Long(millis)) => {
            RowValue::Timestamp(timestamp_from_millis(*millis)?)
        }
        (DataType::Timestamp, AvroValue::String(s)) => RowValue::Timestamp(match host_type {
            HostType::Date => start_of_day(parse::<Date>(s)?)?,
            _ => parse::<Timestamp>(s)?,
        }),

        (data_type, other) => {
            return Err(ConversionError::schema_mismatch(format!(
                "cannot convert host {} to {}",
                native_kind(other),
                data_type
            )))
        }
    };
    Ok(value)
}

/// Integer in the width of the declared host type
fn integer_host(value: i64, host_type: &HostType) -> Result<AvroValue> {
    let (min, max) = match host_type {
        HostType::I64 => return Ok(AvroValue::Long(value)),
        HostType::I8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
        HostType::I16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
        HostType::I32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
        _ => {
            return Ok(match i32::try_from(value) {
                Ok(i) => AvroValue::Int(i),
                Err(_) => AvroValue::Long(value),
            })
        }
    };
    if value < min || value > max {
        return Err(ConversionError::invalid_value(format!(
            "{} does not fit in the host field's {:?}",
            value, host_type
        )));
    }
    Ok(AvroValue::Int(value as i32))
}

/// Generic scalar to the serialized form of its declared host type
fn host_scalar(value: RowValue, host_type: &HostType, data_type: &DataType) -> Result<AvroValue> {
    let host = match value {
        RowValue::Boolean(b) => AvroValue::Boolean(b),
        RowValue::Int16(i) => integer_host(i64::from(i), host_type)?,
        RowValue::Int32(i) => integer_host(i64::from(i), host_type)?,
        RowValue::Int64(l) => integer_host(l, host_type)?,
        RowValue::Float32(f) => match host_type {
            HostType::F64 => AvroValue::Double(f64::from(f.into_inner())),
            _ => AvroValue::Float(f.into_inner()),
        },
        RowValue::Float64(d) => match host_type {
            HostType::F32 => AvroValue::Float(d.into_inner() as f32),
            _ => AvroValue::Double(d.into_inner()),
        },
        RowValue::String(s) => AvroValue::String(s.to_string()),
        RowValue::Enum(symbol) => match (host_type, data_type) {
            (HostType::String, _) => AvroValue::String(symbol.to_string()),
            (_, DataType::Enum { symbols, .. }) => {
                let ordinal = symbols
                    .iter()
                    .position(|s| s.as_str() == &*symbol)
                    .ok_or_else(|| ConversionError::unknown_enum_symbol(&*symbol, symbols))?;
                AvroValue::Enum(ordinal as u32, symbol.to_string())
            }
            _ => AvroValue::String(symbol.to_string()),
        },
        RowValue::Bytes(b) => match host_type {
            HostType::Opaque => AvroValue::Bytes(b.to_vec()),
            _ => AvroValue::Array(b.iter().map(|&byte| AvroValue::Int(i32::from(byte))).collect()),
        },
        RowValue::Decimal(d) => AvroValue::String(d.to_string()),
        RowValue::Date(d) => match host_type {
            HostType::I8 | HostType::I16 | HostType::I32 | HostType::I64 => {
                integer_host(i64::from(days_since_epoch(d)?), host_type)?
            }
            HostType::Timestamp => AvroValue::String(start_of_day(d)?.to_string()),
            _ => AvroValue::String(d.to_string()),
        },
        RowValue::Timestamp(ts) => match host_type {
            HostType::I8 | HostType::I16 | HostType::I32 | HostType::I64 => {
                integer_host(timestamp_millis(ts), host_type)?
            }
            HostType::Date => AvroValue::String(date_of(ts).to_string()),
            _ => AvroValue::String(ts.to_string()),
        },
        other => {
            return Err(ConversionError::unsupported(format!(
                "{} is not a scalar host value",
                other.type_name()
            )))
        }
    };
    Ok(host)
}
