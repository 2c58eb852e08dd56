use crate::error::{ConversionError, ErrorContext, Result};
use crate::logical::{native_kind, LogicalTypeCatalog};
use crate::schema::{DataType, FieldType, Schema};
use crate::value::{Row, RowValue};
use apache_avro::schema::{RecordSchema, Schema as AvroSchema};
use apache_avro::types::Value as AvroValue;
use bytes::Bytes;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::collections::HashMap;
use std::sync::Arc;

/// Converts value trees between native Avro values and generic row values.
///
/// Every call is driven by a source/target schema pair and holds no state
/// between calls, so one converter can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct ValueConverter {
    catalog: Arc<LogicalTypeCatalog>,
}

impl ValueConverter {
    pub fn new() -> Self {
        Self::with_catalog(LogicalTypeCatalog::standard())
    }

    pub fn with_catalog(catalog: Arc<LogicalTypeCatalog>) -> Self {
        Self { catalog }
    }

    /// Convert a native value described by `source` into a generic value of type `target`
    pub fn to_generic(
        &self,
        value: &AvroValue,
        source: &AvroSchema,
        target: &FieldType,
    ) -> Result<RowValue> {
        let names = NativeNames::collect(source);
        self.generic_value(value, source, target, &names)
    }

    /// Convert a generic value of type `source` into a native value shaped by `target`
    pub fn to_native(
        &self,
        value: &RowValue,
        source: &FieldType,
        target: &AvroSchema,
    ) -> Result<AvroValue> {
        let names = NativeNames::collect(target);
        self.native_value(value, source, target, &names)
    }

    /// Convert a native record into a row of `schema`
    pub fn record_to_row(
        &self,
        record: &AvroValue,
        native: &AvroSchema,
        schema: &Arc<Schema>,
    ) -> Result<Row> {
        let names = NativeNames::collect(native);
        let source = names.resolve(native)?;
        let AvroSchema::Record(record_schema) = source else {
            return Err(ConversionError::schema_mismatch(
                "native schema of a record must be a record schema",
            ));
        };
        let fields = match record {
            AvroValue::Record(fields) => fields,
            AvroValue::Union(_, inner) => match inner.as_ref() {
                AvroValue::Record(fields) => fields,
                other => return Err(unexpected_native("record", other)),
            },
            other => return Err(unexpected_native("record", other)),
        };

        tracing::trace!(fields = fields.len(), "converting native record to row");
        self.generic_row(fields, record_schema, schema, &names)
    }

    /// Convert a row into a native record, using the row's own schema as the source
    pub fn row_to_record(&self, row: &Row, native: &AvroSchema) -> Result<AvroValue> {
        let names = NativeNames::collect(native);
        let target = names.resolve(native)?;
        let AvroSchema::Record(record_schema) = target else {
            return Err(ConversionError::schema_mismatch(
                "native schema of a record must be a record schema",
            ));
        };

        tracing::trace!(fields = row.len(), "converting row to native record");
        self.native_record(row, record_schema, &names)
    }

    fn generic_value(
        &self,
        value: &AvroValue,
        source: &AvroSchema,
        target: &FieldType,
        names: &NativeNames,
    ) -> Result<RowValue> {
        let source = names.resolve(source)?;

        if let AvroSchema::Union(union) = source {
            let variants = union.variants();
            let (branch, inner) = match value {
                AvroValue::Union(idx, inner) => {
                    let branch = variants.get(*idx as usize).ok_or_else(|| {
                        ConversionError::schema_mismatch(format!(
                            "union branch {} does not exist, the union has {} branches",
                            idx,
                            variants.len()
                        ))
                    })?;
                    (branch, inner.as_ref())
                }
                AvroValue::Null => return generic_null(target),
                bare => (non_null_branch(variants)?.1, bare),
            };
            return self.generic_value(inner, branch, target, names);
        }

        if let AvroValue::Union(_, inner) = value {
            return self.generic_value(inner, source, target, names);
        }

        if let AvroValue::Null = value {
            return generic_null(target);
        }

        if let Some(codec) = self.catalog.for_generic(&target.data_type)? {
            return codec.decode(value, source, &target.data_type);
        }

        match (value, &target.data_type) {
            (AvroValue::Boolean(b), DataType::Boolean) => Ok(RowValue::Boolean(*b)),

            (AvroValue::Int(i), DataType::Int16) => i16::try_from(*i)
                .map(RowValue::Int16)
                .map_err(|_| ConversionError::invalid_value(format!("{} does not fit in INT16", i))),
            (AvroValue::Int(i), DataType::Int32) => Ok(RowValue::Int32(*i)),
            (AvroValue::Int(i), DataType::Int64) => Ok(RowValue::Int64(i64::from(*i))),
            (AvroValue::Long(l), DataType::Int64) => Ok(RowValue::Int64(*l)),

            (AvroValue::Float(f), DataType::Float32) => Ok(RowValue::Float32(OrderedFloat(*f))),
            (AvroValue::Float(f), DataType::Float64) => {
                Ok(RowValue::Float64(OrderedFloat(f64::from(*f))))
            }
            (AvroValue::Double(d), DataType::Float64) => Ok(RowValue::Float64(OrderedFloat(*d))),

            (AvroValue::String(s), DataType::String) | (AvroValue::Enum(_, s), DataType::String) => {
                Ok(RowValue::String(Arc::from(s.as_str())))
            }
            (AvroValue::Bytes(b), DataType::Bytes) | (AvroValue::Fixed(_, b), DataType::Bytes) => {
                Ok(RowValue::Bytes(Bytes::copy_from_slice(b)))
            }

            (AvroValue::Record(fields), DataType::Row(schema)) => {
                let AvroSchema::Record(record_schema) = source else {
                    return Err(ConversionError::schema_mismatch(
                        "native record value without a record schema",
                    ));
                };
                Ok(RowValue::Row(self.generic_row(fields, record_schema, schema, names)?))
            }

            (AvroValue::Array(items), DataType::Array(element)) => {
                let AvroSchema::Array(array_schema) = source else {
                    return Err(ConversionError::schema_mismatch(
                        "native array value without an array schema",
                    ));
                };
                let mut converted = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    converted.push(
                        self.generic_value(item, &array_schema.items, element, names)
                            .at_index(idx)?,
                    );
                }
                Ok(RowValue::Array(converted))
            }

            (AvroValue::Map(entries), DataType::Map(key_type, value_type)) => {
                let AvroSchema::Map(map_schema) = source else {
                    return Err(ConversionError::schema_mismatch(
                        "native map value without a map schema",
                    ));
                };
                if key_type.data_type != DataType::String {
                    return Err(ConversionError::unsupported(format!(
                        "native map keys are strings, the target key type is {}",
                        key_type
                    )));
                }

                // Sorted so that equal inputs always produce the same entry order
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();

                let mut converted = IndexMap::with_capacity(entries.len());
                for key in keys {
                    let converted_value = self
                        .generic_value(&entries[key], &map_schema.types, value_type, names)
                        .at_key(key)?;
                    converted.insert(RowValue::String(Arc::from(key.as_str())), converted_value);
                }
                Ok(RowValue::Map(converted))
            }

            (value, data_type) => Err(ConversionError::schema_mismatch(format!(
                "cannot convert native {} to {}",
                native_kind(value),
                data_type
            ))),
        }
    }

    fn generic_row(
        &self,
        fields: &[(String, AvroValue)],
        record_schema: &RecordSchema,
        schema: &Arc<Schema>,
        names: &NativeNames,
    ) -> Result<Row> {
        if record_schema.fields.len() != schema.len() {
            return Err(ConversionError::schema_mismatch(format!(
                "native record has {} fields, target schema has {}",
                record_schema.fields.len(),
                schema.len()
            )));
        }

        let mut values = Vec::with_capacity(schema.len());
        for (idx, (native_field, field)) in record_schema.fields.iter().zip(schema.fields()).enumerate()
        {
            let value = match fields.get(idx) {
                Some((name, value)) if *name == native_field.name => value,
                _ => fields
                    .iter()
                    .find(|(name, _)| *name == native_field.name)
                    .map(|(_, value)| value)
                    .ok_or_else(|| {
                        ConversionError::schema_mismatch(format!(
                            "native record has no value for field '{}'",
                            native_field.name
                        ))
                    })
                    .in_field(field.name())?,
            };

            values.push(
                self.generic_value(value, &native_field.schema, field.field_type(), names)
                    .in_field(field.name())?,
            );
        }

        Ok(Row::from_validated(schema.clone(), values))
    }

    fn native_value(
        &self,
        value: &RowValue,
        source: &FieldType,
        target: &AvroSchema,
        names: &NativeNames,
    ) -> Result<AvroValue> {
        let target = names.resolve(target)?;

        if let AvroSchema::Union(union) = target {
            let variants = union.variants();
            if value.is_null() {
                let idx = variants
                    .iter()
                    .position(|v| matches!(v, AvroSchema::Null))
                    .ok_or_else(ConversionError::unexpected_null)?;
                return Ok(AvroValue::Union(idx as u32, Box::new(AvroValue::Null)));
            }
            let (idx, branch) = non_null_branch(variants)?;
            let inner = self.native_value(value, source, branch, names)?;
            return Ok(AvroValue::Union(idx as u32, Box::new(inner)));
        }

        if value.is_null() {
            return Err(ConversionError::unexpected_null());
        }

        if let Some(codec) = self.catalog.for_native(target)? {
            return codec.encode(value, target);
        }

        match (value, target) {
            (RowValue::Boolean(b), AvroSchema::Boolean) => Ok(AvroValue::Boolean(*b)),

            (RowValue::Int16(i), AvroSchema::Int) => Ok(AvroValue::Int(i32::from(*i))),
            (RowValue::Int32(i), AvroSchema::Int) => Ok(AvroValue::Int(*i)),
            (RowValue::Int16(i), AvroSchema::Long) => Ok(AvroValue::Long(i64::from(*i))),
            (RowValue::Int32(i), AvroSchema::Long) => Ok(AvroValue::Long(i64::from(*i))),
            (RowValue::Int64(l), AvroSchema::Long) => Ok(AvroValue::Long(*l)),

            (RowValue::Float32(f), AvroSchema::Float) => Ok(AvroValue::Float(f.into_inner())),
            (RowValue::Float32(f), AvroSchema::Double) => {
                Ok(AvroValue::Double(f64::from(f.into_inner())))
            }
            (RowValue::Float64(d), AvroSchema::Double) => Ok(AvroValue::Double(d.into_inner())),

            (RowValue::String(s), AvroSchema::String) | (RowValue::Enum(s), AvroSchema::String) => {
                Ok(AvroValue::String(s.to_string()))
            }
            (RowValue::Bytes(b), AvroSchema::Bytes) => Ok(AvroValue::Bytes(b.to_vec())),

            (RowValue::Row(row), AvroSchema::Record(record_schema)) => {
                self.native_record(row, record_schema, names)
            }

            (RowValue::Array(items), AvroSchema::Array(array_schema)) => {
                let DataType::Array(element) = &source.data_type else {
                    return Err(ConversionError::schema_mismatch(format!(
                        "array value declared as {}",
                        source
                    )));
                };
                let mut converted = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    converted.push(
                        self.native_value(item, element, &array_schema.items, names)
                            .at_index(idx)?,
                    );
                }
                Ok(AvroValue::Array(converted))
            }

            (RowValue::Map(entries), AvroSchema::Map(map_schema)) => {
                let DataType::Map(_, value_type) = &source.data_type else {
                    return Err(ConversionError::schema_mismatch(format!(
                        "map value declared as {}",
                        source
                    )));
                };
                let mut converted = HashMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    let key = match key {
                        RowValue::String(s) => s.to_string(),
                        other => {
                            return Err(ConversionError::unsupported(format!(
                                "native map keys are strings, got {}",
                                other.type_name()
                            )))
                        }
                    };
                    let native = self
                        .native_value(entry, value_type, &map_schema.types, names)
                        .at_key(&key)?;
                    converted.insert(key, native);
                }
                Ok(AvroValue::Map(converted))
            }

            (value, target) => Err(ConversionError::schema_mismatch(format!(
                "cannot convert {} to native {:?}",
                value.type_name(),
                apache_avro::schema::SchemaKind::from(target)
            ))),
        }
    }

    fn native_record(
        &self,
        row: &Row,
        record_schema: &RecordSchema,
        names: &NativeNames,
    ) -> Result<AvroValue> {
        if record_schema.fields.len() != row.len() {
            return Err(ConversionError::schema_mismatch(format!(
                "row has {} fields, native record has {}",
                row.len(),
                record_schema.fields.len()
            )));
        }

        let mut fields = Vec::with_capacity(row.len());
        for ((value, field), native_field) in row
            .values()
            .iter()
            .zip(row.schema().fields())
            .zip(&record_schema.fields)
        {
            let native = self
                .native_value(value, field.field_type(), &native_field.schema, names)
                .in_field(field.name())?;
            fields.push((native_field.name.clone(), native));
        }
        Ok(AvroValue::Record(fields))
    }
}

impl Default for ValueConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected_native(expected: &str, value: &AvroValue) -> ConversionError {
    ConversionError::schema_mismatch(format!(
        "expected native {}, got {}",
        expected,
        native_kind(value)
    ))
}

/// Null is only valid where the target field is nullable
fn generic_null(target: &FieldType) -> Result<RowValue> {
    if !target.nullable {
        return Err(ConversionError::unexpected_null());
    }
    Ok(RowValue::Null)
}

fn non_null_branch(variants: &[AvroSchema]) -> Result<(usize, &AvroSchema)> {
    variants
        .iter()
        .enumerate()
        .find(|(_, v)| !matches!(v, AvroSchema::Null))
        .ok_or_else(|| ConversionError::schema_mismatch("union has no non-null branch"))
}

/// Named definitions of one native schema, for resolving references
#[derive(Debug)]
pub struct NativeNames<'s> {
    definitions: HashMap<String, &'s AvroSchema>,
}

impl<'s> NativeNames<'s> {
    pub fn collect(root: &'s AvroSchema) -> Self {
        let mut names = NativeNames {
            definitions: HashMap::new(),
        };
        names.visit(root);
        names
    }

    fn visit(&mut self, schema: &'s AvroSchema) {
        match schema {
            AvroSchema::Record(record) => {
                self.definitions.insert(record.name.fullname(None), schema);
                for field in &record.fields {
                    self.visit(&field.schema);
                }
            }
            AvroSchema::Enum(e) => {
                self.definitions.insert(e.name.fullname(None), schema);
            }
            AvroSchema::Fixed(f) => {
                self.definitions.insert(f.name.fullname(None), schema);
            }
            AvroSchema::Decimal(decimal) => {
                if let AvroSchema::Fixed(f) = decimal.inner.as_ref() {
                    self.definitions.insert(f.name.fullname(None), schema);
                }
            }
            AvroSchema::Array(array) => self.visit(&array.items),
            AvroSchema::Map(map) => self.visit(&map.types),
            AvroSchema::Union(union) => union.variants().iter().for_each(|v| self.visit(v)),
            _ => {}
        }
    }

    /// Follow a named reference to its definition; other schemas resolve to themselves
    pub fn resolve<'a>(&'a self, schema: &'a AvroSchema) -> Result<&'a AvroSchema> {
        match schema {
            AvroSchema::Ref { name } => {
                let fullname = name.fullname(None);
                self.definitions.get(&fullname).copied().ok_or_else(|| {
                    ConversionError::schema_mismatch(format!(
                        "native schema references unknown type '{}'",
                        fullname
                    ))
                })
            }
            other => Ok(other),
        }
    }
}
