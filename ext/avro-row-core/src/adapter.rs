use crate::converter::ValueConverter;
use crate::error::{ConversionError, Result};
use crate::logical::native_kind;
use crate::schema::Schema;
use crate::translator::SchemaTranslator;
use crate::value::Row;
use apache_avro::schema::Schema as AvroSchema;
use apache_avro::types::Value as AvroValue;
use std::sync::Arc;

/// A representation of native records that can be turned into native values and back
///
/// The generic representation is the Avro value tree itself; other
/// representations (typed host structs, for instance) plug in here.
pub trait RecordAdapter {
    type Record;

    /// Host record to native record value, shaped by `schema`
    fn to_native(&self, record: &Self::Record, schema: &AvroSchema) -> Result<AvroValue>;

    /// Native record value to host record
    fn from_native(&self, value: AvroValue, schema: &AvroSchema) -> Result<Self::Record>;
}

/// Adapter for plain Avro record values
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRecordAdapter;

impl RecordAdapter for GenericRecordAdapter {
    type Record = AvroValue;

    fn to_native(&self, record: &AvroValue, _schema: &AvroSchema) -> Result<AvroValue> {
        match record {
            AvroValue::Record(_) => Ok(record.clone()),
            other => Err(ConversionError::schema_mismatch(format!(
                "expected native record, got {}",
                native_kind(other)
            ))),
        }
    }

    fn from_native(&self, value: AvroValue, _schema: &AvroSchema) -> Result<AvroValue> {
        Ok(value)
    }
}

/// Reusable record ⇄ row conversion bound to one schema pair
#[derive(Debug, Clone)]
pub struct RowConverter<A> {
    adapter: A,
    native: AvroSchema,
    schema: Arc<Schema>,
    values: ValueConverter,
}

/// Converter between plain Avro record values and rows
pub type GenericRowConverter = RowConverter<GenericRecordAdapter>;

impl<A: RecordAdapter> RowConverter<A> {
    pub fn new(adapter: A, native: AvroSchema, schema: Arc<Schema>) -> Self {
        Self {
            adapter,
            native,
            schema,
            values: ValueConverter::new(),
        }
    }

    /// Bind to a native record schema, deriving the generic schema from it
    pub fn from_native(adapter: A, native: AvroSchema) -> Result<Self> {
        let schema = SchemaTranslator::new().to_generic(&native)?.into_schema();
        Ok(Self::new(adapter, native, schema))
    }

    /// Bind to a generic schema, deriving the native record schema from it
    pub fn from_generic(adapter: A, schema: Arc<Schema>) -> Result<Self> {
        let native = SchemaTranslator::new().to_native(&schema)?.into_schema();
        Ok(Self::new(adapter, native, schema))
    }

    pub fn with_value_converter(mut self, values: ValueConverter) -> Self {
        self.values = values;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn native_schema(&self) -> &AvroSchema {
        &self.native
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn to_row(&self, record: &A::Record) -> Result<Row> {
        let native = self.adapter.to_native(record, &self.native)?;
        self.values.record_to_row(&native, &self.native, &self.schema)
    }

    /// Convert a row back into a record; the row's own schema drives the conversion
    pub fn from_row(&self, row: &Row) -> Result<A::Record> {
        let native = self.values.row_to_record(row, &self.native)?;
        self.adapter.from_native(native, &self.native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test::*;

    #[test]
    fn test_generic_row_converter() {
        let converter =
            GenericRowConverter::from_native(GenericRecordAdapter, sample_native_schema()).unwrap();
        assert_eq!(converter.schema(), &sample_schema());

        let row = converter.to_row(&sample_record()).unwrap();
        assert_eq!(row, sample_row());
        assert_eq!(converter.from_row(&row).unwrap(), sample_record());
    }

    #[test]
    fn test_generic_adapter_rejects_non_records() {
        let converter =
            GenericRowConverter::from_native(GenericRecordAdapter, sample_native_schema()).unwrap();
        let err = converter.to_row(&AvroValue::Long(1)).unwrap_err();
        assert!(matches!(err, ConversionError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_from_generic_derives_native_schema() {
        let converter =
            GenericRowConverter::from_generic(GenericRecordAdapter, sample_schema()).unwrap();
        let AvroSchema::Record(record) = converter.native_schema() else {
            panic!("expected a record schema");
        };
        assert_eq!(record.name.fullname(None), "Person");
        for row in sample_rows(5) {
            let record = converter.from_row(&row).unwrap();
            assert_eq!(converter.to_row(&record).unwrap(), row);
        }
    }
}
