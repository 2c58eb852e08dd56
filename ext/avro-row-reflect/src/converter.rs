use crate::bridge::SpecificRecordAdapter;
use crate::derive::ReflectionSchemaDeriver;
use crate::descriptor::{RecordDescriptor, Reflect};
use crate::error::Result;
use avro_row_core::{AvroSchema, RecordAdapter, Row, RowConverter, Schema, ValueConverter};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// Row converters derived for the host type `T`.
///
/// Holds only owned data, so it can be cloned, shared across threads or
/// serialized and rebuilt elsewhere. The native schema travels as Avro JSON.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ReflectedConverter<T> {
    descriptor: Arc<RecordDescriptor>,
    #[serde(with = "avro_json")]
    native: AvroSchema,
    schema: Arc<Schema>,
    #[serde(skip)]
    _host: PhantomData<fn() -> T>,
}

impl<T: Reflect> ReflectedConverter<T> {
    /// Derive with the default deriver
    pub fn new() -> Result<Self> {
        ReflectionSchemaDeriver::new().derive()
    }

    pub fn to_row(&self, value: &T) -> Result<Row> {
        let native = self.adapter().to_native(value, &self.native)?;
        Ok(ValueConverter::new().record_to_row(&native, &self.native, &self.schema)?)
    }

    /// Convert a row into a host value; the row's own schema drives the conversion
    pub fn from_row(&self, row: &Row) -> Result<T> {
        let native = ValueConverter::new().row_to_record(row, &self.native)?;
        Ok(self.adapter().from_native(native, &self.native)?)
    }

    /// The same conversions as a generic record ⇄ row converter
    pub fn row_converter(&self) -> RowConverter<SpecificRecordAdapter<T>> {
        RowConverter::new(self.adapter(), self.native.clone(), self.schema.clone())
    }

    fn adapter(&self) -> SpecificRecordAdapter<T> {
        SpecificRecordAdapter::new(self.descriptor.clone())
    }
}

impl<T> ReflectedConverter<T> {
    pub(crate) fn from_parts(
        descriptor: Arc<RecordDescriptor>,
        native: AvroSchema,
        schema: Arc<Schema>,
    ) -> Self {
        Self {
            descriptor,
            native,
            schema,
            _host: PhantomData,
        }
    }

    /// The derived generic schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn native_schema(&self) -> &AvroSchema {
        &self.native
    }

    pub fn descriptor(&self) -> &RecordDescriptor {
        &self.descriptor
    }
}

impl<T> Clone for ReflectedConverter<T> {
    fn clone(&self) -> Self {
        Self::from_parts(
            self.descriptor.clone(),
            self.native.clone(),
            self.schema.clone(),
        )
    }
}

impl<T> std::fmt::Debug for ReflectedConverter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectedConverter")
            .field("record", &self.descriptor.name)
            .field("schema", &self.schema)
            .finish()
    }
}

mod avro_json {
    use avro_row_core::AvroSchema;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(schema: &AvroSchema, serializer: S) -> Result<S::Ok, S::Error> {
        let json = serde_json::to_string(schema).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&json)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AvroSchema, D::Error> {
        let json = String::deserialize(deserializer)?;
        AvroSchema::parse_str(&json).map_err(serde::de::Error::custom)
    }
}
