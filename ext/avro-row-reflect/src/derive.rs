use crate::converter::ReflectedConverter;
use crate::descriptor::{FieldDescriptor, HostType, RecordDescriptor, Reflect};
use crate::error::{ReflectError, Result};
use avro_row_core::{Advisory, AvroSchema, DataType, FieldType, Schema, SchemaTranslator};
use std::sync::Arc;

/// Everything derived from one host descriptor
#[derive(Debug, Clone)]
pub struct DerivedSchema {
    /// The schema exactly as the descriptor declares it
    pub declared: Arc<Schema>,
    pub native: AvroSchema,
    /// The declared schema after a trip through the native schema
    pub schema: Arc<Schema>,
    /// Declared fields whose type changes on that trip (16-bit integers)
    pub advisories: Vec<Advisory>,
}

/// Derives schemas and converters from host field-descriptor tables.
///
/// Derivation runs descriptor → declared schema → native schema → derived
/// schema, so the derived schema is always one the native side can carry.
#[derive(Debug, Clone, Default)]
pub struct ReflectionSchemaDeriver {
    translator: SchemaTranslator,
}

impl ReflectionSchemaDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the outermost native record in `namespace`
    pub fn with_namespace<S: Into<String>>(namespace: S) -> Self {
        Self {
            translator: SchemaTranslator::builder().namespace(namespace).build(),
        }
    }

    /// Derive the schema and both converters of `T`
    pub fn derive<T: Reflect>(&self) -> Result<ReflectedConverter<T>> {
        let descriptor = T::descriptor();
        let derived = self.derive_schema(&descriptor)?;
        Ok(ReflectedConverter::from_parts(
            Arc::new(descriptor),
            derived.native,
            derived.schema,
        ))
    }

    pub fn derive_schema(&self, descriptor: &RecordDescriptor) -> Result<DerivedSchema> {
        let declared = Arc::new(declared_schema(descriptor)?);

        let translation = self.translator.to_native(&declared)?;
        let native = translation.schema;
        let schema = self.translator.to_generic(&native)?.into_schema();

        tracing::debug!(
            record = %descriptor.name,
            fields = schema.len(),
            excluded = descriptor.fields.len() - schema.len(),
            advisories = translation.advisories.len(),
            "derived schema from host descriptor"
        );

        Ok(DerivedSchema {
            declared,
            native,
            schema,
            advisories: translation.advisories,
        })
    }
}

/// The generic schema a descriptor declares, before any native round trip
pub fn declared_schema(descriptor: &RecordDescriptor) -> Result<Schema> {
    let mut builder = Schema::builder().with_name(descriptor.name.clone());
    for field in descriptor.included() {
        builder = builder.add_field(field.exposed_name(), field_type(descriptor, field)?);
    }
    Ok(builder.build()?)
}

/// Override first, then inference from the host type
fn field_type(record: &RecordDescriptor, field: &FieldDescriptor) -> Result<FieldType> {
    let data_type = match &field.type_override {
        Some(data_type) => {
            if !carries(field.host_type.without_optional(), data_type) {
                return Err(ReflectError::invalid_descriptor(
                    &record.name,
                    &field.name,
                    format!("a {:?} host field cannot carry {}", field.host_type, data_type),
                ));
            }
            data_type.clone()
        }
        None => infer(field.host_type.without_optional())
            .map_err(|message| ReflectError::invalid_descriptor(&record.name, &field.name, message))?,
    };
    Ok(FieldType::new(data_type, field.is_nullable()))
}

/// Host types that can hold a temporal value
fn carries(host: &HostType, data_type: &DataType) -> bool {
    match data_type {
        DataType::Date | DataType::Timestamp => matches!(
            host,
            HostType::I8
                | HostType::I16
                | HostType::I32
                | HostType::I64
                | HostType::String
                | HostType::Date
                | HostType::Timestamp
                | HostType::Opaque
        ),
        _ => true,
    }
}

fn infer(host: &HostType) -> std::result::Result<DataType, String> {
    let data_type = match host {
        HostType::Bool => DataType::Boolean,
        HostType::I8 | HostType::I16 => DataType::Int16,
        HostType::I32 => DataType::Int32,
        HostType::I64 => DataType::Int64,
        HostType::F32 => DataType::Float32,
        HostType::F64 => DataType::Float64,
        HostType::String => DataType::String,
        HostType::Bytes => DataType::Bytes,
        HostType::Date => DataType::Date,
        HostType::Timestamp => DataType::Timestamp,
        HostType::Record(descriptor) => {
            let schema = declared_schema(descriptor).map_err(|e| e.to_string())?;
            DataType::Row(Arc::new(schema))
        }
        HostType::List(element) => DataType::Array(Box::new(element_type(element)?)),
        HostType::Map(value) => {
            DataType::Map(Box::new(FieldType::string()), Box::new(element_type(value)?))
        }
        HostType::Optional(inner) => infer(inner)?,
        HostType::Decimal => {
            return Err("decimal fields need a type override carrying precision and scale".into())
        }
        HostType::Opaque => return Err("opaque host types need a type override".into()),
    };
    Ok(data_type)
}

/// List elements and map values are nullable only when declared `Option`
fn element_type(host: &HostType) -> std::result::Result<FieldType, String> {
    Ok(FieldType::new(
        infer(host.without_optional())?,
        host.is_optional(),
    ))
}
