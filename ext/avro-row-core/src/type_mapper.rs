use crate::error::{ConversionError, ErrorContext, Result};
use crate::logical::LogicalTypeCatalog;
use crate::schema::{DataType, Field, FieldType, NativeName, SchemaBuilder};
use apache_avro::schema::{Schema as AvroSchema, SchemaKind};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Name given to the outermost native record when nothing better is known
pub const DEFAULT_RECORD_NAME: &str = "topLevelRecord";

/// Maps single type descriptors between native Avro schemas and generic field types.
///
/// The mapping is asymmetric for 16-bit integers: `INT16` becomes a native
/// `int`, and a native `int` always comes back as `INT32`.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    catalog: Arc<LogicalTypeCatalog>,
}

impl TypeMapper {
    pub fn new() -> Self {
        Self::with_catalog(LogicalTypeCatalog::standard())
    }

    pub fn with_catalog(catalog: Arc<LogicalTypeCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &LogicalTypeCatalog {
        &self.catalog
    }

    /// Native type to generic field type
    pub fn to_generic(&self, native: &AvroSchema) -> Result<FieldType> {
        let mut named = NamedTypes::default();
        self.generic_field_type(native, &mut named)
    }

    /// Generic field type to native type, naming the outermost record `topLevelRecord`
    pub fn to_native(&self, field_type: &FieldType) -> Result<AvroSchema> {
        self.to_native_named(field_type, DEFAULT_RECORD_NAME, None)
    }

    /// Generic field type to native type.
    ///
    /// `root_name` names the outermost named type unless it already carries a
    /// native name. `namespace` is set on that outermost type and inherited by
    /// everything nested in it.
    pub fn to_native_named(
        &self,
        field_type: &FieldType,
        root_name: &str,
        namespace: Option<&str>,
    ) -> Result<AvroSchema> {
        let mut scope = NameScope::default();
        let mut json = self.native_json(field_type, &sanitize_name(root_name), &mut scope)?;

        if let Some(ns) = namespace {
            if let Some(obj) = json.as_object_mut() {
                if obj.contains_key("name") {
                    obj.insert("namespace".to_string(), json!(ns));
                }
            }
        }

        Ok(AvroSchema::parse(&json)?)
    }

    fn generic_field_type(&self, native: &AvroSchema, named: &mut NamedTypes) -> Result<FieldType> {
        match native {
            AvroSchema::Union(union) => {
                let variants = union.variants();
                let non_null: Vec<&AvroSchema> = variants
                    .iter()
                    .filter(|v| !matches!(v, AvroSchema::Null))
                    .collect();

                match non_null.as_slice() {
                    [inner] if variants.len() == 2 => {
                        Ok(self.generic_field_type(inner, named)?.with_nullable(true))
                    }
                    _ => Err(ConversionError::unsupported(format!(
                        "union of {} branches is not a [null, T] pair",
                        variants.len()
                    ))),
                }
            }
            other => Ok(FieldType::of(self.generic_data_type(other, named)?)),
        }
    }

    fn generic_data_type(&self, native: &AvroSchema, named: &mut NamedTypes) -> Result<DataType> {
        if let Some(codec) = self.catalog.for_native(native)? {
            let data_type = codec.generic_type(native)?;
            match native {
                AvroSchema::Enum(schema) => named.define(schema.name.fullname(None), &data_type),
                AvroSchema::Fixed(schema) => named.define(schema.name.fullname(None), &data_type),
                _ => {}
            }
            return Ok(data_type);
        }

        match native {
            AvroSchema::Boolean => Ok(DataType::Boolean),
            AvroSchema::Int => Ok(DataType::Int32),
            AvroSchema::Long => Ok(DataType::Int64),
            AvroSchema::Float => Ok(DataType::Float32),
            AvroSchema::Double => Ok(DataType::Float64),
            AvroSchema::String => Ok(DataType::String),
            AvroSchema::Bytes => Ok(DataType::Bytes),
            AvroSchema::Array(array) => Ok(DataType::Array(Box::new(
                self.generic_field_type(&array.items, named)?,
            ))),
            AvroSchema::Map(map) => Ok(DataType::Map(
                Box::new(FieldType::string()),
                Box::new(self.generic_field_type(&map.types, named)?),
            )),
            AvroSchema::Record(record) => {
                let fullname = record.name.fullname(None);
                let mut builder =
                    SchemaBuilder::new().with_native_name(NativeName::new(fullname.clone()));
                for field in &record.fields {
                    let field_type = self
                        .generic_field_type(&field.schema, named)
                        .in_field(&field.name)?;
                    builder = builder.add(Field::new(field.name.clone(), field_type));
                }
                let data_type = DataType::Row(Arc::new(builder.build()?));
                named.define(fullname, &data_type);
                Ok(data_type)
            }
            AvroSchema::Ref { name } => {
                let fullname = name.fullname(None);
                named.resolve(&fullname).ok_or_else(|| {
                    ConversionError::unsupported(format!(
                        "reference to '{}' does not name a completed definition",
                        fullname
                    ))
                })
            }
            AvroSchema::Null => Err(ConversionError::unsupported(
                "null is only supported as a branch of a nullable union",
            )),
            other => Err(ConversionError::unsupported(format!(
                "native type {:?} has no generic counterpart",
                SchemaKind::from(other)
            ))),
        }
    }

    fn native_json(
        &self,
        field_type: &FieldType,
        name_hint: &str,
        scope: &mut NameScope,
    ) -> Result<JsonValue> {
        let bare = self.native_data_json(&field_type.data_type, name_hint, scope)?;
        if field_type.nullable {
            Ok(json!(["null", bare]))
        } else {
            Ok(bare)
        }
    }

    fn native_data_json(
        &self,
        data_type: &DataType,
        name_hint: &str,
        scope: &mut NameScope,
    ) -> Result<JsonValue> {
        if let Some(codec) = self.catalog.for_generic(data_type)? {
            let native_name = match data_type {
                DataType::Enum { name, .. } | DataType::FixedBytes { name, .. } => Some(name),
                _ => None,
            };
            return match native_name {
                Some(name) => {
                    let claim = match name.as_deref() {
                        Some(native) => scope.claim(native, data_type, true),
                        None => scope.claim(name_hint, data_type, false),
                    };
                    match claim {
                        Claim::Reference(existing) => Ok(json!(existing)),
                        Claim::Define(fresh) => codec.native_schema(data_type, &fresh),
                    }
                }
                None => codec.native_schema(data_type, name_hint),
            };
        }

        match data_type {
            DataType::Boolean => Ok(json!("boolean")),
            DataType::Int16 | DataType::Int32 => Ok(json!("int")),
            DataType::Int64 => Ok(json!("long")),
            DataType::Float32 => Ok(json!("float")),
            DataType::Float64 => Ok(json!("double")),
            DataType::String => Ok(json!("string")),
            DataType::Bytes => Ok(json!("bytes")),
            DataType::Array(element) => Ok(json!({
                "type": "array",
                "items": self.native_json(element, name_hint, scope)?,
            })),
            DataType::Map(key, value) => {
                if key.data_type != DataType::String {
                    return Err(ConversionError::unsupported(format!(
                        "map key {} is not translatable, native maps only have string keys",
                        key
                    )));
                }
                Ok(json!({
                    "type": "map",
                    "values": self.native_json(value, name_hint, scope)?,
                }))
            }
            DataType::Row(schema) => {
                let claim = match schema.native_name() {
                    Some(native) => scope.claim(native, data_type, true),
                    None => scope.claim(name_hint, data_type, false),
                };
                let name = match claim {
                    Claim::Reference(existing) => return Ok(json!(existing)),
                    Claim::Define(fresh) => fresh,
                };

                let mut fields = Vec::with_capacity(schema.len());
                for field in schema.fields() {
                    let native = self
                        .native_json(field.field_type(), &sanitize_name(field.name()), scope)
                        .in_field(field.name())?;
                    fields.push(json!({ "name": field.name(), "type": native }));
                }
                Ok(json!({ "type": "record", "name": name, "fields": fields }))
            }
            other => Err(ConversionError::unsupported(format!(
                "{} has no native counterpart",
                other
            ))),
        }
    }
}

impl Default for TypeMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Named native definitions seen so far while reading a native schema
#[derive(Default)]
struct NamedTypes {
    definitions: HashMap<String, DataType>,
}

impl NamedTypes {
    fn define(&mut self, fullname: String, data_type: &DataType) {
        self.definitions.insert(fullname, data_type.clone());
    }

    fn resolve(&self, fullname: &str) -> Option<DataType> {
        self.definitions.get(fullname).cloned()
    }
}

enum Claim {
    /// The name is fresh: emit a full definition under it
    Define(String),
    /// An identical type is already defined under this name
    Reference(String),
}

/// Names handed out while writing one native schema, in claim order
#[derive(Default)]
struct NameScope {
    claimed: Vec<(String, DataType)>,
}

impl NameScope {
    /// Claim a name for `data_type`.
    ///
    /// `named` is false when `preferred` was derived from a field name; such
    /// types reuse any identical definition already emitted, whatever its name.
    fn claim(&mut self, preferred: &str, data_type: &DataType, named: bool) -> Claim {
        if !named {
            if let Some((existing, _)) = self.claimed.iter().find(|(_, t)| t == data_type) {
                return Claim::Reference(existing.clone());
            }
        }

        let mut candidate = preferred.to_string();
        let mut suffix = 1;
        loop {
            match self.claimed.iter().find(|(name, _)| *name == candidate) {
                None => {
                    tracing::trace!(name = %candidate, "defining native named type");
                    self.claimed.push((candidate.clone(), data_type.clone()));
                    return Claim::Define(candidate);
                }
                Some((_, existing)) if existing == data_type => return Claim::Reference(candidate),
                Some(_) => {
                    suffix += 1;
                    candidate = format!("{}_{}", preferred, suffix);
                }
            }
        }
    }
}

/// Turn an arbitrary field name into a valid native type name
fn sanitize_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
