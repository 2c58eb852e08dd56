use crate::error::{ConversionError, FieldPath, PathSegment, Result};
use crate::logical::LogicalTypeCatalog;
use crate::schema::{DataType, FieldType, Schema, SchemaBuilder};
use crate::traits::SchemaInspector;
use crate::type_mapper::{TypeMapper, DEFAULT_RECORD_NAME};
use apache_avro::schema::Schema as AvroSchema;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A field whose type would change if its translation were translated back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub path: FieldPath,
    /// Type description before the round trip
    pub original: String,
    /// Type description after the round trip
    pub round_trip: String,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} becomes {} on round trip",
            self.path, self.original, self.round_trip
        )
    }
}

/// A translated schema plus the non-fatal round-trip advisories
#[derive(Debug, Clone)]
pub struct Translation<S> {
    pub schema: S,
    pub advisories: Vec<Advisory>,
}

impl<S> Translation<S> {
    /// True when translating back would reproduce the input exactly
    pub fn is_lossless(&self) -> bool {
        self.advisories.is_empty()
    }

    pub fn into_schema(self) -> S {
        self.schema
    }
}

/// Translates whole record schemas in both directions.
///
/// Field order and field count are preserved. Top-level fields can be
/// renamed through [`TranslatorBuilder::rename`].
#[derive(Debug, Clone)]
pub struct SchemaTranslator {
    mapper: TypeMapper,
    record_name: Option<String>,
    namespace: Option<String>,
    renames: HashMap<String, String>,
}

impl SchemaTranslator {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TranslatorBuilder {
        TranslatorBuilder::default()
    }

    pub fn type_mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    /// Native record schema to generic schema
    pub fn to_generic(&self, native: &AvroSchema) -> Result<Translation<Arc<Schema>>> {
        if !matches!(native, AvroSchema::Record(_)) {
            return Err(ConversionError::unsupported(
                "only native record schemas translate to a generic schema",
            ));
        }

        let schema = self.row_schema(self.mapper.to_generic(native)?)?;

        let round_trip = self.mapper.to_native(&FieldType::row(schema.clone()))?;
        let mut advisories = Vec::new();
        native_diff(native, &round_trip, &FieldPath::root(), &mut advisories);
        log_advisories(&advisories);

        let schema = self.apply_renames(&schema)?;
        tracing::debug!(
            fields = schema.len(),
            advisories = advisories.len(),
            "translated native schema to generic schema"
        );
        Ok(Translation { schema, advisories })
    }

    /// Generic schema to native record schema
    pub fn to_native(&self, schema: &Schema) -> Result<Translation<AvroSchema>> {
        let renamed = self.apply_renames(schema)?;

        let mut root = FieldType::row(renamed.clone());
        if let Some(name) = &self.record_name {
            root = root.with_native_name(name.clone());
        }
        let native =
            self.mapper
                .to_native_named(&root, DEFAULT_RECORD_NAME, self.namespace.as_deref())?;

        let round_trip = self.mapper.to_generic(&native)?;
        let mut advisories = Vec::new();
        generic_diff(
            &FieldType::row(renamed),
            &round_trip,
            &FieldPath::root(),
            &mut advisories,
        );
        log_advisories(&advisories);

        tracing::debug!(
            fields = schema.len(),
            advisories = advisories.len(),
            "translated generic schema to native schema"
        );
        Ok(Translation {
            schema: native,
            advisories,
        })
    }

    fn row_schema(&self, field_type: FieldType) -> Result<Arc<Schema>> {
        match field_type.data_type {
            DataType::Row(schema) => Ok(schema),
            other => Err(ConversionError::unsupported(format!(
                "expected a record, got {}",
                other
            ))),
        }
    }

    fn apply_renames(&self, schema: &Schema) -> Result<Arc<Schema>> {
        if self.renames.is_empty() {
            return Ok(Arc::new(schema.clone()));
        }

        for source in self.renames.keys() {
            if source.contains('.') || !schema.has_field(source) {
                tracing::debug!(field = %source, "rename names no top-level field, ignored");
            }
        }

        let mut builder = SchemaBuilder::new();
        if let Some(name) = schema.native_name() {
            builder = builder.with_name(name);
        }
        for field in schema.fields() {
            match self.renames.get(field.name()) {
                Some(target) => builder = builder.add(field.clone().with_name(target.clone())),
                None => builder = builder.add(field.clone()),
            }
        }
        Ok(Arc::new(builder.build()?))
    }
}

impl Default for SchemaTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for schema translators
#[derive(Default)]
pub struct TranslatorBuilder {
    catalog: Option<Arc<LogicalTypeCatalog>>,
    record_name: Option<String>,
    namespace: Option<String>,
    renames: HashMap<String, String>,
}

impl TranslatorBuilder {
    /// Name of the outermost native record; defaults to the generic schema's
    /// own native name, then to `topLevelRecord`
    pub fn record_name<S: Into<String>>(mut self, name: S) -> Self {
        self.record_name = Some(name.into());
        self
    }

    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Expose top-level field `from` as `to` in translated schemas
    pub fn rename<F: Into<String>, T: Into<String>>(mut self, from: F, to: T) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn catalog(mut self, catalog: Arc<LogicalTypeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> SchemaTranslator {
        let mapper = match self.catalog {
            Some(catalog) => TypeMapper::with_catalog(catalog),
            None => TypeMapper::new(),
        };
        SchemaTranslator {
            mapper,
            record_name: self.record_name,
            namespace: self.namespace,
            renames: self.renames,
        }
    }
}

fn log_advisories(advisories: &[Advisory]) {
    for advisory in advisories {
        tracing::debug!(
            path = %advisory.path,
            original = %advisory.original,
            round_trip = %advisory.round_trip,
            "field type changes on schema round trip"
        );
    }
}

fn advise(path: &FieldPath, original: String, round_trip: String, out: &mut Vec<Advisory>) {
    out.push(Advisory {
        path: path.clone(),
        original,
        round_trip,
    });
}

/// Compare two generic field types, recursing into rows, arrays and maps
fn generic_diff(a: &FieldType, b: &FieldType, path: &FieldPath, out: &mut Vec<Advisory>) {
    if a.nullable != b.nullable {
        advise(path, a.to_string(), b.to_string(), out);
        return;
    }

    match (&a.data_type, &b.data_type) {
        (DataType::Row(left), DataType::Row(right)) if left.len() == right.len() => {
            for (l, r) in left.fields().iter().zip(right.fields()) {
                let child = path.child(PathSegment::Field(l.name().to_string()));
                if l.name() != r.name() {
                    advise(&child, l.name().to_string(), r.name().to_string(), out);
                    continue;
                }
                generic_diff(l.field_type(), r.field_type(), &child, out);
            }
        }
        (DataType::Array(left), DataType::Array(right)) => generic_diff(left, right, path, out),
        (DataType::Map(lk, lv), DataType::Map(rk, rv)) => {
            generic_diff(lk, rk, path, out);
            generic_diff(lv, rv, path, out);
        }
        _ => {
            if a != b {
                advise(path, a.to_string(), b.to_string(), out);
            }
        }
    }
}

/// Compare two native schemas, recursing into records, unions, arrays and maps
fn native_diff(a: &AvroSchema, b: &AvroSchema, path: &FieldPath, out: &mut Vec<Advisory>) {
    match (a, b) {
        (AvroSchema::Record(left), AvroSchema::Record(right))
            if left.fields.len() == right.fields.len() =>
        {
            for (l, r) in left.fields.iter().zip(&right.fields) {
                let child = path.child(PathSegment::Field(l.name.clone()));
                if l.name != r.name {
                    advise(&child, l.name.clone(), r.name.clone(), out);
                    continue;
                }
                native_diff(&l.schema, &r.schema, &child, out);
            }
        }
        (AvroSchema::Union(left), AvroSchema::Union(right))
            if left.variants().len() == right.variants().len() =>
        {
            let before = out.len();
            for (l, r) in left.variants().iter().zip(right.variants()) {
                native_diff(l, r, path, out);
            }
            // Reordered branches show up as two mismatches; report the union once
            if out.len() > before + 1 {
                out.truncate(before);
                advise(path, native_signature(a), native_signature(b), out);
            }
        }
        (AvroSchema::Array(left), AvroSchema::Array(right)) => {
            native_diff(&left.items, &right.items, path, out)
        }
        (AvroSchema::Map(left), AvroSchema::Map(right)) => {
            native_diff(&left.types, &right.types, path, out)
        }
        _ => {
            let (left, right) = (native_signature(a), native_signature(b));
            if left != right {
                advise(path, left, right, out);
            }
        }
    }
}

/// JSON rendering of a native schema without documentation-only attributes
fn native_signature(schema: &AvroSchema) -> String {
    fn strip(value: &mut JsonValue) {
        match value {
            JsonValue::Object(map) => {
                map.remove("doc");
                map.remove("aliases");
                map.values_mut().for_each(strip);
            }
            JsonValue::Array(items) => items.iter_mut().for_each(strip),
            _ => {}
        }
    }

    match serde_json::to_value(schema) {
        Ok(mut json) => {
            strip(&mut json);
            json.to_string()
        }
        Err(e) => format!("<unprintable schema: {}>", e),
    }
}
