//! Bidirectional schema and value conversion between Avro and generic rows
//!
//! `avro-row-core` translates Avro record schemas into the statically typed
//! row schemas used by data-processing engines, and converts record values
//! between the two representations in both directions.
//!
//! # Key Components
//!
//! - **TypeMapper**: Single type descriptor mapping
//!   - Owns the asymmetry table (`INT16` has no native counterpart)
//!   - Encodes nullability as `["null", T]` unions on the native side
//!   - Names native records, enums and fixed types
//!
//! - **SchemaTranslator**: Whole-schema translation
//!   - Preserves field order and field count
//!   - Reports fields whose type would change on a round trip as advisories
//!
//! - **ValueConverter**: Value tree conversion driven by a schema pair
//!   - Pure and stateless; safe to share across threads
//!   - Errors carry the field path of the failing value
//!
//! - **LogicalTypeCatalog**: Registry of logical types
//!   - decimal, date, timestamp-millis, enum and fixed codecs
//!
//! - **Schema / Row**: The generic data model
//!   - Builder API for constructing schemas and rows
//!   - Schema introspection through the [`traits::SchemaInspector`] trait
//!
//! # Design Philosophy
//!
//! Native schemas and values are `apache_avro` types; this crate never reads
//! or writes Avro containers itself. Host-type reflection lives in
//! `avro-row-reflect`, which plugs into [`adapter::RecordAdapter`].

pub mod adapter;
pub mod converter;
pub mod decimal;
pub mod error;
pub mod logical;
pub mod schema;
pub mod traits;
pub mod translator;
pub mod type_mapper;
pub mod value;

#[cfg(test)]
pub mod test_utils;

pub use adapter::{GenericRecordAdapter, GenericRowConverter, RecordAdapter, RowConverter};
pub use converter::{NativeNames, ValueConverter};
pub use decimal::Decimal;
pub use error::{ConversionError, ErrorContext, FieldPath, PathSegment, Result};
pub use logical::{LogicalCodec, LogicalTypeCatalog, REFERENCE_TIME_ZONE};
pub use schema::{DataType, Field, FieldType, NativeName, Schema, SchemaBuilder};
pub use translator::{Advisory, SchemaTranslator, Translation, TranslatorBuilder};
pub use type_mapper::{TypeMapper, DEFAULT_RECORD_NAME};
pub use value::{Row, RowBuilder, RowValue};

pub use apache_avro::schema::Schema as AvroSchema;
pub use apache_avro::types::Value as AvroValue;
