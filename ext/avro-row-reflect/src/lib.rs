//! Schema derivation and row conversion for typed host structs
//!
//! A host struct describes its fields once, through a declarative
//! [`RecordDescriptor`] returned by its [`Reflect`] impl. From that table
//! this crate derives:
//!
//! - the generic row schema and the native Avro schema of the struct
//! - a `to_row` / `from_row` converter pair built on `avro-row-core`
//!
//! # Field annotations
//!
//! - **rename**: expose the field under another name
//! - **type override**: force the data type, logical type parameters included
//! - **nullable override**: force optionality either way
//! - **exclude**: drop the field; it is never written and serde defaults it on read
//!
//! Host values move to native values through their serde form (the
//! `apache_avro` serializer), so host types only need `Serialize` and
//! `Deserialize`.

pub mod bridge;
pub mod converter;
pub mod derive;
pub mod descriptor;
pub mod error;

pub use bridge::SpecificRecordAdapter;
pub use converter::ReflectedConverter;
pub use derive::{declared_schema, DerivedSchema, ReflectionSchemaDeriver};
pub use descriptor::{FieldDescriptor, HostType, RecordDescriptor, Reflect};
pub use error::{ReflectError, Result};
