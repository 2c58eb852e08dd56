mod schema;

pub use schema::SchemaInspector;
