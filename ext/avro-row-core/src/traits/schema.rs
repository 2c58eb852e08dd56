use crate::schema::{DataType, FieldType, Schema};

/// Trait for schema introspection
///
/// This trait provides methods for examining and querying schemas
/// without modifying them.
pub trait SchemaInspector {
    /// Get the total number of fields (including nested)
    fn field_count(&self) -> usize;

    /// Get a field type by path (e.g., "address.city", "scores.item", "tags.value")
    fn get_field_by_path(&self, path: &str) -> Option<&FieldType>;

    /// Check if schema contains a specific field
    fn has_field(&self, name: &str) -> bool;

    /// Get all field paths in the schema
    fn all_field_paths(&self) -> Vec<String>;
}

impl SchemaInspector for Schema {
    fn field_count(&self) -> usize {
        self.fields()
            .iter()
            .map(|f| count_fields(f.field_type()))
            .sum()
    }

    fn get_field_by_path(&self, path: &str) -> Option<&FieldType> {
        let parts: Vec<&str> = path.split('.').collect();
        let (first, rest) = parts.split_first()?;
        let field = self.field_by_name(first)?;
        get_field_by_path_parts(field.field_type(), rest)
    }

    fn has_field(&self, name: &str) -> bool {
        self.get_field_by_path(name).is_some()
    }

    fn all_field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for field in self.fields() {
            collect_field_paths(field.field_type(), field.name().to_string(), &mut paths);
        }
        paths
    }
}

// Helper functions for schema inspection
fn count_fields(field_type: &FieldType) -> usize {
    match &field_type.data_type {
        DataType::Row(schema) => 1 + schema.field_count(),
        DataType::Array(item) => 1 + count_fields(item),
        DataType::Map(key, value) => 1 + count_fields(key) + count_fields(value),
        _ => 1,
    }
}

fn get_field_by_path_parts<'a>(field_type: &'a FieldType, parts: &[&str]) -> Option<&'a FieldType> {
    let Some((first, rest)) = parts.split_first() else {
        return Some(field_type);
    };

    match &field_type.data_type {
        DataType::Row(schema) => schema
            .field_by_name(first)
            .and_then(|f| get_field_by_path_parts(f.field_type(), rest)),
        DataType::Array(item) if *first == "item" => get_field_by_path_parts(item, rest),
        DataType::Map(key, value) => match *first {
            "key" => get_field_by_path_parts(key, rest),
            "value" => get_field_by_path_parts(value, rest),
            _ => None,
        },
        _ => None,
    }
}

fn collect_field_paths(field_type: &FieldType, current_path: String, paths: &mut Vec<String>) {
    paths.push(current_path.clone());

    match &field_type.data_type {
        DataType::Row(schema) => {
            for field in schema.fields() {
                collect_field_paths(
                    field.field_type(),
                    format!("{}.{}", current_path, field.name()),
                    paths,
                );
            }
        }
        DataType::Array(item) => {
            collect_field_paths(item, format!("{}.item", current_path), paths);
        }
        DataType::Map(key, value) => {
            collect_field_paths(key, format!("{}.key", current_path), paths);
            collect_field_paths(value, format!("{}.value", current_path), paths);
        }
        _ => {}
    }
}
