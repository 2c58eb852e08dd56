//! Test utilities for avro-row-core

#[cfg(test)]
pub mod test {
    use crate::{FieldType, Row, RowValue, Schema};
    use apache_avro::schema::Schema as AvroSchema;
    use apache_avro::types::Value as AvroValue;
    use std::sync::Arc;

    /// Create a simple schema for testing
    pub fn sample_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .with_name("Person")
                .add_field("id", FieldType::int64())
                .add_nullable_field("name", FieldType::string())
                .add_nullable_field("age", FieldType::int32())
                .add_nullable_field("salary", FieldType::float64())
                .build()
                .unwrap(),
        )
    }

    /// The native counterpart of [`sample_schema`]
    pub fn sample_native_schema() -> AvroSchema {
        AvroSchema::parse_str(
            r#"{
                "type": "record",
                "name": "Person",
                "fields": [
                    {"name": "id", "type": "long"},
                    {"name": "name", "type": ["null", "string"]},
                    {"name": "age", "type": ["null", "int"]},
                    {"name": "salary", "type": ["null", "double"]}
                ]
            }"#,
        )
        .unwrap()
    }

    /// Create a sample row matching the simple schema
    pub fn sample_row() -> Row {
        Row::with_schema(sample_schema())
            .add_value(1i64)
            .add_value("Alice")
            .add_value(30i32)
            .add_value(75000.0f64)
            .build()
            .unwrap()
    }

    /// The native record equal to [`sample_row`]
    pub fn sample_record() -> AvroValue {
        AvroValue::Record(vec![
            ("id".to_string(), AvroValue::Long(1)),
            (
                "name".to_string(),
                AvroValue::Union(1, Box::new(AvroValue::String("Alice".to_string()))),
            ),
            (
                "age".to_string(),
                AvroValue::Union(1, Box::new(AvroValue::Int(30))),
            ),
            (
                "salary".to_string(),
                AvroValue::Union(1, Box::new(AvroValue::Double(75000.0))),
            ),
        ])
    }

    /// Create multiple sample rows, every third one without a name
    pub fn sample_rows(count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| {
                let name = if i % 3 == 0 {
                    RowValue::Null
                } else {
                    RowValue::from(format!("Person{}", i))
                };
                Row::with_schema(sample_schema())
                    .add_value(i as i64)
                    .add_value(name)
                    .add_value((20 + i % 50) as i32)
                    .add_value(50000.0 + (i as f64 * 1000.0))
                    .build()
                    .unwrap()
            })
            .collect()
    }
}

#[cfg(test)]
mod test_utils_tests {
    use super::test::*;
    use crate::{SchemaTranslator, ValueConverter};

    #[test]
    fn test_sample_schema_matches_native() {
        let translation = SchemaTranslator::new()
            .to_generic(&sample_native_schema())
            .unwrap();
        assert_eq!(translation.schema, sample_schema());
        assert!(translation.is_lossless());
    }

    #[test]
    fn test_sample_row_matches_record() {
        let converter = ValueConverter::new();
        let record = converter
            .row_to_record(&sample_row(), &sample_native_schema())
            .unwrap();
        assert_eq!(record, sample_record());
    }

    #[test]
    fn test_sample_rows() {
        let rows = sample_rows(10);
        assert_eq!(rows.len(), 10);
        assert!(rows[0].get_by_name("name").unwrap().is_null());
        assert_eq!(rows[4].get_by_name("name").unwrap().as_str(), Some("Person4"));
    }
}
