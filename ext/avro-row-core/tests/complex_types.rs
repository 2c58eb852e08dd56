
use avro_row_core::*;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use test_helpers::*;

fn map_of_nested_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .add_nullable_field("map", FieldType::map(FieldType::string(), nested_type()))
            .build()
            .unwrap(),
    )
}

#[test]
fn test_map_of_rows_preserves_keys_and_nested_values() {
    let schema = map_of_nested_schema();
    let native = SchemaTranslator::new().to_native(&schema).unwrap().into_schema();

    let mut entries = IndexMap::new();
    entries.insert(RowValue::from("k1"), RowValue::Row(nested_row()));
    let row = Row::new(schema.clone(), vec![RowValue::Map(entries)]).unwrap();

    let converter = ValueConverter::new();
    let record = converter.row_to_record(&row, &native).unwrap();

    let AvroValue::Record(fields) = &record else {
        panic!("expected a native record");
    };
    let AvroValue::Union(1, map) = &fields[0].1 else {
        panic!("expected a non-null union branch");
    };
    let AvroValue::Map(map) = map.as_ref() else {
        panic!("expected a native map");
    };
    assert_eq!(map.len(), 1);
    assert_eq!(
        map.get("k1"),
        Some(&AvroValue::Union(1, Box::new(nested_record())))
    );

    let back = converter.record_to_row(&record, &native, &schema).unwrap();
    assert_eq!(back, row);

    let RowValue::Map(entries) = back.get(0).unwrap() else {
        panic!("expected a map value");
    };
    let nested = entries.get(&RowValue::from("k1")).unwrap().as_row().unwrap();
    assert_eq!(
        nested.values(),
        &[RowValue::Boolean(true), RowValue::Int32(42)]
    );
    assert_eq!(nested.schema().fields()[0].name(), "BOOL_NON_NULLABLE");
}

#[test]
fn test_map_entries_come_back_sorted_by_key() {
    let native = AvroSchema::parse_str(r#"{"type": "map", "values": "long"}"#).unwrap();
    let field_type = FieldType::map(FieldType::string(), FieldType::int64());

    let entries: HashMap<String, AvroValue> = ["zeta", "alpha", "mid"]
        .iter()
        .enumerate()
        .map(|(i, k)| (k.to_string(), AvroValue::Long(i as i64)))
        .collect();

    let value = ValueConverter::new()
        .to_generic(&AvroValue::Map(entries), &native, &field_type)
        .unwrap();
    let RowValue::Map(map) = value else {
        panic!("expected a map value");
    };
    let keys: Vec<&str> = map.keys().filter_map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn test_map_equality_ignores_insertion_order() {
    let schema = map_of_nested_schema();

    let mut forward = IndexMap::new();
    forward.insert(RowValue::from("k1"), RowValue::Row(nested_row()));
    forward.insert(RowValue::from("k2"), RowValue::Null);

    let mut backward = IndexMap::new();
    backward.insert(RowValue::from("k2"), RowValue::Null);
    backward.insert(RowValue::from("k1"), RowValue::Row(nested_row()));

    let a = Row::new(schema.clone(), vec![RowValue::Map(forward)]).unwrap();
    let b = Row::new(schema, vec![RowValue::Map(backward)]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_array_order_is_preserved() {
    let native = AvroSchema::parse_str(r#"{"type": "array", "items": "string"}"#).unwrap();
    let field_type = FieldType::array(FieldType::string());
    let value = RowValue::Array(
        ["c", "a", "b"]
            .into_iter()
            .map(RowValue::from)
            .collect(),
    );

    let converter = ValueConverter::new();
    let encoded = converter.to_native(&value, &field_type, &native).unwrap();
    assert_eq!(
        encoded,
        AvroValue::Array(vec![
            AvroValue::String("c".to_string()),
            AvroValue::String("a".to_string()),
            AvroValue::String("b".to_string()),
        ])
    );
    assert_eq!(converter.to_generic(&encoded, &native, &field_type).unwrap(), value);
}

#[test]
fn test_nested_collections() {
    let schema = Arc::new(
        Schema::builder()
            .add_field(
                "matrix",
                FieldType::array(FieldType::array(FieldType::float64())),
            )
            .add_field(
                "tags",
                FieldType::map(
                    FieldType::string(),
                    FieldType::array(FieldType::string()).with_nullable(true),
                ),
            )
            .build()
            .unwrap(),
    );
    let translation = SchemaTranslator::new().to_native(&schema).unwrap();
    assert!(translation.is_lossless());

    let matrix = RowValue::Array(vec![
        RowValue::Array(vec![RowValue::from(1.0f64), RowValue::from(2.0f64)]),
        RowValue::Array(vec![]),
    ]);
    let mut tags = IndexMap::new();
    tags.insert(
        RowValue::from("colors"),
        RowValue::Array(vec![RowValue::from("red"), RowValue::from("blue")]),
    );
    tags.insert(RowValue::from("empty"), RowValue::Null);

    let row = Row::new(schema, vec![matrix, RowValue::Map(tags)]).unwrap();
    assert_record_roundtrip(&row, &translation.schema);
}

#[test]
fn test_deeply_nested_rows() {
    let leaf = Schema::builder()
        .add_field("value", FieldType::int64())
        .build()
        .unwrap();
    let middle = Arc::new(
        Schema::builder()
            .add_field("leaf", FieldType::row(leaf))
            .add_nullable_field("note", FieldType::string())
            .build()
            .unwrap(),
    );
    let root = Arc::new(
        Schema::builder()
            .add_field("middle", FieldType::row(middle.clone()))
            .build()
            .unwrap(),
    );

    let translation = SchemaTranslator::new().to_native(&root).unwrap();
    assert!(translation.is_lossless());

    let DataType::Row(leaf_schema) = middle.fields()[0].data_type() else {
        panic!("expected a row type");
    };
    let leaf_row = Row::new(leaf_schema.clone(), vec![RowValue::Int64(7)]).unwrap();
    let middle_row = Row::new(middle, vec![RowValue::Row(leaf_row), RowValue::from("n")]).unwrap();
    let row = Row::new(root, vec![RowValue::Row(middle_row)]).unwrap();

    assert_record_roundtrip(&row, &translation.schema);
}

#[test]
fn test_repeated_record_is_emitted_once() {
    let translation = SchemaTranslator::new()
        .to_native(&test_avro_schema_no_int16())
        .unwrap();
    let json = schema_json(&translation.schema).to_string();
    assert_eq!(json.matches(r#""fields""#).count(), 2);
}

#[test]
fn test_different_records_with_the_same_name() {
    let other = Arc::new(
        Schema::builder()
            .with_name("TestAvroNested")
            .add_field("code", FieldType::string())
            .build()
            .unwrap(),
    );
    let nested = nested_schema_named();
    let schema = Arc::new(
        Schema::builder()
            .add_field("first", FieldType::row(nested.clone()))
            .add_field("second", FieldType::row(other.clone()))
            .build()
            .unwrap(),
    );

    let translation = SchemaTranslator::new().to_native(&schema).unwrap();
    assert!(translation.is_lossless());
    let AvroSchema::Record(record) = &translation.schema else {
        panic!("expected a record schema");
    };
    let AvroSchema::Record(second) = &record.fields[1].schema else {
        panic!("expected an inline record definition");
    };
    assert_eq!(second.name.fullname(None), "TestAvroNested_2");

    let row = Row::new(
        schema,
        vec![
            RowValue::Row(nested_row_with(nested)),
            RowValue::Row(Row::new(other, vec![RowValue::from("x")]).unwrap()),
        ],
    )
    .unwrap();
    assert_record_roundtrip(&row, &translation.schema);
}

fn nested_schema_named() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .with_name("TestAvroNested")
            .add_field("BOOL_NON_NULLABLE", FieldType::boolean())
            .add_nullable_field("int", FieldType::int32())
            .build()
            .unwrap(),
    )
}

fn nested_row_with(schema: Arc<Schema>) -> Row {
    Row::new(schema, vec![RowValue::Boolean(true), RowValue::Int32(42)]).unwrap()
}

#[test]
fn test_full_record_round_trip_through_translated_schema() {
    let schema = test_avro_schema_no_int16();
    let native = SchemaTranslator::new().to_native(&schema).unwrap().into_schema();
    assert_record_roundtrip(&test_avro_row_no_int16(), &native);
}
