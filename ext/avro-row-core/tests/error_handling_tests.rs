
use avro_row_core::*;
use bytes::Bytes;
use std::sync::Arc;
use test_helpers::*;

fn record_with(name: &str, replacement: AvroValue) -> AvroValue {
    let AvroValue::Record(mut fields) = test_avro_record() else {
        unreachable!()
    };
    for (field, value) in fields.iter_mut() {
        if field == name {
            *value = replacement.clone();
        }
    }
    AvroValue::Record(fields)
}

fn to_row(record: &AvroValue) -> Result<Row> {
    ValueConverter::new().record_to_row(
        record,
        &test_avro_native_schema(),
        &test_avro_schema_no_int16(),
    )
}

#[test]
fn test_fixed_size_mismatch() {
    for bad in [vec![1u8, 2, 3], vec![1u8, 2, 3, 4, 5]] {
        let len = bad.len();
        let err = to_row(&record_with("fixed", AvroValue::Fixed(len, bad))).unwrap_err();
        match &err {
            ConversionError::SizeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(*expected, 4);
                assert_eq!(*actual, len);
            }
            other => panic!("expected a size mismatch, got {:?}", other),
        }
        assert_eq!(err.path().unwrap().to_string(), "fixed");
    }
}

#[test]
fn test_fixed_size_mismatch_on_write() {
    let native = AvroSchema::parse_str(r#"{"type": "fixed", "name": "fixed4", "size": 4}"#).unwrap();
    let err = ValueConverter::new()
        .to_native(
            &RowValue::Bytes(Bytes::from_static(&[1, 2])),
            &FieldType::fixed_bytes(2),
            &native,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ConversionError::SizeMismatch {
            expected: 4,
            actual: 2,
            ..
        }
    ));
}

#[test]
fn test_unknown_enum_symbol() {
    let err = to_row(&record_with(
        "TestEnum",
        AvroValue::Enum(5, "xyz".to_string()),
    ))
    .unwrap_err();
    assert!(matches!(err, ConversionError::UnknownEnumSymbol { .. }));
    assert_eq!(err.path().unwrap().to_string(), "TestEnum");

    let native =
        AvroSchema::parse_str(r#"{"type": "enum", "name": "TestEnum", "symbols": ["abc", "cde"]}"#)
            .unwrap();
    let err = ValueConverter::new()
        .to_native(
            &RowValue::enum_symbol("xyz"),
            &FieldType::enumeration(["abc", "cde", "xyz"]),
            &native,
        )
        .unwrap_err();
    match err {
        ConversionError::UnknownEnumSymbol {
            symbol, symbols, ..
        } => {
            assert_eq!(symbol, "xyz");
            assert_eq!(symbols, vec!["abc", "cde"]);
        }
        other => panic!("expected an unknown symbol, got {:?}", other),
    }
}

#[test]
fn test_enum_ordinal_out_of_range() {
    let native =
        AvroSchema::parse_str(r#"{"type": "enum", "name": "TestEnum", "symbols": ["abc", "cde"]}"#)
            .unwrap();
    let err = ValueConverter::new()
        .to_generic(
            &AvroValue::Int(2),
            &native,
            &FieldType::enumeration(["abc", "cde"]),
        )
        .unwrap_err();
    assert!(matches!(err, ConversionError::UnknownEnumSymbol { .. }));
}

#[test]
fn test_error_path_inside_map() {
    let broken_nested = AvroValue::Record(vec![
        ("BOOL_NON_NULLABLE".to_string(), AvroValue::Null),
        ("int".to_string(), AvroValue::Int(1)),
    ]);
    let map = AvroValue::Map(
        [("k1".to_string(), AvroValue::Union(1, Box::new(broken_nested)))]
            .into_iter()
            .collect(),
    );
    let err = to_row(&record_with("map", AvroValue::Union(1, Box::new(map)))).unwrap_err();
    assert!(matches!(err, ConversionError::UnexpectedNull { .. }));
    assert_eq!(
        err.path().unwrap().to_string(),
        r#"map["k1"].BOOL_NON_NULLABLE"#
    );
}

#[test]
fn test_error_path_inside_array_on_write() {
    let schema = Arc::new(
        Schema::builder()
            .add_field("fixed", FieldType::array(FieldType::fixed_bytes(2)))
            .build()
            .unwrap(),
    );
    let native = AvroSchema::parse_str(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "fixed", "type": {"type": "array", "items": {"type": "fixed", "name": "f3", "size": 3}}}
        ]}"#,
    )
    .unwrap();
    let row = Row::new(
        schema,
        vec![RowValue::Array(vec![
            RowValue::from(vec![1u8, 2]),
            RowValue::from(vec![3u8, 4]),
        ])],
    )
    .unwrap();

    let err = ValueConverter::new().row_to_record(&row, &native).unwrap_err();
    assert!(matches!(err, ConversionError::SizeMismatch { .. }));
    assert_eq!(err.path().unwrap().to_string(), "fixed[0]");
    assert!(err.to_string().starts_with("Size mismatch at fixed[0]"));
}

#[test]
fn test_type_mismatch() {
    let err = to_row(&record_with(
        "string",
        AvroValue::Union(1, Box::new(AvroValue::Long(1))),
    ))
    .unwrap_err();
    assert!(matches!(err, ConversionError::SchemaMismatch { .. }));
    assert_eq!(err.path().unwrap().to_string(), "string");
}

#[test]
fn test_union_branch_out_of_range() {
    let err = to_row(&record_with(
        "int",
        AvroValue::Union(7, Box::new(AvroValue::Int(1))),
    ))
    .unwrap_err();
    assert!(matches!(err, ConversionError::SchemaMismatch { .. }));
}

#[test]
fn test_field_count_mismatch() {
    let err = ValueConverter::new()
        .record_to_row(
            &test_avro_record(),
            &test_avro_native_schema(),
            &nested_schema(),
        )
        .unwrap_err();
    assert!(matches!(err, ConversionError::SchemaMismatch { .. }));

    let err = ValueConverter::new()
        .row_to_record(&nested_row(), &test_avro_native_schema())
        .unwrap_err();
    assert!(matches!(err, ConversionError::SchemaMismatch { .. }));
}

#[test]
fn test_record_conversion_requires_record_schema() {
    let err = ValueConverter::new()
        .record_to_row(&nested_record(), &AvroSchema::Int, &nested_schema())
        .unwrap_err();
    assert!(matches!(err, ConversionError::SchemaMismatch { .. }));

    let err = ValueConverter::new()
        .record_to_row(&AvroValue::Int(1), &nested_native_schema(), &nested_schema())
        .unwrap_err();
    assert!(matches!(err, ConversionError::SchemaMismatch { .. }));
}

#[test]
fn test_missing_field_value() {
    let record = AvroValue::Record(vec![(
        "BOOL_NON_NULLABLE".to_string(),
        AvroValue::Boolean(true),
    )]);
    let err = ValueConverter::new()
        .record_to_row(&record, &nested_native_schema(), &nested_schema())
        .unwrap_err();
    assert!(matches!(err, ConversionError::SchemaMismatch { .. }));
    assert_eq!(err.path().unwrap().to_string(), "int");
}

#[test]
fn test_builder_errors() {
    let err = Schema::builder()
        .add_field("a", FieldType::int32())
        .add_field("a", FieldType::int64())
        .build()
        .unwrap_err();
    assert!(matches!(err, ConversionError::InvalidSchema(_)));
    assert!(err.path().is_none());

    let err = Row::with_schema(nested_schema())
        .add_value("not a boolean")
        .add_value(1i32)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConversionError::SchemaMismatch { .. }));
    assert_eq!(err.path().unwrap().to_string(), "BOOL_NON_NULLABLE");
}
