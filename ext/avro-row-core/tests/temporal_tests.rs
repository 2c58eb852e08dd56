
use avro_row_core::*;
use jiff::civil::date;
use jiff::Timestamp;
use test_helpers::*;

fn date_schema() -> AvroSchema {
    AvroSchema::parse_str(r#"{"type": "int", "logicalType": "date"}"#).unwrap()
}

fn timestamp_schema(unit: &str) -> AvroSchema {
    AvroSchema::parse_str(&format!(r#"{{"type": "long", "logicalType": "{}"}}"#, unit)).unwrap()
}

#[test]
fn test_date_round_trip() {
    let converter = ValueConverter::new();
    let value = RowValue::Date(test_date());

    let encoded = converter
        .to_native(&value, &FieldType::date(), &date_schema())
        .unwrap();
    assert_eq!(encoded, AvroValue::Date(DATE_DAYS));
    assert_eq!(
        converter
            .to_generic(&encoded, &date_schema(), &FieldType::date())
            .unwrap(),
        value
    );
}

#[test]
fn test_dates_before_epoch() {
    let converter = ValueConverter::new();
    let value = RowValue::Date(date(1969, 12, 31));
    let encoded = converter
        .to_native(&value, &FieldType::date(), &date_schema())
        .unwrap();
    assert_eq!(encoded, AvroValue::Date(-1));
    assert_eq!(
        converter
            .to_generic(&encoded, &date_schema(), &FieldType::date())
            .unwrap(),
        value
    );
}

#[test]
fn test_timestamp_millis_round_trip() {
    let converter = ValueConverter::new();
    let value = RowValue::Timestamp(test_timestamp());
    let native = timestamp_schema("timestamp-millis");

    let encoded = converter
        .to_native(&value, &FieldType::timestamp(), &native)
        .unwrap();
    assert_eq!(encoded, AvroValue::TimestampMillis(TIMESTAMP_MILLIS));
    assert_eq!(
        converter
            .to_generic(&encoded, &native, &FieldType::timestamp())
            .unwrap(),
        value
    );
}

#[test]
fn test_sub_millisecond_precision_is_truncated() {
    let converter = ValueConverter::new();
    let native = timestamp_schema("timestamp-millis");

    let precise: Timestamp = "1979-03-14T01:02:03.004999Z".parse().unwrap();
    let encoded = converter
        .to_native(&RowValue::Timestamp(precise), &FieldType::timestamp(), &native)
        .unwrap();
    assert_eq!(encoded, AvroValue::TimestampMillis(TIMESTAMP_MILLIS));

    let micros = timestamp_schema("timestamp-micros");
    let decoded = converter
        .to_generic(
            &AvroValue::TimestampMicros(TIMESTAMP_MILLIS * 1_000 + 999),
            &micros,
            &FieldType::timestamp(),
        )
        .unwrap();
    assert_eq!(decoded, RowValue::Timestamp(test_timestamp()));

    let nanos = timestamp_schema("timestamp-nanos");
    let decoded = converter
        .to_generic(
            &AvroValue::TimestampNanos(TIMESTAMP_MILLIS * 1_000_000 + 999_999),
            &nanos,
            &FieldType::timestamp(),
        )
        .unwrap();
    assert_eq!(decoded, RowValue::Timestamp(test_timestamp()));
}

#[test]
fn test_writes_in_the_native_unit() {
    let converter = ValueConverter::new();
    let value = RowValue::Timestamp(test_timestamp());

    let micros = converter
        .to_native(&value, &FieldType::timestamp(), &timestamp_schema("timestamp-micros"))
        .unwrap();
    assert_eq!(micros, AvroValue::TimestampMicros(TIMESTAMP_MILLIS * 1_000));

    let nanos = converter
        .to_native(&value, &FieldType::timestamp(), &timestamp_schema("timestamp-nanos"))
        .unwrap();
    assert_eq!(nanos, AvroValue::TimestampNanos(TIMESTAMP_MILLIS * 1_000_000));
}

#[test]
fn test_date_into_timestamp_target_is_start_of_day() {
    let converter = ValueConverter::new();
    let decoded = converter
        .to_generic(&AvroValue::Date(DATE_DAYS), &date_schema(), &FieldType::timestamp())
        .unwrap();

    let expected = test_date().to_zoned(REFERENCE_TIME_ZONE).unwrap().timestamp();
    assert_eq!(decoded, RowValue::Timestamp(expected));
    assert_eq!(
        logical::timestamp_millis(expected),
        i64::from(DATE_DAYS) * 86_400_000
    );
}

#[test]
fn test_timestamp_into_date_target_takes_calendar_date() {
    let converter = ValueConverter::new();

    let decoded = converter
        .to_generic(
            &AvroValue::TimestampMillis(TIMESTAMP_MILLIS),
            &timestamp_schema("timestamp-millis"),
            &FieldType::date(),
        )
        .unwrap();
    assert_eq!(decoded, RowValue::Date(test_date()));

    let encoded = converter
        .to_native(
            &RowValue::Timestamp(test_timestamp()),
            &FieldType::timestamp(),
            &date_schema(),
        )
        .unwrap();
    assert_eq!(encoded, AvroValue::Date(DATE_DAYS));
}

#[test]
fn test_date_into_native_timestamp() {
    let encoded = ValueConverter::new()
        .to_native(
            &RowValue::Date(test_date()),
            &FieldType::date(),
            &timestamp_schema("timestamp-millis"),
        )
        .unwrap();
    assert_eq!(
        encoded,
        AvroValue::TimestampMillis(i64::from(DATE_DAYS) * 86_400_000)
    );
}

#[test]
fn test_out_of_range_values_are_invalid() {
    let converter = ValueConverter::new();

    let err = converter
        .to_generic(&AvroValue::Date(i32::MAX), &date_schema(), &FieldType::date())
        .unwrap_err();
    assert!(matches!(err, ConversionError::InvalidValue { .. }));

    let err = converter
        .to_generic(
            &AvroValue::TimestampMillis(i64::MAX),
            &timestamp_schema("timestamp-millis"),
            &FieldType::timestamp(),
        )
        .unwrap_err();
    assert!(matches!(err, ConversionError::InvalidValue { .. }));
}

#[test]
fn test_temporal_fields_in_full_record() {
    let row = ValueConverter::new()
        .record_to_row(
            &test_avro_record(),
            &test_avro_native_schema(),
            &test_avro_schema(),
        )
        .unwrap();
    assert_eq!(row.get_by_name("date"), Some(&RowValue::Date(test_date())));
    assert_eq!(
        row.get_by_name("timestampMillis"),
        Some(&RowValue::Timestamp(test_timestamp()))
    );
}
