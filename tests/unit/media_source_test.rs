use super::common::*;
use mediaflow::mediaflow::kafka::serialization::{from_json, to_json};

#[test]
fn test_parsed_records_survive_the_wire() {
    let records = RecordSource::default()
        .parse(EMBEDDED_MEDIA_CSV.as_bytes())
        .unwrap();
    assert_eq!(records.len(), 8);

    for record in &records {
        let payload = to_json(record).unwrap();
        let decoded: MediaRecord = from_json(&payload).unwrap();
        assert_eq!(&decoded, record);
    }
}

#[test]
fn test_wire_format_uses_field_names() {
    let record = MediaRecord::new("Movie A", "2020", "2020-01-01", "desc", "42", "100");
    let value: serde_json::Value = serde_json::from_slice(&to_json(&record).unwrap()).unwrap();

    assert_eq!(
        value,
        serde_json::json!({
            "title": "Movie A",
            "added_year": "2020",
            "added_date": "2020-01-01",
            "description": "desc",
            "userid": "42",
            "videoid": "100"
        })
    );
}

#[test]
fn test_payload_missing_a_field_is_rejected() {
    let payload = br#"{"title":"Movie A","added_year":"2020","added_date":"2020-01-01","description":"desc","userid":"42"}"#;
    assert!(from_json::<MediaRecord>(payload).is_err());
}

#[test]
fn test_streaming_yields_rows_before_the_error() {
    let input = "A$1$2020-01-01$d$1$1\nB$2$2020-01-01$d$2$2\nC$3\nD$4$2020-01-01$d$4$4\n";
    let mut records = RecordSource::default().records(input.as_bytes());

    assert_eq!(records.next().unwrap().unwrap().title, "A");
    assert_eq!(records.next().unwrap().unwrap().title, "B");
    match records.next() {
        Some(Err(ParseError::MissingColumns {
            line,
            found,
            expected,
        })) => {
            assert_eq!(line, 3);
            assert_eq!(found, 2);
            assert_eq!(expected, MediaRecord::FIELD_COUNT);
        }
        other => panic!("expected missing columns, got {:?}", other),
    }
    assert!(records.next().is_none());
}

#[test]
fn test_custom_delimiter() {
    let records = RecordSource::new(b'|')
        .parse("Movie A|2020|2020-01-01|a$b|42|100\n".as_bytes())
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].description, "a$b");
}

#[test]
fn test_empty_input_yields_nothing() {
    assert!(RecordSource::default().parse("".as_bytes()).unwrap().is_empty());
    assert!(RecordSource::default().parse("\n\n".as_bytes()).unwrap().is_empty());
}

#[test]
fn test_display_names_every_field() {
    let record = MediaRecord::new("Movie A", "2020", "2020-01-01", "desc", "42", "100");
    let shown = record.to_string();

    for field in ["Movie A", "2020-01-01", "desc", "42", "100"] {
        assert!(shown.contains(field), "{} missing from {}", field, shown);
    }
}
