use super::*;
use crate::MemoryError;

#[test]
fn test_new_record_defaults() {
    let record = MemoryRecord::new("fn main() {}", ContentType::Code);
    assert!(!record.id.is_empty());
    assert_eq!(record.content, "fn main() {}");
    assert_eq!(record.access_count, 0);
    assert!(!record.is_archived);
    assert!(record.embedding.is_none());
    assert_eq!(record.created_at, record.updated_at);
}

#[test]
fn test_with_embedding_sets_dimension() {
    let record = MemoryRecord::new("text", ContentType::Context)
        .with_embedding(vec![0.1, 0.2, 0.3], "test-model");
    assert_eq!(record.embedding_dimension, Some(3));
    assert_eq!(record.embedding_model.as_deref(), Some("test-model"));
    record.validate().unwrap();
}

#[test]
fn test_validate_empty_content() {
    let record = MemoryRecord::new("   ", ContentType::Context);
    let err = record.validate().unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));
}

#[test]
fn test_validate_empty_id() {
    let record = MemoryRecord::new("text", ContentType::Context).with_id("");
    assert!(record.validate().is_err());
}

#[test]
fn test_validate_dimension_mismatch() {
    let mut record = MemoryRecord::new("text", ContentType::Context)
        .with_embedding(vec![0.1, 0.2], "test-model");
    record.embedding_dimension = Some(5);
    let err = record.validate().unwrap_err();
    assert!(err.to_string().contains("does not match"));
}

#[test]
fn test_validate_missing_model() {
    let mut record = MemoryRecord::new("text", ContentType::Context)
        .with_embedding(vec![0.1, 0.2], "test-model");
    record.embedding_model = None;
    assert!(record.validate().is_err());
}

#[test]
fn test_validate_sentiment_range() {
    let mut record = MemoryRecord::new("text", ContentType::Decision);
    record.sentiment = Some(0.5);
    record.validate().unwrap();
    record.sentiment = Some(1.5);
    assert!(record.validate().is_err());
}

#[test]
fn test_validate_complexity_range() {
    let mut record = MemoryRecord::new("text", ContentType::Learning);
    record.complexity_score = Some(10);
    record.validate().unwrap();
    record.complexity_score = Some(11);
    assert!(record.validate().is_err());
}

#[test]
fn test_content_type_round_trip() {
    for ct in [
        ContentType::Code,
        ContentType::Documentation,
        ContentType::Context,
        ContentType::Output,
        ContentType::Error,
        ContentType::Decision,
        ContentType::Learning,
    ] {
        assert_eq!(ContentType::parse(ct.as_str()), Some(ct));
    }
    assert_eq!(ContentType::parse("bogus"), None);
}

#[test]
fn test_record_serde_round_trip() {
    let record = MemoryRecord::new("some text", ContentType::Documentation)
        .with_keywords(vec!["alpha".to_string(), "beta".to_string()])
        .with_entities(vec![Entity::new("Rust", "LANG")])
        .with_embedding(vec![1.0, 0.0], "test-model")
        .with_format("markdown");

    let json = serde_json::to_string(&record).unwrap();
    let back: MemoryRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, record.id);
    assert_eq!(back.keywords, record.keywords);
    assert_eq!(back.entities, record.entities);
    assert_eq!(back.embedding, record.embedding);
    assert_eq!(back.content_format.as_deref(), Some("markdown"));
}
