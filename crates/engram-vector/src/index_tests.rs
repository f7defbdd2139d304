use super::*;

#[test]
fn test_insert_and_contains() {
    let index = VectorIndex::new();
    index.insert("a".to_string(), vec![1.0, 0.0, 0.0]).unwrap();
    assert!(index.contains("a"));
    assert!(!index.contains("b"));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_first_insert_fixes_dimension() {
    let index = VectorIndex::new();
    assert_eq!(index.dimension(), None);

    index.insert("a".to_string(), vec![1.0, 0.0, 0.0]).unwrap();
    assert_eq!(index.dimension(), Some(3));

    let err = index.insert("b".to_string(), vec![1.0, 0.0]).unwrap_err();
    assert!(matches!(
        err,
        IndexError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[test]
fn test_empty_vector_rejected() {
    let index = VectorIndex::new();
    let err = index.insert("a".to_string(), vec![]).unwrap_err();
    assert!(matches!(err, IndexError::EmptyVector));
}

#[test]
fn test_remove() {
    let index = VectorIndex::new();
    index.insert("a".to_string(), vec![1.0, 0.0]).unwrap();
    assert!(index.remove("a"));
    assert!(!index.remove("a"));
    assert!(index.is_empty());
}

#[test]
fn test_nearest_ordering() {
    let index = VectorIndex::new();
    index.insert("exact".to_string(), vec![1.0, 0.0, 0.0]).unwrap();
    index.insert("close".to_string(), vec![0.9, 0.1, 0.0]).unwrap();
    index.insert("far".to_string(), vec![0.0, 1.0, 0.0]).unwrap();

    let results = index.nearest(&[1.0, 0.0, 0.0], 2);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "exact");
    assert!((results[0].1 - 1.0).abs() < 1e-6);
    assert_eq!(results[1].0, "close");
}

#[test]
fn test_nearest_truncates_to_k() {
    let index = VectorIndex::new();
    for i in 0..10 {
        index
            .insert(format!("item-{}", i), vec![1.0, 0.0])
            .unwrap();
    }
    assert_eq!(index.nearest(&[1.0, 0.0], 3).len(), 3);
}

#[test]
fn test_nearest_empty_index() {
    let index = VectorIndex::new();
    assert!(index.nearest(&[1.0, 0.0], 5).is_empty());
}

#[test]
fn test_nearest_ties_broken_by_id() {
    let index = VectorIndex::new();
    // All identical vectors: every score ties at 1.0.
    index.insert("c".to_string(), vec![1.0, 0.0]).unwrap();
    index.insert("a".to_string(), vec![1.0, 0.0]).unwrap();
    index.insert("b".to_string(), vec![1.0, 0.0]).unwrap();

    let results = index.nearest(&[1.0, 0.0], 3);
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_insert_overwrite_keeps_len() {
    let index = VectorIndex::new();
    index.insert("a".to_string(), vec![1.0, 0.0]).unwrap();
    index.insert("a".to_string(), vec![0.0, 1.0]).unwrap();
    assert_eq!(index.len(), 1);

    let results = index.nearest(&[0.0, 1.0], 1);
    assert!((results[0].1 - 1.0).abs() < 1e-6);
}
