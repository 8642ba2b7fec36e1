//! End-to-end tests of the full pipeline against the in-memory backend.

mod mem_backend;

use mem_backend::{entity, MemBackend};
use starlake::{
    execute_query, DataSourceDescriptor, NamedNode, QueryEvaluationError, QueryOptions,
    ResultValue, SourceCatalog, SourceDataType, SourceFormat,
};
use std::collections::BTreeMap;

const EX: &str = "http://example.com/";

fn iri(local: &str) -> String {
    format!("{EX}{local}")
}

fn descriptor(
    id: &str,
    datatypes: &[(&str, SourceDataType)],
    null_counts: &[(&str, u64)],
) -> DataSourceDescriptor {
    DataSourceDescriptor::new(
        id,
        format!("/data/{id}.csv"),
        SourceFormat::Csv,
        BTreeMap::new(),
        datatypes
            .iter()
            .map(|(local, datatype)| (NamedNode::new_unchecked(iri(local)), *datatype))
            .collect(),
        null_counts
            .iter()
            .map(|(local, count)| (NamedNode::new_unchecked(iri(local)), *count))
            .collect(),
    )
}

fn people_backend() -> MemBackend {
    MemBackend::default().with_table(
        "people",
        vec![
            entity(
                &iri("alice"),
                &[
                    ("http://example.com/hasName", ResultValue::String("alice".to_owned())),
                    ("http://example.com/age", ResultValue::Int(42)),
                    ("http://example.com/worksAt", ResultValue::String(iri("acme"))),
                ],
            ),
            entity(
                &iri("bob"),
                &[
                    ("http://example.com/hasName", ResultValue::String("bob".to_owned())),
                    ("http://example.com/age", ResultValue::Int(19)),
                    ("http://example.com/worksAt", ResultValue::String(iri("initech"))),
                ],
            ),
        ],
    )
}

fn people_catalog() -> SourceCatalog {
    SourceCatalog::new(vec![descriptor(
        "people",
        &[
            ("hasName", SourceDataType::String),
            ("age", SourceDataType::Int),
            ("worksAt", SourceDataType::Iri),
        ],
        &[],
    )])
}

#[tokio::test]
async fn single_star_projects_the_selected_column() {
    let (result, explanation) = execute_query(
        &people_backend(),
        "SELECT ?name WHERE { ?p <http://example.com/hasName> ?name }",
        &people_catalog(),
        &QueryOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(explanation.star_count, 1);
    assert!(explanation.join_sequence.is_empty());

    let columns = result.columns();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].name, "name");
    assert_eq!(columns[0].data_type, SourceDataType::String);
    assert!(!columns[0].nullable);

    assert_eq!(result.len(), 2);
    assert_eq!(
        result.value(0, "name"),
        Some(&ResultValue::String("alice".to_owned()))
    );
    assert_eq!(
        result.value(1, "name"),
        Some(&ResultValue::String("bob".to_owned()))
    );
}

#[tokio::test]
async fn join_combines_two_stars_on_the_shared_variable() {
    let backend = people_backend().with_table(
        "companies",
        vec![
            entity(
                &iri("acme"),
                &[("http://example.com/locatedIn", ResultValue::String("berlin".to_owned()))],
            ),
            entity(
                &iri("initech"),
                &[("http://example.com/locatedIn", ResultValue::String("vienna".to_owned()))],
            ),
        ],
    );
    let catalog = SourceCatalog::new(vec![
        descriptor(
            "people",
            &[
                ("hasName", SourceDataType::String),
                ("worksAt", SourceDataType::Iri),
            ],
            &[],
        ),
        descriptor("companies", &[("locatedIn", SourceDataType::String)], &[]),
    ]);

    let (result, explanation) = execute_query(
        &backend,
        "SELECT ?name ?l WHERE { \
            ?p <http://example.com/hasName> ?name . \
            ?p <http://example.com/worksAt> ?c . \
            ?c <http://example.com/locatedIn> ?l . \
        }",
        &catalog,
        &QueryOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(explanation.star_count, 2);
    assert_eq!(explanation.join_sequence.len(), 1);
    assert_eq!(explanation.join_sequence[0].variable.as_str(), "c");

    assert_eq!(result.len(), 2);
    assert_eq!(
        result.value(0, "name"),
        Some(&ResultValue::String("alice".to_owned()))
    );
    assert_eq!(
        result.value(0, "l"),
        Some(&ResultValue::String("berlin".to_owned()))
    );
    assert_eq!(
        result.value(1, "name"),
        Some(&ResultValue::String("bob".to_owned()))
    );
    assert_eq!(
        result.value(1, "l"),
        Some(&ResultValue::String("vienna".to_owned()))
    );
}

#[tokio::test]
async fn filters_restrict_rows_at_fetch_time() {
    let (result, explanation) = execute_query(
        &people_backend(),
        "SELECT ?name WHERE { \
            ?p <http://example.com/hasName> ?name . \
            ?p <http://example.com/age> ?age . \
            FILTER(?age > 30) \
        }",
        &people_catalog(),
        &QueryOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(explanation.filters_applied.get("?p"), Some(&1));
    assert_eq!(result.len(), 1);
    assert_eq!(
        result.value(0, "name"),
        Some(&ResultValue::String("alice".to_owned()))
    );
}

#[tokio::test]
async fn distinct_ordering_and_limit_shape_the_output() {
    let backend = MemBackend::default().with_table(
        "people",
        vec![
            entity(
                &iri("a1"),
                &[("http://example.com/hasName", ResultValue::String("bob".to_owned()))],
            ),
            entity(
                &iri("a2"),
                &[("http://example.com/hasName", ResultValue::String("alice".to_owned()))],
            ),
            entity(
                &iri("a3"),
                &[("http://example.com/hasName", ResultValue::String("bob".to_owned()))],
            ),
            entity(
                &iri("a4"),
                &[("http://example.com/hasName", ResultValue::String("carol".to_owned()))],
            ),
        ],
    );
    let catalog = SourceCatalog::new(vec![descriptor(
        "people",
        &[("hasName", SourceDataType::String)],
        &[],
    )]);

    let (result, _) = execute_query(
        &backend,
        "SELECT DISTINCT ?name WHERE { ?p <http://example.com/hasName> ?name } \
         ORDER BY DESC(?name) LIMIT 2",
        &catalog,
        &QueryOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(
        result.value(0, "name"),
        Some(&ResultValue::String("carol".to_owned()))
    );
    assert_eq!(
        result.value(1, "name"),
        Some(&ResultValue::String("bob".to_owned()))
    );
}

#[tokio::test]
async fn grouping_collapses_duplicate_keys() {
    let backend = MemBackend::default().with_table(
        "people",
        vec![
            entity(
                &iri("a1"),
                &[("http://example.com/hasName", ResultValue::String("bob".to_owned()))],
            ),
            entity(
                &iri("a2"),
                &[("http://example.com/hasName", ResultValue::String("bob".to_owned()))],
            ),
            entity(
                &iri("a3"),
                &[("http://example.com/hasName", ResultValue::String("alice".to_owned()))],
            ),
        ],
    );
    let catalog = SourceCatalog::new(vec![descriptor(
        "people",
        &[("hasName", SourceDataType::String)],
        &[],
    )]);

    let (result, _) = execute_query(
        &backend,
        "SELECT ?name WHERE { ?p <http://example.com/hasName> ?name } GROUP BY ?name",
        &catalog,
        &QueryOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.len(), 2);
}

#[tokio::test]
async fn missing_property_values_surface_as_nulls() {
    let backend = MemBackend::default().with_table(
        "people",
        vec![
            entity(
                &iri("alice"),
                &[
                    ("http://example.com/hasName", ResultValue::String("alice".to_owned())),
                    ("http://example.com/age", ResultValue::Int(42)),
                ],
            ),
            entity(
                &iri("bob"),
                &[("http://example.com/hasName", ResultValue::String("bob".to_owned()))],
            ),
        ],
    );
    let catalog = SourceCatalog::new(vec![descriptor(
        "people",
        &[
            ("hasName", SourceDataType::String),
            ("age", SourceDataType::Int),
        ],
        &[("age", 1)],
    )]);

    let (result, _) = execute_query(
        &backend,
        "SELECT ?name ?age WHERE { \
            ?p <http://example.com/hasName> ?name . \
            ?p <http://example.com/age> ?age . \
        }",
        &catalog,
        &QueryOptions::default(),
    )
    .await
    .unwrap();

    let age = result
        .columns()
        .iter()
        .find(|column| column.name == "age")
        .unwrap();
    assert!(age.nullable);
    assert_eq!(result.value(0, "age"), Some(&ResultValue::Int(42)));
    assert_eq!(result.value(1, "age"), Some(&ResultValue::Null));
}

#[tokio::test]
async fn unregistered_source_surfaces_a_backend_error() {
    let backend = MemBackend::default();

    let error = execute_query(
        &backend,
        "SELECT ?name WHERE { ?p <http://example.com/hasName> ?name }",
        &people_catalog(),
        &QueryOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, QueryEvaluationError::Backend(_)));
}
