//! Starlake compiles declarative graph queries into cost-ordered execution
//! plans over heterogeneous physical data sources and drives a pluggable
//! backend to produce a typed relational result.
//!
//! The crate is a facade over the three layers:
//!
//! - [`starlake_model`]: star patterns, source catalogs, datatypes and
//!   schema mappings.
//! - [`starlake_planner`]: pattern extraction, source mapping, join
//!   planning and schema reconciliation.
//! - [`starlake_engine`]: the [`ExecutionBackend`] contract a physical
//!   backend implements, and the orchestrator that sequences one query's
//!   lifecycle.
//!
//! ```no_run
//! use starlake::{execute_query, QueryOptions, SourceCatalog};
//!
//! # async fn example(backend: impl starlake::ExecutionBackend) {
//! let catalog = SourceCatalog::new(vec![/* descriptors from the config loader */]);
//! let (result, explanation) = execute_query(
//!     &backend,
//!     "SELECT ?name WHERE { ?p <http://example.com/hasName> ?name }",
//!     &catalog,
//!     &QueryOptions::default(),
//! )
//! .await
//! .unwrap();
//! # }
//! ```

pub use starlake_engine::error::{BackendError, QueryEvaluationError};
pub use starlake_engine::{
    execute_query, ExecutionBackend, FetchedRelation, MaterializedResult, QueryExplanation,
    QueryOptions, QueryStage, ResultColumn, ResultValue, StarFetchParams,
};
pub use starlake_model::{
    ColumnMapping, DataSourceDescriptor, SchemaMapping, SourceCatalog, SourceDataType,
    SourceFormat, StarPattern, StarProperty, StarSubject, Transform, TransformOp, TransformSide,
    ValueDefinition, VariableOrigin,
};
pub use starlake_planner::{
    extract, plan, reconcile, resolve, ExtractedQuery, JoinEdge, JoinGraph, JoinPlan, JoinStep,
    NeededPredicates, OrderKey, PlanError, ResolvedSource, ResolvedStar, SelectedColumn,
    SortOrder,
};

// Re-export the underlying term types for callers that construct catalogs.
pub use starlake_model::{NamedNode, Variable};
