use crate::error::BackendError;
use crate::results::MaterializedResult;
use async_trait::async_trait;
use spargebra::algebra::Expression;
use starlake_model::{NamedNode, SchemaMapping, StarPattern, Transform, Variable, VariableOrigin};
use starlake_planner::{JoinStep, OrderKey, ResolvedStar, SelectedColumn};
use std::collections::{BTreeMap, BTreeSet};

/// Everything a backend needs to materialize one star's relation.
///
/// Borrowed views into the plan; the backend must not need to re-derive any
/// of this from the query text.
#[derive(Debug, Clone, Copy)]
pub struct StarFetchParams<'a> {
    /// Whether the star participates in a join. Backends typically qualify
    /// column names with the star id in that case.
    pub is_joined: bool,
    /// The reconciled target schema of the star's relation.
    pub schema: &'a SchemaMapping,
    /// The predicates referenced by any clause of the query.
    pub needed: &'a BTreeSet<NamedNode>,
    /// The predicates that feed the final projection.
    pub selected: &'a BTreeSet<NamedNode>,
    /// The filters attributed to this star, to apply during the fetch.
    pub filters: &'a [Expression],
    /// The value transforms of the query's `TRANSFORM(...)` clause.
    pub transforms: &'a [Transform],
    /// The canonical origin of every query variable, for column naming.
    pub origins: &'a BTreeMap<Variable, VariableOrigin>,
}

/// The result of fetching one star.
#[derive(Debug)]
pub struct FetchedRelation<R> {
    pub relation: R,
    /// How many filter predicates the backend actually applied. Reported for
    /// observability; the current query's weighting already used the counts
    /// known at extraction time.
    pub filters_applied: usize,
}

/// The operations a physical backend must provide to execute a planned
/// query, over an opaque relation handle.
///
/// No operation mutates a relation in place; each returns a new handle, which
/// is what lets the orchestrator treat the plan as a pure pipeline.
/// `fetch`, `join` and `run` may do I/O and are async; the remaining
/// operations only reshape the (possibly lazy) relation and are synchronous.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// The backend-native relation type. Handles must be independently
    /// usable so that concurrent queries can share one backend.
    type Relation: Send + Sync;

    /// Materializes one star's relation from one of its candidate sources,
    /// applying the star's filters.
    async fn fetch(
        &self,
        star: &StarPattern,
        resolved: &ResolvedStar,
        params: StarFetchParams<'_>,
    ) -> Result<FetchedRelation<Self::Relation>, BackendError>;

    /// Executes the cost-ordered join sequence over the per-star relations,
    /// producing one combined relation.
    async fn join(
        &self,
        sequence: &[JoinStep],
        relations: BTreeMap<String, Self::Relation>,
    ) -> Result<Self::Relation, BackendError>;

    fn group_by(
        &self,
        relation: Self::Relation,
        variables: &[Variable],
    ) -> Result<Self::Relation, BackendError>;

    fn order_by(
        &self,
        relation: Self::Relation,
        keys: &[OrderKey],
    ) -> Result<Self::Relation, BackendError>;

    fn project(
        &self,
        relation: Self::Relation,
        columns: &[SelectedColumn],
        distinct: bool,
    ) -> Result<Self::Relation, BackendError>;

    fn limit(&self, relation: Self::Relation, limit: usize)
        -> Result<Self::Relation, BackendError>;

    /// Triggers evaluation and returns the concrete, enumerable result.
    async fn run(&self, relation: Self::Relation) -> Result<MaterializedResult, BackendError>;
}
