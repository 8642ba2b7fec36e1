//! Drives one query through its lifecycle: extract, resolve, plan,
//! reconcile, fetch per star, join, post-process, materialize.
//!
//! The orchestrator owns every intermediate artifact for the duration of one
//! query and discards them after materialization; there is no cross-query
//! caching. Any component failure aborts the remaining stages.

use crate::contract::{ExecutionBackend, StarFetchParams};
use crate::error::QueryEvaluationError;
use crate::explanation::{QueryExplanation, QueryStage};
use crate::results::MaterializedResult;
use starlake_model::{SchemaMapping, SourceCatalog, SourceDataType, StarPattern, Variable};
use starlake_planner::{extract, plan, reconcile, resolve, ResolvedStar};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::debug;

/// Caller-tunable options for one query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// The base IRI to resolve relative IRIs in the query text against.
    pub base_iri: Option<String>,
}

/// Compiles and executes one query against `backend`.
///
/// The whole pipeline is fail-fast: the first error of any stage is returned
/// as-is and no partial result is materialized. Schema reconciliation for
/// every star runs before the first fetch, so a [TypeConflict] surfaces
/// before any I/O happens.
///
/// [TypeConflict]: starlake_planner::PlanError::TypeConflict
pub async fn execute_query<B: ExecutionBackend>(
    backend: &B,
    query_text: &str,
    catalog: &SourceCatalog,
    options: &QueryOptions,
) -> Result<(MaterializedResult, QueryExplanation), QueryEvaluationError> {
    let planning_start = Instant::now();

    let extracted = extract(query_text, options.base_iri.as_deref())?;
    debug!(
        stage = %QueryStage::StarsExtracted,
        stars = extracted.stars().len(),
        "extracted star patterns"
    );

    let resolved = resolve(extracted.stars(), catalog)?;
    debug!(stage = %QueryStage::SourcesResolved, "resolved stars against catalog");

    let join_plan = plan(&extracted, &resolved)?;
    debug!(
        stage = %QueryStage::Planned,
        joins = join_plan.sequence.len(),
        "planned join sequence"
    );

    // Reconcile every star before any fetch; a type conflict must surface
    // before the first byte of I/O.
    let mut schemas: BTreeMap<String, SchemaMapping> = BTreeMap::new();
    for (star, resolved_star) in extracted.stars().iter().zip(&resolved) {
        schemas.insert(star.id(), reconcile_star(star, resolved_star)?);
    }
    let planning_time = planning_start.elapsed();

    let is_joined = !join_plan.sequence.is_empty();
    let empty = BTreeSet::new();
    let mut relations = BTreeMap::new();
    let mut filters_applied = BTreeMap::new();
    for (star, resolved_star) in extracted.stars().iter().zip(&resolved) {
        let star_id = star.id();
        let params = StarFetchParams {
            is_joined,
            schema: &schemas[&star_id],
            needed: join_plan.needed.all(&star_id).unwrap_or(&empty),
            selected: join_plan.needed.selected(&star_id).unwrap_or(&empty),
            filters: extracted.filters_for(&star_id),
            transforms: extracted.transforms(),
            origins: extracted.origins(),
        };
        let fetched = backend.fetch(star, resolved_star, params).await?;
        filters_applied.insert(star_id.clone(), fetched.filters_applied);
        relations.insert(star_id, fetched.relation);
    }
    debug!(stage = %QueryStage::PerStarFetched, "fetched per-star relations");

    let mut relation = if is_joined {
        backend.join(&join_plan.sequence, relations).await?
    } else {
        // Extraction guarantees at least one star.
        let (_, relation) = relations
            .into_iter()
            .next()
            .ok_or_else(|| starlake_planner::PlanError::MalformedQuery(
                "query produced no relation".to_owned(),
            ))?;
        relation
    };
    debug!(stage = %QueryStage::Joined, "combined relation ready");

    if !extracted.group_by().is_empty() {
        relation = backend.group_by(relation, extracted.group_by())?;
    }
    if !extracted.order_by().is_empty() {
        relation = backend.order_by(relation, extracted.order_by())?;
    }
    relation = backend.project(relation, join_plan.needed.columns(), extracted.distinct())?;
    if let Some(limit) = extracted.limit() {
        relation = backend.limit(relation, limit)?;
    }
    debug!(stage = %QueryStage::PostProcessed, "post-processing applied");

    let result = backend.run(relation).await?;
    debug!(stage = %QueryStage::Materialized, rows = result.len(), "query finished");

    let explanation = QueryExplanation {
        planning_time,
        star_count: extracted.stars().len(),
        join_sequence: join_plan.sequence.clone(),
        filters_applied,
    };
    Ok((result, explanation))
}

/// Reconciles the schema of one star from what its candidate sources report.
///
/// The subject variable is an entity link and is observed as a structural
/// IRI; object variables take the datatypes and null counts their predicate
/// was observed with across all candidate sources.
fn reconcile_star(
    star: &StarPattern,
    resolved: &ResolvedStar,
) -> Result<SchemaMapping, QueryEvaluationError> {
    let mut variables = Vec::new();
    let mut observed: BTreeMap<Variable, Vec<SourceDataType>> = BTreeMap::new();
    let mut null_counts: BTreeMap<Variable, u64> = BTreeMap::new();

    if let Some(subject) = star.subject().as_variable() {
        variables.push(subject.clone());
        observed.insert(
            subject.clone(),
            vec![SourceDataType::Iri; resolved.sources().len().max(1)],
        );
    }

    for property in star.properties() {
        let Some(variable) = property.object_variable() else {
            continue;
        };
        if variables.contains(variable) {
            continue;
        }
        variables.push(variable.clone());
        observed.insert(
            variable.clone(),
            resolved.observed_datatypes(&property.predicate),
        );
        null_counts.insert(variable.clone(), resolved.null_count(&property.predicate));
    }

    Ok(reconcile(&variables, &observed, &null_counts)?)
}
