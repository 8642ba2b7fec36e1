//! Builds the join graph over stars and orders the joins.
//!
//! The ordering is a greedy minimum-weight spanning walk seeded with the
//! lightest edge, not a cost-based optimizer. The heuristic is deliberately
//! simple: star weights are derived from the datatypes observed for the star
//! and its filter density, and ties break lexicographically on star ids so
//! two runs over the same input always produce the same sequence.

use crate::error::PlanError;
use crate::extractor::ExtractedQuery;
use crate::mapper::ResolvedStar;
use itertools::Itertools;
use rustc_hash::FxHashSet;
use starlake_model::{NamedNode, StarPattern, Variable, VariableOrigin};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The abstract cardinality assigned to a star before any weighting applies.
const BASE_CARDINALITY: u64 = 1_000_000;

/// An edge of the join graph.
///
/// Edges are undirected; `left`/`right` hold the canonically smaller and
/// larger star id. `variable` is the shared variable: an object variable of
/// one endpoint that is the subject variable of the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEdge {
    pub left: String,
    pub right: String,
    pub variable: Variable,
    pub weight: u64,
}

/// The join graph over all stars of one query.
#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    stars: BTreeSet<String>,
    edges: Vec<JoinEdge>,
}

impl JoinGraph {
    pub fn stars(&self) -> &BTreeSet<String> {
        &self.stars
    }

    pub fn edges(&self) -> &[JoinEdge] {
        &self.edges
    }
}

/// One pairwise join of the planned sequence. `left` is always a star that
/// is already part of the joined frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub left: String,
    pub right: String,
    pub variable: Variable,
}

impl fmt::Display for JoinStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {} on {}", self.left, self.right, self.variable)
    }
}

/// One column of the final projection, in projection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedColumn {
    pub variable: Variable,
    pub origin: VariableOrigin,
}

/// The predicates each star actually has to fetch.
#[derive(Debug, Clone, Default)]
pub struct NeededPredicates {
    all: BTreeMap<String, BTreeSet<NamedNode>>,
    selected: BTreeMap<String, BTreeSet<NamedNode>>,
    columns: Vec<SelectedColumn>,
}

impl NeededPredicates {
    /// The predicates of `star_id` referenced by any clause.
    pub fn all(&self, star_id: &str) -> Option<&BTreeSet<NamedNode>> {
        self.all.get(star_id)
    }

    /// The predicates of `star_id` that feed the final projection.
    pub fn selected(&self, star_id: &str) -> Option<&BTreeSet<NamedNode>> {
        self.selected.get(star_id)
    }

    /// The final projection, in output column order.
    pub fn columns(&self) -> &[SelectedColumn] {
        &self.columns
    }
}

/// The complete join plan of one query.
#[derive(Debug, Clone)]
pub struct JoinPlan {
    pub needed: NeededPredicates,
    pub graph: JoinGraph,
    pub sequence: Vec<JoinStep>,
}

impl fmt::Display for JoinPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sequence.is_empty() {
            return write!(f, "NoJoin ({} star)", self.graph.stars.len());
        }
        for (i, step) in self.sequence.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "Join {}: {step}", i + 1)?;
        }
        Ok(())
    }
}

/// Plans the joins for one extracted and resolved query.
///
/// Fails with [PlanError::DisconnectedQuery] when greedy extension exhausts
/// the edges with stars left unreached.
pub fn plan(
    extracted: &ExtractedQuery,
    resolved: &[ResolvedStar],
) -> Result<JoinPlan, PlanError> {
    let weights = star_weights(extracted, resolved);
    let graph = build_graph(extracted.stars(), &weights);
    let sequence = order_joins(&graph)?;
    let needed = needed_predicates(extracted, &graph)?;
    Ok(JoinPlan {
        needed,
        graph,
        sequence,
    })
}

/// Computes the weight of every star.
///
/// More distinct datatypes and more filters both suggest a smaller result,
/// so they shrink the weight; lighter stars are joined first.
fn star_weights(extracted: &ExtractedQuery, resolved: &[ResolvedStar]) -> BTreeMap<String, u64> {
    extracted
        .stars()
        .iter()
        .map(|star| {
            let id = star.id();
            let datatypes = resolved
                .iter()
                .find(|r| r.star_id() == id)
                .map_or(0, ResolvedStar::distinct_datatypes) as u64;
            let filters = extracted.filter_count(&id) as u64;
            let weight = BASE_CARDINALITY / ((1 + datatypes) * (1 + filters));
            (id, weight)
        })
        .collect()
}

fn build_graph(stars: &[StarPattern], weights: &BTreeMap<String, u64>) -> JoinGraph {
    let star_ids: BTreeSet<String> = stars.iter().map(StarPattern::id).collect();

    let mut edges: BTreeMap<(String, String, Variable), u64> = BTreeMap::new();
    for star in stars {
        for object_variable in star.object_variables() {
            for other in stars {
                if other.id() == star.id() {
                    continue;
                }
                if other.subject().as_variable() != Some(object_variable) {
                    continue;
                }
                let (left, right) = canonical_pair(star.id(), other.id());
                let weight = weights.get(&left).copied().unwrap_or(BASE_CARDINALITY)
                    + weights.get(&right).copied().unwrap_or(BASE_CARDINALITY);
                edges
                    .entry((left, right, object_variable.clone()))
                    .or_insert(weight);
            }
        }
    }

    JoinGraph {
        stars: star_ids,
        edges: edges
            .into_iter()
            .map(|((left, right, variable), weight)| JoinEdge {
                left,
                right,
                variable,
                weight,
            })
            .collect(),
    }
}

fn canonical_pair(a: String, b: String) -> (String, String) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Orders the joins with a greedy minimum-weight spanning walk.
///
/// Seeds with the globally lightest edge, then repeatedly takes the lightest
/// untaken edge touching the joined frontier. Ties break lexicographically on
/// the canonical `(left, right)` pair.
fn order_joins(graph: &JoinGraph) -> Result<Vec<JoinStep>, PlanError> {
    if graph.stars.len() <= 1 {
        return Ok(Vec::new());
    }

    let sorted: Vec<&JoinEdge> = graph
        .edges
        .iter()
        .sorted_by_key(|edge| (edge.weight, &edge.left, &edge.right))
        .collect();

    let mut frontier: FxHashSet<&str> = FxHashSet::default();
    let mut taken = vec![false; sorted.len()];
    let mut sequence = Vec::new();

    if let Some(seed) = sorted.first() {
        taken[0] = true;
        frontier.insert(&seed.left);
        frontier.insert(&seed.right);
        sequence.push(JoinStep {
            left: seed.left.clone(),
            right: seed.right.clone(),
            variable: seed.variable.clone(),
        });
    }

    loop {
        let next = sorted.iter().enumerate().find(|(i, edge)| {
            !taken[*i]
                && (frontier.contains(edge.left.as_str())
                    ^ frontier.contains(edge.right.as_str()))
        });
        let Some((index, edge)) = next else {
            break;
        };
        taken[index] = true;

        // Orient the step so that `left` is the star already joined.
        let (joined, fresh) = if frontier.contains(edge.left.as_str()) {
            (&edge.left, &edge.right)
        } else {
            (&edge.right, &edge.left)
        };
        frontier.insert(fresh);
        sequence.push(JoinStep {
            left: joined.clone(),
            right: fresh.clone(),
            variable: edge.variable.clone(),
        });
    }

    if let Some(unreached) = graph
        .stars
        .iter()
        .find(|star| !frontier.contains(star.as_str()))
    {
        return Err(PlanError::DisconnectedQuery {
            star: unreached.clone(),
        });
    }

    Ok(sequence)
}

/// Derives which predicates each star actually needs.
///
/// `all` collects every predicate referenced by a clause: projection, join
/// keys, filters, ordering and grouping. `selected` keeps only the ones that
/// feed the final projection, preserving projection order in `columns` for
/// output naming. `selected` is a subset of `all` by construction.
fn needed_predicates(
    extracted: &ExtractedQuery,
    graph: &JoinGraph,
) -> Result<NeededPredicates, PlanError> {
    let mut needed = NeededPredicates::default();

    for variable in extracted.projection() {
        let origin = extracted.origin(variable).ok_or_else(|| {
            PlanError::malformed(format!("projected variable {variable} has no origin"))
        })?;
        needed.columns.push(SelectedColumn {
            variable: variable.clone(),
            origin: origin.clone(),
        });
        add_origin(&mut needed.selected, origin, extracted);
    }
    needed.all = needed.selected.clone();

    for star in extracted.stars() {
        let star_id = star.id();
        for filter in extracted.filters_for(&star_id) {
            let mut variables = BTreeSet::new();
            crate::extractor::filter_variables(filter, &mut variables)?;
            for variable in &variables {
                for property in star.properties() {
                    if property.object_variable() == Some(variable) {
                        needed
                            .all
                            .entry(star_id.clone())
                            .or_default()
                            .insert(property.predicate.clone());
                    }
                }
            }
        }
    }

    for key in extracted.order_by() {
        if let Some(origin) = extracted.origin(&key.variable) {
            add_origin(&mut needed.all, origin, extracted);
        }
    }
    for variable in extracted.group_by() {
        if let Some(origin) = extracted.origin(variable) {
            add_origin(&mut needed.all, origin, extracted);
        }
    }

    // Join keys: the object side of every edge has a concrete predicate
    // column that must be fetched.
    for edge in graph.edges() {
        for star in extracted.stars() {
            for property in star.properties() {
                if property.object_variable() == Some(&edge.variable) {
                    needed
                        .all
                        .entry(star.id())
                        .or_default()
                        .insert(property.predicate.clone());
                }
            }
        }
    }

    Ok(needed)
}

/// Records the predicates behind one variable origin.
///
/// An object origin names its predicate directly; a subject origin stands for
/// the star's row identity and pulls in every predicate of the star.
fn add_origin(
    into: &mut BTreeMap<String, BTreeSet<NamedNode>>,
    origin: &VariableOrigin,
    extracted: &ExtractedQuery,
) {
    match origin {
        VariableOrigin::Object { star, predicate } => {
            into.entry(star.clone()).or_default().insert(predicate.clone());
        }
        VariableOrigin::Subject { star } => {
            if let Some(star_pattern) = extracted.star(star) {
                into.entry(star.clone())
                    .or_default()
                    .extend(star_pattern.predicates().into_iter().cloned());
            }
        }
    }
}
