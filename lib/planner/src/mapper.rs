//! Resolves each star against the source catalog.
//!
//! Resolution only answers "which sources could serve this star, and what do
//! they report about it". Picking among several candidate sources is a
//! fetch-time concern of the execution backend, not decided here.

use crate::error::PlanError;
use starlake_model::{
    DataSourceDescriptor, NamedNode, SourceCatalog, SourceDataType, StarPattern,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One candidate source for a star, with the datatypes it reports for the
/// star's predicates.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    descriptor: Arc<DataSourceDescriptor>,
    datatypes: BTreeMap<NamedNode, SourceDataType>,
}

impl ResolvedSource {
    pub fn descriptor(&self) -> &Arc<DataSourceDescriptor> {
        &self.descriptor
    }

    /// The datatypes this source reports, restricted to the star's predicates.
    pub fn datatypes(&self) -> &BTreeMap<NamedNode, SourceDataType> {
        &self.datatypes
    }
}

/// The resolution result for one star.
#[derive(Debug, Clone)]
pub struct ResolvedStar {
    star_id: String,
    sources: Vec<ResolvedSource>,
    options: BTreeMap<String, String>,
}

impl ResolvedStar {
    pub fn star_id(&self) -> &str {
        &self.star_id
    }

    /// All candidate sources, ordered by source id.
    pub fn sources(&self) -> &[ResolvedSource] {
        &self.sources
    }

    /// The merged connection options of all candidate sources.
    ///
    /// On key collisions the source with the smaller id wins, which keeps the
    /// merge deterministic.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// The distinct datatypes observed across all sources and predicates.
    ///
    /// The join planner uses the count of this set as a cardinality proxy.
    pub fn distinct_datatypes(&self) -> usize {
        self.sources
            .iter()
            .flat_map(|source| source.datatypes.values())
            .collect::<std::collections::BTreeSet<_>>()
            .len()
    }

    /// Every datatype observed for `predicate`, in source-id order.
    pub fn observed_datatypes(&self, predicate: &NamedNode) -> Vec<SourceDataType> {
        self.sources
            .iter()
            .filter_map(|source| source.datatypes.get(predicate).copied())
            .collect()
    }

    /// The summed null count observed for `predicate` across all sources.
    pub fn null_count(&self, predicate: &NamedNode) -> u64 {
        self.sources
            .iter()
            .map(|source| source.descriptor.null_count(predicate))
            .sum()
    }
}

/// Resolves every star against the catalog.
///
/// A star with a predicate no source can serve makes the whole query
/// unanswerable and fails immediately with [PlanError::UnresolvedStar].
pub fn resolve(
    stars: &[StarPattern],
    catalog: &SourceCatalog,
) -> Result<Vec<ResolvedStar>, PlanError> {
    stars.iter().map(|star| resolve_star(star, catalog)).collect()
}

fn resolve_star(star: &StarPattern, catalog: &SourceCatalog) -> Result<ResolvedStar, PlanError> {
    // Keyed by source id so candidate order does not depend on catalog
    // insertion order.
    let mut candidates: BTreeMap<String, ResolvedSource> = BTreeMap::new();

    for predicate in star.predicates() {
        let mut found = false;
        for descriptor in catalog.sources_for(predicate) {
            found = true;
            let entry = candidates
                .entry(descriptor.id().to_owned())
                .or_insert_with(|| ResolvedSource {
                    descriptor: Arc::clone(descriptor),
                    datatypes: BTreeMap::new(),
                });
            if let Some(datatype) = descriptor.datatype(predicate) {
                entry.datatypes.insert(predicate.clone(), datatype);
            }
        }
        if !found {
            return Err(PlanError::UnresolvedStar {
                star: star.id(),
                predicate: predicate.clone(),
            });
        }
    }

    let mut options = BTreeMap::new();
    for source in candidates.values() {
        for (key, value) in source.descriptor.options() {
            options.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    Ok(ResolvedStar {
        star_id: star.id(),
        sources: candidates.into_values().collect(),
        options,
    })
}
