use starlake_planner::JoinStep;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// The stages of one query's lifecycle, in execution order.
///
/// Used for stage-transition logging; any failure skips the remaining stages
/// and surfaces the originating error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryStage {
    Parsed,
    StarsExtracted,
    SourcesResolved,
    Planned,
    PerStarFetched,
    Joined,
    PostProcessed,
    Materialized,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryStage::Parsed => "parsed",
            QueryStage::StarsExtracted => "stars-extracted",
            QueryStage::SourcesResolved => "sources-resolved",
            QueryStage::Planned => "planned",
            QueryStage::PerStarFetched => "per-star-fetched",
            QueryStage::Joined => "joined",
            QueryStage::PostProcessed => "post-processed",
            QueryStage::Materialized => "materialized",
        };
        f.write_str(name)
    }
}

/// Diagnostic information about how one query was planned and executed.
#[derive(Debug, Clone)]
pub struct QueryExplanation {
    /// Time spent in extraction, resolution, planning and reconciliation.
    pub planning_time: Duration,
    /// The number of stars the query decomposed into.
    pub star_count: usize,
    /// The cost-ordered join sequence that was executed.
    pub join_sequence: Vec<JoinStep>,
    /// Per star, the number of filter predicates the backend reported
    /// applying at fetch time.
    pub filters_applied: BTreeMap<String, usize>,
}
