use spargebra::SparqlSyntaxError;
use starlake_model::{NamedNode, SourceDataType, Variable};

/// An error raised while compiling a query into an execution plan.
///
/// Every variant is fatal to the query that produced it; the planner never
/// degrades to a partial plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The query text could not be parsed or is structurally invalid.
    #[error("malformed query: {0}")]
    MalformedQuery(String),
    /// No source in the catalog can serve one of the star's predicates.
    #[error("star {star} cannot be answered: no source serves {predicate}")]
    UnresolvedStar { star: String, predicate: NamedNode },
    /// The join graph does not connect all stars; executing the query would
    /// silently produce a Cartesian product.
    #[error("star {star} is not reachable from the join seed")]
    DisconnectedQuery { star: String },
    /// Two sources report datatypes for a variable that have no common
    /// promotion.
    #[error("no common datatype for variable {variable}: {left} vs. {right}")]
    TypeConflict {
        variable: Variable,
        left: SourceDataType,
        right: SourceDataType,
    },
}

impl PlanError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        PlanError::MalformedQuery(message.into())
    }
}

impl From<SparqlSyntaxError> for PlanError {
    fn from(error: SparqlSyntaxError) -> Self {
        PlanError::MalformedQuery(error.to_string())
    }
}
