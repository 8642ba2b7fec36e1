mod error;
pub mod extractor;
pub mod join;
pub mod mapper;
pub mod reconcile;

pub use error::PlanError;
pub use extractor::{extract, ExtractedQuery, OrderKey, SortOrder};
pub use join::{plan, JoinEdge, JoinGraph, JoinPlan, JoinStep, NeededPredicates, SelectedColumn};
pub use mapper::{resolve, ResolvedSource, ResolvedStar};
pub use reconcile::reconcile;
