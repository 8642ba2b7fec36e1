mod contract;
pub mod error;
mod explanation;
mod orchestrator;
mod results;

pub use contract::{ExecutionBackend, FetchedRelation, StarFetchParams};
pub use explanation::{QueryExplanation, QueryStage};
pub use orchestrator::{execute_query, QueryOptions};
pub use results::{MaterializedResult, ResultColumn, ResultValue};
