mod fallback;
mod ledger;
pub mod policy;
pub mod schema;
mod tracker;

pub use fallback::{DomainError, Outcome};
pub use ledger::ActionLedger;
pub use schema::Task;
pub use tracker::{ChangeDetection, ComparisonRow, DialogueState, TrackerError};
