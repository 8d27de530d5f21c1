pub mod approvals;
pub mod audit;
pub mod executions;
pub mod webhooks;
pub mod workflows;

pub use crate::AppState;
