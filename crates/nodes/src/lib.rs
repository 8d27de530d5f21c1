//! `nodes` crate — the `NodeHandler` trait, the restricted expression
//! evaluator, built-in node implementations, and the AI Verifier.
//!
//! Every node — built-in and plugin alike — must implement [`NodeHandler`].
//! The engine crate dispatches execution through this trait object.

pub mod builtin;
pub mod error;
pub mod expr;
pub mod mock;
pub mod registry;
pub mod traits;
pub mod verifier;

pub use error::NodeError;
pub use registry::NodeRegistry;
pub use traits::{ExecutionContext, NodeHandler};
