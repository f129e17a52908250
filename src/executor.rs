//! Pull-based query execution core.
//!
//! This module implements the Volcano-style iterator model. Each physical
//! operator is a [`PlanNode`]; parents pull tuples from their children one
//! at a time via [`PlanNode::get_next_tuple`], so a query runs as a single
//! synchronous pull pipeline with no intermediate materialization.
//!
//! The executor consists of:
//!
//! - **Plan node contract** ([`node`]): prepare / pull / initialize /
//!   mark-reset / clean-up / duplicate, plus schema, statistics, and cost
//!   propagation
//! - **Operators**: [`FileScanNode`] (leaf over a heap file) and
//!   [`ProjectNode`] (projection over a child stream)
//! - **Expressions** ([`expr`], [`eval`]): expression trees, select values,
//!   and the evaluation environment that binds tuples to schemas
//! - **Metadata**: [`Schema`]/[`ColumnInfo`], [`ColumnStats`],
//!   [`TableStats`], and [`PlanCost`]
//!
//! Control flows downward at `prepare`/`initialize`/`clean_up` time; data
//! flows upward one tuple per `get_next_tuple` call.

pub mod cost;
pub mod error;
pub mod eval;
pub mod expr;
pub mod node;
pub mod project;
pub mod scan;
pub mod schema;
pub mod stats;
pub mod tuple;

pub use cost::PlanCost;
pub use error::ExecutorError;
pub use eval::Environment;
pub use expr::{BinaryOperator, Expression, SelectValue, UnaryOperator};
pub use node::PlanNode;
pub use project::ProjectNode;
pub use scan::FileScanNode;
pub use schema::{ColumnInfo, Schema, SchemaRef};
pub use stats::{ColumnStats, TableStats};
pub use tuple::Tuple;
