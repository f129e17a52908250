//! The plan node contract.
//!
//! Every physical operator implements [`PlanNode`]. Operators compose into
//! a tree by owning their children as `Box<dyn PlanNode>`; data flows
//! upward one tuple per [`get_next_tuple`](PlanNode::get_next_tuple) call,
//! while control flows downward through `prepare`, `initialize`, and
//! `clean_up`.
//!
//! The contract is a capability interface: marking support is optional and
//! reported through [`supports_marking`](PlanNode::supports_marking), and
//! the default `mark`/`reset` implementations reject the calls.

use std::any::Any;
use std::fmt;
use std::hash::Hasher;

use super::cost::PlanCost;
use super::error::ExecutorError;
use super::schema::{ColumnInfo, SchemaRef};
use super::stats::ColumnStats;
use super::tuple::Tuple;

/// A physical query plan operator.
///
/// # Lifecycle
///
/// 1. [`prepare`](Self::prepare): compute schema, statistics, and cost;
///    recursively prepares children. Must be called before pulling tuples.
///    Idempotent within a plan's lifetime.
/// 2. [`initialize`](Self::initialize): reset execution state; legal to
///    call repeatedly, each call restarts the stream from the beginning.
/// 3. [`get_next_tuple`](Self::get_next_tuple): pull one tuple; `None`
///    signals end-of-stream and is sticky until the next `initialize`.
/// 4. [`clean_up`](Self::clean_up): release resources; mandatory on every
///    exit path and idempotent.
pub trait PlanNode: fmt::Display {
    /// Computes this node's schema, statistics, and cost, recursively
    /// preparing children first.
    fn prepare(&mut self) -> Result<(), ExecutorError>;

    /// Returns the output schema.
    ///
    /// # Panics
    ///
    /// Implementations may panic if the node has not been prepared.
    fn schema(&self) -> &SchemaRef;

    /// Returns the per-column statistics, aligned with the schema.
    ///
    /// # Panics
    ///
    /// Implementations may panic if the node has not been prepared.
    fn stats(&self) -> &[ColumnStats];

    /// Returns the estimated cost of executing this subtree.
    ///
    /// # Panics
    ///
    /// Implementations may panic if the node has not been prepared.
    fn cost(&self) -> &PlanCost;

    /// Resets execution state, recursively initializing children. Each call
    /// restarts the stream from the beginning.
    fn initialize(&mut self);

    /// Pulls the next tuple, or `None` once the stream is exhausted.
    ///
    /// After `None` is returned once, subsequent calls keep returning
    /// `None` (without doing work) until [`initialize`](Self::initialize)
    /// is called again.
    fn get_next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError>;

    /// Returns true if this subtree supports position marking.
    fn supports_marking(&self) -> bool {
        false
    }

    /// Returns true if this node needs its left child to support marking.
    fn requires_left_marking(&self) -> bool {
        false
    }

    /// Returns true if this node needs its right child to support marking.
    fn requires_right_marking(&self) -> bool {
        false
    }

    /// Remembers the current stream position for a later
    /// [`reset_to_last_mark`](Self::reset_to_last_mark).
    fn mark_current_position(&mut self) -> Result<(), ExecutorError> {
        Err(ExecutorError::Unsupported(
            "this plan node does not support marking".to_string(),
        ))
    }

    /// Rewinds the stream to the last marked position.
    fn reset_to_last_mark(&mut self) -> Result<(), ExecutorError> {
        Err(ExecutorError::Unsupported(
            "this plan node does not support marking".to_string(),
        ))
    }

    /// Releases resources held by this subtree. Idempotent; called on every
    /// exit path.
    fn clean_up(&mut self);

    /// Clones this subtree into an independently executable plan.
    ///
    /// Operator-local specifications are deep-copied; external resources
    /// (page caches) are shared. Executing the duplicate must not disturb
    /// the original.
    fn duplicate(&self) -> Box<dyn PlanNode>;

    /// Returns the columns the output is ordered by, or `None` when the
    /// ordering is unknown.
    fn results_ordered_by(&self) -> Option<&[ColumnInfo]> {
        None
    }

    /// Upcast for structural comparison across concrete node types.
    fn as_any(&self) -> &dyn Any;

    /// Structural equality: same operator type, same operator-local spec,
    /// structurally equal children.
    fn eq_node(&self, other: &dyn PlanNode) -> bool;

    /// Structural hash, consistent with [`eq_node`](Self::eq_node).
    fn hash_node(&self, state: &mut dyn Hasher);
}

impl PartialEq for dyn PlanNode + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.eq_node(other)
    }
}

impl Eq for dyn PlanNode + '_ {}

impl std::hash::Hash for dyn PlanNode + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_node(state);
    }
}
