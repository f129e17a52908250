//! Projection operator (the relational algebra Project).

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::heap::Record;

use super::cost::PlanCost;
use super::error::ExecutorError;
use super::eval::Environment;
use super::expr::{Expression, SelectValue};
use super::node::PlanNode;
use super::schema::{ColumnInfo, Schema, SchemaRef};
use super::stats::ColumnStats;
use super::tuple::Tuple;

/// Stream state of a projection between `initialize()` calls.
///
/// `Done` is absorbing: once the child reports end-of-stream, further pulls
/// return `None` without touching the child, until the next `initialize()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Fresh,
    Running,
    Done,
}

/// Projection over a child stream.
///
/// Evaluates an ordered projection spec (wildcards, expressions with
/// optional aliases) against each tuple pulled from the child. A spec
/// consisting of a single unqualified wildcard is *trivial*: the operator
/// passes input tuples through untouched (and a plan rewriter may elide it
/// entirely).
///
/// During `prepare()` the operator derives its output schema and per-column
/// statistics from the child's, collecting a sidecar list of column
/// descriptors for the non-wildcard entries so evaluation can label
/// expression results without re-running type inference.
pub struct ProjectNode {
    child: Box<dyn PlanNode>,
    projection: Vec<SelectValue>,

    /// Schema of tuples produced by the child, captured at prepare time.
    input_schema: Option<SchemaRef>,
    schema: Option<SchemaRef>,
    stats: Vec<ColumnStats>,
    /// Descriptors for the non-wildcard spec entries, in spec order.
    non_wildcard_columns: Vec<ColumnInfo>,
    cost: Option<PlanCost>,

    /// Scratch evaluation environment, reused across tuples.
    env: Environment,
    state: StreamState,
}

impl ProjectNode {
    /// Creates a projection of `projection` over `child`.
    pub fn new(child: Box<dyn PlanNode>, projection: Vec<SelectValue>) -> Self {
        Self {
            child,
            projection,
            input_schema: None,
            schema: None,
            stats: Vec::new(),
            non_wildcard_columns: Vec::new(),
            cost: None,
            env: Environment::new(),
            state: StreamState::Fresh,
        }
    }

    /// Returns the projection spec.
    pub fn projection(&self) -> &[SelectValue] {
        &self.projection
    }

    /// Returns true if this projection is a structural no-op: a single
    /// unqualified wildcard. Trivial projections pass tuples through
    /// unchanged and may be elided by plan rewriters.
    pub fn is_trivial(&self) -> bool {
        matches!(
            self.projection.as_slice(),
            [SelectValue::Wildcard { table: None }]
        )
    }

    /// Derives the output schema, statistics, and sidecar column list from
    /// the prepared child.
    fn prepare_schema_stats(&mut self) -> Result<(), ExecutorError> {
        let input_schema = self.child.schema().clone();
        let input_stats = self.child.stats();
        let input_cost = *self.child.cost();

        let mut columns = Vec::new();
        let mut stats = Vec::new();
        let mut non_wildcard_columns = Vec::new();

        for sel in &self.projection {
            match sel {
                SelectValue::Wildcard { table: Some(table) } => {
                    // All input columns qualified by this table, in input
                    // order, with their statistics.
                    for (index, info) in input_schema.columns_for_table(table) {
                        columns.push(info.clone());
                        stats.push(input_stats[index].clone());
                    }
                }
                SelectValue::Wildcard { table: None } => {
                    columns.extend_from_slice(input_schema.columns());
                    stats.extend_from_slice(input_stats);
                }
                SelectValue::Expression { expr, alias } => {
                    let (mut info, stat) = match expr {
                        Expression::ColumnRef { table, name } => {
                            // A bare column reference keeps the input
                            // column's descriptor and statistics.
                            let index = input_schema
                                .find_column(table.as_deref(), name)?
                                .ok_or_else(|| ExecutorError::ColumnNotFound {
                                    name: expr.to_string(),
                                })?;
                            (
                                input_schema.columns()[index].clone(),
                                input_stats[index].clone(),
                            )
                        }
                        _ => {
                            // Computed expression: infer the type, and
                            // assume every row produces a distinct value.
                            let info = expr.column_info(&input_schema)?;
                            let stat = ColumnStats::with_unique_values(
                                input_cost.num_tuples.round() as u64,
                            );
                            (info, stat)
                        }
                    };

                    if let Some(alias) = alias {
                        info = ColumnInfo::new(alias.clone(), info.ty);
                    }

                    columns.push(info.clone());
                    non_wildcard_columns.push(info);
                    stats.push(stat);
                }
                SelectValue::ScalarSubquery => {
                    return Err(ExecutorError::Unsupported(
                        "scalar subqueries are not supported".to_string(),
                    ));
                }
            }
        }

        let schema = Arc::new(Schema::new(columns));

        // Projection evaluates once per input tuple; the output tuple size
        // follows from the output schema.
        let mut cost = input_cost;
        cost.cpu_cost += input_cost.num_tuples;
        cost.tuple_size = schema.estimated_tuple_size();

        debug!(schema = %SchemaDisplay(schema.as_ref()), "prepared projection");

        self.input_schema = Some(input_schema);
        self.schema = Some(schema);
        self.stats = stats;
        self.non_wildcard_columns = non_wildcard_columns;
        self.cost = Some(cost);
        Ok(())
    }

    /// Projects one input tuple through the spec.
    fn project_tuple(&mut self, tuple: Tuple) -> Result<Tuple, ExecutorError> {
        // Single unqualified wildcard: pass the tuple through untouched.
        if self.is_trivial() {
            return Ok(tuple);
        }

        let input_schema = match &self.input_schema {
            Some(schema) => schema.clone(),
            None => return Err(ExecutorError::InvalidState("plan node has not been prepared")),
        };

        self.env.clear();
        self.env.add_tuple(input_schema.clone(), tuple);
        let input = match self.env.tuple(0) {
            Some(tuple) => tuple,
            None => return Err(ExecutorError::InvalidState("environment lost its binding")),
        };

        let mut values = Vec::new();
        let mut non_wildcard = self.non_wildcard_columns.iter();

        for sel in &self.projection {
            match sel {
                SelectValue::Wildcard { table: Some(table) } => {
                    for (index, _) in input_schema.columns_for_table(table) {
                        values.push(input.values()[index].clone());
                    }
                }
                SelectValue::Wildcard { table: None } => {
                    values.extend_from_slice(input.values());
                }
                SelectValue::Expression { expr, .. } => {
                    let value = expr.evaluate(&self.env)?;
                    // Consume the sidecar descriptor in lockstep; running
                    // out means prepare() and the spec disagree.
                    let info = non_wildcard.next().ok_or(ExecutorError::InvalidState(
                        "projection spec is out of step with its prepared columns",
                    ))?;
                    trace!(expr = %expr, column = %info, value = %value, "projected expression");
                    values.push(value);
                }
                SelectValue::ScalarSubquery => {
                    return Err(ExecutorError::Unsupported(
                        "scalar subqueries are not supported".to_string(),
                    ));
                }
            }
        }

        Ok(Tuple::computed(Record::new(values)))
    }
}

/// Displays a schema as a parenthesized column list for logging.
struct SchemaDisplay<'a>(&'a Schema);

impl fmt::Display for SchemaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, column) in self.0.columns().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", column)?;
        }
        write!(f, ")")
    }
}

impl PlanNode for ProjectNode {
    fn prepare(&mut self) -> Result<(), ExecutorError> {
        if self.schema.is_some() {
            return Ok(());
        }

        self.child.prepare()?;
        self.prepare_schema_stats()
    }

    fn schema(&self) -> &SchemaRef {
        self.schema.as_ref().expect("plan node has not been prepared")
    }

    fn stats(&self) -> &[ColumnStats] {
        &self.stats
    }

    fn cost(&self) -> &PlanCost {
        self.cost.as_ref().expect("plan node has not been prepared")
    }

    fn initialize(&mut self) {
        self.state = StreamState::Fresh;
        self.env.clear();
        self.child.initialize();
    }

    fn get_next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        if self.schema.is_none() {
            return Err(ExecutorError::InvalidState(
                "plan node has not been prepared",
            ));
        }

        match self.state {
            StreamState::Done => return Ok(None),
            StreamState::Fresh => self.state = StreamState::Running,
            StreamState::Running => {}
        }

        match self.child.get_next_tuple()? {
            Some(tuple) => Ok(Some(self.project_tuple(tuple)?)),
            None => {
                self.state = StreamState::Done;
                Ok(None)
            }
        }
    }

    /// Projection can rewind exactly when its child can.
    fn supports_marking(&self) -> bool {
        self.child.supports_marking()
    }

    fn mark_current_position(&mut self) -> Result<(), ExecutorError> {
        self.child.mark_current_position()
    }

    fn reset_to_last_mark(&mut self) -> Result<(), ExecutorError> {
        // The projection holds no rewind state of its own; a rewound child
        // stream is re-projected on the fly.
        self.state = StreamState::Running;
        self.child.reset_to_last_mark()
    }

    fn clean_up(&mut self) {
        self.child.clean_up();
    }

    fn duplicate(&self) -> Box<dyn PlanNode> {
        Box::new(ProjectNode {
            child: self.child.duplicate(),
            projection: self.projection.clone(),
            input_schema: self.input_schema.clone(),
            schema: self.schema.clone(),
            stats: self.stats.clone(),
            non_wildcard_columns: self.non_wildcard_columns.clone(),
            cost: self.cost,
            env: Environment::new(),
            state: StreamState::Fresh,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_node(&self, other: &dyn PlanNode) -> bool {
        match other.as_any().downcast_ref::<ProjectNode>() {
            Some(other) => {
                self.projection == other.projection && self.child.eq_node(other.child.as_ref())
            }
            None => false,
        }
    }

    fn hash_node(&self, state: &mut dyn Hasher) {
        let mut state = state;
        self.projection.hash(&mut state);
        self.child.hash_node(state);
    }
}

impl fmt::Display for ProjectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Project[values: [")?;
        for (i, sel) in self.projection.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", sel)?;
        }
        write!(f, "]]")
    }
}
