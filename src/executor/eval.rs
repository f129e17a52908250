//! Expression evaluation and the evaluation environment.
//!
//! An [`Environment`] binds tuples to their schemas for the duration of one
//! evaluation: column references resolve against the first binding whose
//! schema contains the referenced column. The environment is owned by the
//! operator that evaluates expressions and reused across tuples
//! ([`Environment::clear`] keeps the allocation).

use std::cmp::Ordering;

use crate::datum::Value;

use super::error::ExecutorError;
use super::expr::{BinaryOperator, Expression, UnaryOperator};
use super::schema::SchemaRef;
use super::tuple::Tuple;

/// An ordered set of `(schema, tuple)` bindings for expression evaluation.
#[derive(Default)]
pub struct Environment {
    bindings: Vec<(SchemaRef, Tuple)>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all bindings, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Appends a binding of `tuple` to `schema`.
    pub fn add_tuple(&mut self, schema: SchemaRef, tuple: Tuple) {
        self.bindings.push((schema, tuple));
    }

    /// Returns the `index`-th bound tuple.
    pub fn tuple(&self, index: usize) -> Option<&Tuple> {
        self.bindings.get(index).map(|(_, tuple)| tuple)
    }

    /// Resolves a column reference against the bindings in order.
    ///
    /// The first binding whose schema contains the column wins.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::AmbiguousColumn`] if a binding's schema
    /// matches the reference more than once, and
    /// [`ExecutorError::ColumnNotFound`] if no binding matches.
    pub fn lookup(&self, table: Option<&str>, name: &str) -> Result<&Value, ExecutorError> {
        for (schema, tuple) in &self.bindings {
            if let Some(index) = schema.find_column(table, name)? {
                return Ok(&tuple.values()[index]);
            }
        }

        Err(ExecutorError::ColumnNotFound {
            name: match table {
                Some(table) => format!("{}.{}", table, name),
                None => name.to_string(),
            },
        })
    }
}

impl Expression {
    /// Evaluates this expression against an environment, producing a value.
    pub fn evaluate(&self, env: &Environment) -> Result<Value, ExecutorError> {
        match self {
            Expression::Null => Ok(Value::Null),
            Expression::Boolean(b) => Ok(Value::Boolean(*b)),
            Expression::Integer(n) => Ok(Value::Int32(*n)),
            Expression::Float(x) => Ok(Value::Float64(*x)),
            Expression::String(s) => Ok(Value::Text(s.clone())),

            Expression::ColumnRef { table, name } => {
                Ok(env.lookup(table.as_deref(), name)?.clone())
            }

            Expression::BinaryOp { left, op, right } => {
                let lhs = left.evaluate(env)?;
                let rhs = right.evaluate(env)?;
                eval_binary_op(&lhs, *op, &rhs)
            }

            Expression::UnaryOp { op, operand } => {
                let value = operand.evaluate(env)?;
                eval_unary_op(*op, &value)
            }
        }
    }
}

/// Evaluates a binary operation.
fn eval_binary_op(left: &Value, op: BinaryOperator, right: &Value) -> Result<Value, ExecutorError> {
    // Logical operators use three-valued NULL logic.
    match op {
        BinaryOperator::And => return eval_and(left, right),
        BinaryOperator::Or => return eval_or(left, right),
        _ => {}
    }

    // NULL propagation for comparison and arithmetic.
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    match op {
        BinaryOperator::Eq => Ok(Value::Boolean(
            compare_values(left, right)? == Ordering::Equal,
        )),
        BinaryOperator::Neq => Ok(Value::Boolean(
            compare_values(left, right)? != Ordering::Equal,
        )),
        BinaryOperator::Lt => Ok(Value::Boolean(
            compare_values(left, right)? == Ordering::Less,
        )),
        BinaryOperator::LtEq => Ok(Value::Boolean(
            compare_values(left, right)? != Ordering::Greater,
        )),
        BinaryOperator::Gt => Ok(Value::Boolean(
            compare_values(left, right)? == Ordering::Greater,
        )),
        BinaryOperator::GtEq => Ok(Value::Boolean(
            compare_values(left, right)? != Ordering::Less,
        )),
        _ => eval_arithmetic(left, op, right),
    }
}

/// Evaluates AND with three-valued NULL logic.
fn eval_and(left: &Value, right: &Value) -> Result<Value, ExecutorError> {
    let lhs = value_to_bool_nullable(left)?;
    let rhs = value_to_bool_nullable(right)?;
    match (lhs, rhs) {
        (Some(false), _) | (_, Some(false)) => Ok(Value::Boolean(false)),
        (Some(true), Some(true)) => Ok(Value::Boolean(true)),
        _ => Ok(Value::Null),
    }
}

/// Evaluates OR with three-valued NULL logic.
fn eval_or(left: &Value, right: &Value) -> Result<Value, ExecutorError> {
    let lhs = value_to_bool_nullable(left)?;
    let rhs = value_to_bool_nullable(right)?;
    match (lhs, rhs) {
        (Some(true), _) | (_, Some(true)) => Ok(Value::Boolean(true)),
        (Some(false), Some(false)) => Ok(Value::Boolean(false)),
        _ => Ok(Value::Null),
    }
}

/// Converts a value to an optional boolean (`None` for NULL).
fn value_to_bool_nullable(value: &Value) -> Result<Option<bool>, ExecutorError> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        _ => Err(ExecutorError::TypeMismatch {
            expected: "BOOLEAN".to_string(),
            found: value_type_name(value),
        }),
    }
}

/// A pair of numeric operands promoted to their common type.
///
/// Arithmetic keeps the narrowest common type: two INTEGER operands stay
/// 32-bit (with overflow checking), mixing in a BIGINT widens to 64-bit,
/// and any DOUBLE operand makes the operation floating point.
enum NumericPair {
    Int32(i32, i32),
    Int64(i64, i64),
    Float64(f64, f64),
}

/// Promotes two numeric values to their common type.
fn promote_numeric(left: &Value, right: &Value) -> Result<NumericPair, ExecutorError> {
    let type_error = |value: &Value| ExecutorError::TypeMismatch {
        expected: "numeric".to_string(),
        found: value_type_name(value),
    };

    match (left, right) {
        (Value::Int32(a), Value::Int32(b)) => Ok(NumericPair::Int32(*a, *b)),
        (Value::Int32(a), Value::Int64(b)) => Ok(NumericPair::Int64(*a as i64, *b)),
        (Value::Int64(a), Value::Int32(b)) => Ok(NumericPair::Int64(*a, *b as i64)),
        (Value::Int64(a), Value::Int64(b)) => Ok(NumericPair::Int64(*a, *b)),
        (Value::Float64(a), Value::Float64(b)) => Ok(NumericPair::Float64(*a, *b)),
        (Value::Float64(a), Value::Int32(b)) => Ok(NumericPair::Float64(*a, *b as f64)),
        (Value::Float64(a), Value::Int64(b)) => Ok(NumericPair::Float64(*a, *b as f64)),
        (Value::Int32(a), Value::Float64(b)) => Ok(NumericPair::Float64(*a as f64, *b)),
        (Value::Int64(a), Value::Float64(b)) => Ok(NumericPair::Float64(*a as f64, *b)),
        (Value::Int32(_) | Value::Int64(_) | Value::Float64(_), other) => Err(type_error(other)),
        (other, _) => Err(type_error(other)),
    }
}

/// Evaluates arithmetic operators (`+`, `-`, `*`, `/`, `%`).
fn eval_arithmetic(
    left: &Value,
    op: BinaryOperator,
    right: &Value,
) -> Result<Value, ExecutorError> {
    match promote_numeric(left, right)? {
        NumericPair::Int32(a, b) => {
            let result = match op {
                BinaryOperator::Add => a.checked_add(b).ok_or(ExecutorError::IntegerOverflow)?,
                BinaryOperator::Sub => a.checked_sub(b).ok_or(ExecutorError::IntegerOverflow)?,
                BinaryOperator::Mul => a.checked_mul(b).ok_or(ExecutorError::IntegerOverflow)?,
                BinaryOperator::Div => {
                    if b == 0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a.checked_div(b).ok_or(ExecutorError::IntegerOverflow)?
                }
                BinaryOperator::Mod => {
                    if b == 0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a.checked_rem(b).ok_or(ExecutorError::IntegerOverflow)?
                }
                _ => unreachable!("non-arithmetic operator in eval_arithmetic"),
            };
            Ok(Value::Int32(result))
        }
        NumericPair::Int64(a, b) => {
            let result = match op {
                BinaryOperator::Add => a.checked_add(b).ok_or(ExecutorError::IntegerOverflow)?,
                BinaryOperator::Sub => a.checked_sub(b).ok_or(ExecutorError::IntegerOverflow)?,
                BinaryOperator::Mul => a.checked_mul(b).ok_or(ExecutorError::IntegerOverflow)?,
                BinaryOperator::Div => {
                    if b == 0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a.checked_div(b).ok_or(ExecutorError::IntegerOverflow)?
                }
                BinaryOperator::Mod => {
                    if b == 0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a.checked_rem(b).ok_or(ExecutorError::IntegerOverflow)?
                }
                _ => unreachable!("non-arithmetic operator in eval_arithmetic"),
            };
            Ok(Value::Int64(result))
        }
        NumericPair::Float64(a, b) => {
            let result = match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Sub => a - b,
                BinaryOperator::Mul => a * b,
                BinaryOperator::Div => {
                    if b == 0.0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a / b
                }
                BinaryOperator::Mod => {
                    if b == 0.0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a % b
                }
                _ => unreachable!("non-arithmetic operator in eval_arithmetic"),
            };
            Ok(Value::Float64(result))
        }
    }
}

/// Compares two non-NULL values, promoting numerics to a common type.
///
/// Boolean ordering is `false < true`. Incomparable floats (NaN) compare
/// equal.
fn compare_values(left: &Value, right: &Value) -> Result<Ordering, ExecutorError> {
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        _ => match promote_numeric(left, right)? {
            NumericPair::Int32(a, b) => Ok(a.cmp(&b)),
            NumericPair::Int64(a, b) => Ok(a.cmp(&b)),
            NumericPair::Float64(a, b) => Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
        },
    }
}

/// Evaluates a unary operation.
fn eval_unary_op(op: UnaryOperator, value: &Value) -> Result<Value, ExecutorError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match op {
        UnaryOperator::Not => match value {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            _ => Err(ExecutorError::TypeMismatch {
                expected: "BOOLEAN".to_string(),
                found: value_type_name(value),
            }),
        },
        UnaryOperator::Minus => match value {
            Value::Int32(n) => Ok(Value::Int32(
                n.checked_neg().ok_or(ExecutorError::IntegerOverflow)?,
            )),
            Value::Int64(n) => Ok(Value::Int64(
                n.checked_neg().ok_or(ExecutorError::IntegerOverflow)?,
            )),
            Value::Float64(x) => Ok(Value::Float64(-x)),
            _ => Err(ExecutorError::TypeMismatch {
                expected: "numeric".to_string(),
                found: value_type_name(value),
            }),
        },
    }
}

/// Returns the type name of a value for error messages.
fn value_type_name(value: &Value) -> String {
    match value.data_type() {
        Some(ty) => ty.to_string(),
        None => "NULL".to_string(),
    }
}
