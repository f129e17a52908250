//! Expression trees and projection select values.
//!
//! [`Expression`] is the executor's representation of scalar expressions.
//! Column references are name-based and resolved at evaluation time through
//! the [`Environment`](super::eval::Environment), which binds tuples to
//! schemas; static types are inferred against a [`Schema`] during plan
//! preparation.
//!
//! [`SelectValue`] is one entry of a projection spec: a wildcard (optionally
//! table-qualified), an expression with an optional alias, or a scalar
//! subquery (recognized but unsupported).

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::datum::Type;

use super::error::ExecutorError;
use super::schema::{ColumnInfo, Schema};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
    /// Modulo (`%`).
    Mod,
    /// Equality (`=`).
    Eq,
    /// Inequality (`<>`).
    Neq,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    LtEq,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    GtEq,
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

impl BinaryOperator {
    /// Returns the SQL spelling of this operator.
    pub const fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Eq => "=",
            BinaryOperator::Neq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }

    /// Returns true for the arithmetic operators.
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Div
                | BinaryOperator::Mod
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Arithmetic negation (`-`).
    Minus,
    /// Logical NOT.
    Not,
}

/// A scalar expression tree.
///
/// Column references carry names, not positions; they are resolved against
/// the evaluation environment's bindings at evaluation time, and against a
/// schema during static type inference.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// NULL literal.
    Null,
    /// Boolean literal.
    Boolean(bool),
    /// Integer literal (INTEGER).
    Integer(i32),
    /// Floating-point literal (DOUBLE PRECISION).
    Float(f64),
    /// String literal.
    String(String),
    /// Column reference, optionally table-qualified.
    ColumnRef {
        /// Qualifying table name, if given.
        table: Option<String>,
        /// Column name.
        name: String,
    },
    /// Binary operation.
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// Unary operation.
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
}

impl Expression {
    /// Convenience constructor for an unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expression::ColumnRef {
            table: None,
            name: name.into(),
        }
    }

    /// Convenience constructor for a qualified column reference.
    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expression::ColumnRef {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Convenience constructor for a binary operation.
    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Returns true if this expression is a bare column reference.
    pub fn is_column_ref(&self) -> bool {
        matches!(self, Expression::ColumnRef { .. })
    }

    /// Infers the static result type of this expression over a schema.
    ///
    /// Arithmetic results take the wider of the operand types; comparisons
    /// and logic produce booleans. An untyped NULL literal resolves to
    /// TEXT.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ColumnNotFound`] /
    /// [`ExecutorError::AmbiguousColumn`] for unresolvable references and
    /// [`ExecutorError::TypeMismatch`] for ill-typed operations.
    pub fn result_type(&self, schema: &Schema) -> Result<Type, ExecutorError> {
        match self {
            Expression::Null => Ok(Type::Text),
            Expression::Boolean(_) => Ok(Type::Bool),
            Expression::Integer(_) => Ok(Type::Integer),
            Expression::Float(_) => Ok(Type::Double),
            Expression::String(_) => Ok(Type::Text),

            Expression::ColumnRef { table, name } => {
                let index = schema
                    .find_column(table.as_deref(), name)?
                    .ok_or_else(|| ExecutorError::ColumnNotFound {
                        name: self.to_string(),
                    })?;
                Ok(schema.columns()[index].ty)
            }

            Expression::BinaryOp { left, op, right } => {
                if op.is_arithmetic() {
                    let lhs = left.result_type(schema)?;
                    let rhs = right.result_type(schema)?;
                    wider_numeric_type(lhs, rhs)
                } else {
                    Ok(Type::Bool)
                }
            }

            Expression::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => Ok(Type::Bool),
                UnaryOperator::Minus => {
                    let ty = operand.result_type(schema)?;
                    if ty.is_numeric() {
                        Ok(ty)
                    } else {
                        Err(ExecutorError::TypeMismatch {
                            expected: "numeric".to_string(),
                            found: ty.to_string(),
                        })
                    }
                }
            },
        }
    }

    /// Derives a column descriptor for this expression's result.
    ///
    /// A bare column reference keeps the referenced column's descriptor;
    /// any other expression produces an unqualified column named after the
    /// expression's display form.
    pub fn column_info(&self, schema: &Schema) -> Result<ColumnInfo, ExecutorError> {
        if let Expression::ColumnRef { table, name } = self {
            let index = schema
                .find_column(table.as_deref(), name)?
                .ok_or_else(|| ExecutorError::ColumnNotFound {
                    name: self.to_string(),
                })?;
            return Ok(schema.columns()[index].clone());
        }

        Ok(ColumnInfo::new(self.to_string(), self.result_type(schema)?))
    }
}

/// Returns the wider of two numeric types for an arithmetic result.
fn wider_numeric_type(left: Type, right: Type) -> Result<Type, ExecutorError> {
    if !left.is_numeric() || !right.is_numeric() {
        return Err(ExecutorError::TypeMismatch {
            expected: "numeric".to_string(),
            found: if left.is_numeric() { right } else { left }.to_string(),
        });
    }
    Ok(match (left, right) {
        (Type::Double, _) | (_, Type::Double) => Type::Double,
        (Type::Bigint, _) | (_, Type::Bigint) => Type::Bigint,
        _ => Type::Integer,
    })
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Null => write!(f, "NULL"),
            Expression::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expression::Integer(n) => write!(f, "{}", n),
            Expression::Float(x) => write!(f, "{}", x),
            Expression::String(s) => write!(f, "'{}'", s),
            Expression::ColumnRef { table, name } => match table {
                Some(table) => write!(f, "{}.{}", table, name),
                None => write!(f, "{}", name),
            },
            Expression::BinaryOp { left, op, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.as_str())?;
                write_operand(f, right)
            }
            Expression::UnaryOp { op, operand } => {
                match op {
                    UnaryOperator::Minus => write!(f, "-")?,
                    UnaryOperator::Not => write!(f, "NOT ")?,
                }
                write_operand(f, operand)
            }
        }
    }
}

/// Writes an operand, parenthesizing nested operations.
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    match expr {
        Expression::BinaryOp { .. } | Expression::UnaryOp { .. } => {
            write!(f, "({})", expr)
        }
        _ => write!(f, "{}", expr),
    }
}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Expression::Null => {}
            Expression::Boolean(b) => b.hash(state),
            Expression::Integer(n) => n.hash(state),
            // Hash the bit pattern; structural equality on floats is
            // bitwise for every value produced by equal plan specs.
            Expression::Float(x) => x.to_bits().hash(state),
            Expression::String(s) => s.hash(state),
            Expression::ColumnRef { table, name } => {
                table.hash(state);
                name.hash(state);
            }
            Expression::BinaryOp { left, op, right } => {
                left.hash(state);
                op.hash(state);
                right.hash(state);
            }
            Expression::UnaryOp { op, operand } => {
                op.hash(state);
                operand.hash(state);
            }
        }
    }
}

/// One entry of a projection spec.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectValue {
    /// A wildcard, optionally restricted to one table's columns.
    Wildcard {
        /// Qualifying table name, if given (`t.*`).
        table: Option<String>,
    },
    /// An expression, optionally aliased.
    Expression {
        /// The expression to evaluate per tuple.
        expr: Expression,
        /// Output column alias, if given.
        alias: Option<String>,
    },
    /// A scalar subquery. Recognized but not supported; both
    /// schema-resolution and evaluation reject it.
    ScalarSubquery,
}

impl SelectValue {
    /// Convenience constructor for an unqualified wildcard (`*`).
    pub fn wildcard() -> Self {
        SelectValue::Wildcard { table: None }
    }

    /// Convenience constructor for a table wildcard (`t.*`).
    pub fn table_wildcard(table: impl Into<String>) -> Self {
        SelectValue::Wildcard {
            table: Some(table.into()),
        }
    }

    /// Convenience constructor for a bare expression.
    pub fn expr(expr: Expression) -> Self {
        SelectValue::Expression { expr, alias: None }
    }

    /// Convenience constructor for an aliased expression.
    pub fn aliased(expr: Expression, alias: impl Into<String>) -> Self {
        SelectValue::Expression {
            expr,
            alias: Some(alias.into()),
        }
    }
}

impl fmt::Display for SelectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectValue::Wildcard { table: Some(table) } => write!(f, "{}.*", table),
            SelectValue::Wildcard { table: None } => write!(f, "*"),
            SelectValue::Expression { expr, alias } => {
                write!(f, "{}", expr)?;
                if let Some(alias) = alias {
                    write!(f, " AS {}", alias)?;
                }
                Ok(())
            }
            SelectValue::ScalarSubquery => write!(f, "(scalar subquery)"),
        }
    }
}

impl Hash for SelectValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SelectValue::Wildcard { table } => table.hash(state),
            SelectValue::Expression { expr, alias } => {
                expr.hash(state);
                alias.hash(state);
            }
            SelectValue::ScalarSubquery => {}
        }
    }
}
