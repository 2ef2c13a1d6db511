//! The interpreter.
//!
//! Evaluation is defined against a [`Host`]: a restricted binding table that
//! resolves names, mediates attribute access on the objects it chooses to
//! expose, and dispatches calls to its builtin set. The interpreter itself
//! knows nothing about sites or pages.

use super::ScriptError;
use super::ast::{BinOp, Expr, Program, Stmt, UnaryOp};
use super::value::Value;

/// Evaluated call arguments, positional and named.
#[derive(Debug, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl CallArgs {
    /// Look up a parameter by position or keyword.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional
            .get(index)
            .or_else(|| self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v))
    }

    /// A required string parameter.
    pub fn str_arg(&self, index: usize, name: &str, function: &str) -> Result<String, ScriptError> {
        match self.get(index, name) {
            Some(Value::Str(s)) => Ok(s.clone()),
            Some(other) => Err(ScriptError::Argument {
                function: function.to_string(),
                message: format!("'{name}' must be a string, not {}", other.type_name()),
            }),
            None => Err(ScriptError::Argument {
                function: function.to_string(),
                message: format!("missing argument '{name}'"),
            }),
        }
    }

    /// An optional integer parameter.
    pub fn int_opt(
        &self,
        index: usize,
        name: &str,
        function: &str,
    ) -> Result<Option<i64>, ScriptError> {
        match self.get(index, name) {
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(Value::None) | None => Ok(None),
            Some(other) => Err(ScriptError::Argument {
                function: function.to_string(),
                message: format!("'{name}' must be an integer, not {}", other.type_name()),
            }),
        }
    }

    /// An optional string parameter.
    pub fn str_opt(
        &self,
        index: usize,
        name: &str,
        function: &str,
    ) -> Result<Option<String>, ScriptError> {
        match self.get(index, name) {
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(Value::None) | None => Ok(None),
            Some(other) => Err(ScriptError::Argument {
                function: function.to_string(),
                message: format!("'{name}' must be a string, not {}", other.type_name()),
            }),
        }
    }
}

/// The environment script code runs against.
///
/// Name lookup is layered by the implementation (page locals over site-wide
/// globals); attribute access and calls go through an allow-list the
/// implementation enforces.
pub trait Host {
    fn lookup(&self, name: &str) -> Option<Value>;

    fn assign(&mut self, name: &str, value: Value) -> Result<(), ScriptError>;

    fn get_attr(&self, object: &str, attr: &str) -> Result<Value, ScriptError>;

    fn set_attr(&mut self, object: &str, attr: &str, value: Value) -> Result<(), ScriptError>;

    fn call(&mut self, function: &str, args: CallArgs) -> Result<Value, ScriptError>;
}

/// Evaluate one expression.
pub fn eval(expr: &Expr, host: &mut dyn Host) -> Result<Value, ScriptError> {
    match expr {
        Expr::None => Ok(Value::None),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(n) => Ok(Value::Float(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval(item, host)?);
            }
            Ok(Value::List(values))
        }
        Expr::Var(name) => host
            .lookup(name)
            .ok_or_else(|| ScriptError::Undefined(name.clone())),
        Expr::Attr { object, attr } => host.get_attr(object, attr),
        Expr::Call {
            function,
            args,
            named,
        } => {
            let mut call_args = CallArgs::default();
            for arg in args {
                call_args.positional.push(eval(arg, host)?);
            }
            for (name, arg) in named {
                call_args.named.push((name.clone(), eval(arg, host)?));
            }
            host.call(function, call_args)
        }
        Expr::Unary { op, operand } => {
            let value = eval(operand, host)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                UnaryOp::Neg => match value {
                    Value::Int(n) => Ok(Value::Int(-n)),
                    Value::Float(n) => Ok(Value::Float(-n)),
                    other => Err(ScriptError::Type(format!(
                        "cannot negate {}",
                        other.type_name()
                    ))),
                },
            }
        }
        Expr::Binary { op, left, right } => {
            // Short-circuit the boolean operators.
            match op {
                BinOp::And => {
                    let left = eval(left, host)?;
                    if !left.truthy() {
                        return Ok(Value::Bool(false));
                    }
                    let right = eval(right, host)?;
                    return Ok(Value::Bool(right.truthy()));
                }
                BinOp::Or => {
                    let left = eval(left, host)?;
                    if left.truthy() {
                        return Ok(Value::Bool(true));
                    }
                    let right = eval(right, host)?;
                    return Ok(Value::Bool(right.truthy()));
                }
                _ => {}
            }

            let left = eval(left, host)?;
            let right = eval(right, host)?;
            binary(*op, left, right)
        }
    }
}

/// Run a statement program.
pub fn exec(program: &Program, host: &mut dyn Host) -> Result<(), ScriptError> {
    for stmt in &program.stmts {
        match stmt {
            Stmt::Assign { name, value } => {
                let value = eval(value, host)?;
                host.assign(name, value)?;
            }
            Stmt::AssignAttr {
                object,
                attr,
                value,
            } => {
                let value = eval(value, host)?;
                host.set_attr(object, attr, value)?;
            }
            Stmt::Expr(expr) => {
                eval(expr, host)?;
            }
        }
    }
    Ok(())
}

/// Promote a pair of values for numeric operations. Mixed int/float widens
/// to float.
fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some((*a as f64, *b as f64)),
        (Value::Int(a), Value::Float(b)) => Some((*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Some((*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Some((*a, *b)),
        _ => None,
    }
}

fn type_error(op: &str, left: &Value, right: &Value) -> ScriptError {
    ScriptError::Type(format!(
        "cannot {op} {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, ScriptError> {
    match op {
        BinOp::Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (left, right) => match numeric_pair(&left, &right) {
                Some((a, b)) => Ok(Value::Float(a + b)),
                None => Err(type_error("add", &left, &right)),
            },
        },
        BinOp::Sub | BinOp::Mul | BinOp::Rem | BinOp::Div => {
            if let (Value::Int(a), Value::Int(b)) = (&left, &right) {
                return match op {
                    BinOp::Sub => Ok(Value::Int(a - b)),
                    BinOp::Mul => Ok(Value::Int(a * b)),
                    BinOp::Div if *b == 0 => Err(ScriptError::DivisionByZero),
                    BinOp::Div => Ok(Value::Int(a / b)),
                    BinOp::Rem if *b == 0 => Err(ScriptError::DivisionByZero),
                    BinOp::Rem => Ok(Value::Int(a % b)),
                    _ => unreachable!(),
                };
            }

            let Some((a, b)) = numeric_pair(&left, &right) else {
                let name = match op {
                    BinOp::Sub => "subtract",
                    BinOp::Mul => "multiply",
                    BinOp::Div => "divide",
                    _ => "take the remainder of",
                };
                return Err(type_error(name, &left, &right));
            };

            match op {
                BinOp::Sub => Ok(Value::Float(a - b)),
                BinOp::Mul => Ok(Value::Float(a * b)),
                BinOp::Div if b == 0.0 => Err(ScriptError::DivisionByZero),
                BinOp::Div => Ok(Value::Float(a / b)),
                BinOp::Rem if b == 0.0 => Err(ScriptError::DivisionByZero),
                BinOp::Rem => Ok(Value::Float(a % b)),
                _ => unreachable!(),
            }
        }
        BinOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinOp::NotEq => Ok(Value::Bool(!values_equal(&left, &right))),
        BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
            let ordering = match (&left, &right) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                (left, right) => match numeric_pair(left, right) {
                    Some((a, b)) => a.partial_cmp(&b),
                    None => return Err(type_error("compare", left, right)),
                },
            };

            let Some(ordering) = ordering else {
                return Err(type_error("compare", &left, &right));
            };

            let result = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::LtEq => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                BinOp::GtEq => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        BinOp::And | BinOp::Or => unreachable!("handled by short-circuit evaluation"),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match numeric_pair(left, right) {
        Some((a, b)) => a == b,
        None => left == right,
    }
}
