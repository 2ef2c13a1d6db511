//! The embedded script language.
//!
//! Template expressions (`{{ … }}`), page header blocks, and the site
//! configuration file all share one small language: literals, lists,
//! arithmetic and comparison operators, attribute access on host objects,
//! assignments, and calls into a fixed builtin set. Source is compiled to a
//! tagged-union AST once and evaluated against a [`Host`] — a restricted
//! binding table supplied by the caller. There is no way to define functions,
//! loop, or reach outside what the host exposes.

mod ast;
mod eval;
mod lexer;
mod parser;
mod value;

pub use ast::{BinOp, Expr, Program, Stmt, UnaryOp};
pub use eval::{CallArgs, Host, eval, exec};
pub use parser::{parse_expression, parse_program};
pub use value::Value;

/// Errors produced while compiling or running script code.
///
/// Callers wrap these with their own context (file path, expression source)
/// before surfacing them; see `render::template`.
#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Parse(String),

    #[error("name '{0}' is not defined")]
    Undefined(String),

    #[error("access not allowed: {object}.{attr}")]
    NotAllowed { object: String, attr: String },

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("'{0}' is not a function")]
    UnknownFunction(String),

    #[error("{function}: {message}")]
    Argument { function: String, message: String },

    #[error("{function}: {message}")]
    Builtin { function: String, message: String },

    /// A user-raised domain error from `fail(..)`. The message is surfaced
    /// verbatim, without the generic evaluation-error wrapping.
    #[error("{0}")]
    Raised(String),
}
