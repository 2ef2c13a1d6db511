//! The script AST.
//!
//! Compiled once per template expression, header block, or config file, then
//! evaluated any number of times.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Expr>),
    /// A plain name, resolved through the host's binding table.
    Var(String),
    /// Attribute access on a host object (`site.prefix`, `page.title`).
    /// Only single-level access on a named object exists; values themselves
    /// have no attributes.
    Attr { object: String, attr: String },
    Call {
        function: String,
        args: Vec<Expr>,
        named: Vec<(String, Expr)>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `name = expr` — bind a variable in the current namespace.
    Assign { name: String, value: Expr },
    /// `object.attr = expr` — allow-listed write on a host object.
    AssignAttr {
        object: String,
        attr: String,
        value: Expr,
    },
    /// A bare expression, evaluated for its effects and discarded.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
