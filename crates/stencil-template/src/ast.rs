/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Syntax tree of the template statement language.
//!
//! Placeholders (`$(expr)` / `«expr»`) hold an [`Expr`], and escape lines
//! (`# ...`) hold a [`Statement`]. Both are parsed once, at compile time.

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `nil`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// `42`, `2.5`
    Number(f64),
    /// `"text"` / `'text'`
    Str(String),
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// A variable reference: `name`
    Var(String),
    /// Field access: `user.name`
    Field(Box<Expr>, String),
    /// Indexing: `items[1]`, `map["key"]`
    Index(Box<Expr>, Box<Expr>),
    /// Function call: `upper(name)`
    Call(Box<Expr>, Vec<Expr>),
    /// `not x`, `-x`
    Unary(UnaryOp, Box<Expr>),
    /// `a + b`, `a and b`, ...
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// The operator as written in templates.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Concat => "..",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

impl Expr {
    /// A short human-readable name for this expression, used to point at the
    /// culprit in error messages (`user.name`, `items[...]`, `upper(...)`).
    pub fn describe(&self) -> String {
        match self {
            Expr::Var(name) => name.clone(),
            Expr::Field(base, name) => format!("{}.{}", base.describe(), name),
            Expr::Index(base, _) => format!("{}[...]", base.describe()),
            Expr::Call(callee, _) => format!("{}(...)", callee.describe()),
            Expr::Nil => "nil".to_string(),
            Expr::Bool(b) => b.to_string(),
            Expr::Number(n) => n.to_string(),
            Expr::Str(s) => format!("{:?}", s),
            Expr::List(_) => "[...]".to_string(),
            Expr::Unary(..) | Expr::Binary(..) => "expression".to_string(),
        }
    }
}

/// The statement held by one escape line.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// An empty escape line or a `-- comment`.
    Nop,
    /// `if <expr>`
    If(Expr),
    /// `elif <expr>`
    Elif(Expr),
    /// `else`
    Else,
    /// `end` (closes `if` and `for`)
    End,
    /// `for <name>[, <name>...] in <expr>`
    For { names: Vec<String>, iterable: Expr },
    /// `set <name> = <expr>`
    Set { name: String, value: Expr },
    /// An expression evaluated for its effect, e.g. `insert(lines)`.
    Expr(Expr),
}
