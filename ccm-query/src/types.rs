//! The query AST produced by [`crate::grammar`] and consumed by
//! [`crate::compile`].

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    AttributeMatch {
        ident: String,
        comparator: Comparator,
        atom: Atom,
    },
    FunctionCall {
        name: String,
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Match,
}

/// The right-hand side of an `attribute_match`. `Str` retains its source
/// quotes (`'released'`, not `released`) since the compiled SQL re-emits
/// them as a string literal; `Ident` is a bare identifier, used to compare
/// two columns or an unquoted keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Ident(String),
    Str(String),
}

/// A parsed four-part name: `name<delim>version:cvtype:subsystem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fpn {
    pub name: String,
    pub version: String,
    pub cvtype: String,
    pub subsystem: String,
}
