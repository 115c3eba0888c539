use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of a variable-bearing expression node, assigned at parse time.
///
/// The resolver records binding depths keyed by this id, and the evaluator
/// looks them up again.  Ids are drawn from a process-wide counter so nodes
/// parsed on different REPL lines can never alias each other.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    // Literal values carry their token; the evaluator reads the payload.
    Literal(Token),

    Grouping(Box<Expr>),

    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    // 'and' / 'or'; kept apart from Binary so short-circuiting stays explicit.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Variable {
        id: ExprId,
        name: Token,
    },

    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    Get {
        object: Box<Expr>,
        name: Token,
    },

    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        keyword: Token,
    },

    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}
