//! AST for the statement subset the default backend executes.

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `print(expr)`
    Print(Expr),
    /// `name = expr` (also reached via `this.name = expr`)
    Assign { name: String, value: Expr },
    /// A bare expression; the last one evaluated becomes the return value.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Field or local read. `this.x` parses to the same node as `x`.
    Var(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

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
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Expr {
    /// Collects every variable name the expression reads.
    pub fn collect_vars<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Var(name) => out.push(name.as_str()),
            Expr::Unary { operand, .. } => operand.collect_vars(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_vars(out);
                rhs.collect_vars(out);
            }
            _ => {}
        }
    }
}
