//! Default backend: direct AST interpretation of translated statements.
//!
//! No bytecode stage; the statement subset is small enough to walk
//! directly. Names resolve against the caller's context values first, then
//! against untyped locals created on first assignment. A bound descriptor
//! adds compile-time name checking and runtime type enforcement for its
//! fields.

use crate::engine::ast::{BinOp, Expr, Stmt, UnaryOp};
use crate::engine::parser::parse_line;
use crate::engine::value::{ContextValues, Value};
use crate::engine::{CompiledBody, Invocation, InvokeOptions, ScriptBackend};
use crate::error::RuntimeError;
use crate::registry::ContextDescriptor;
use crate::unit::Diagnostic;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptBackend for Interpreter {
    fn compile(
        &self,
        body: &str,
        descriptor: Option<Arc<ContextDescriptor>>,
    ) -> (Option<Box<dyn CompiledBody>>, Vec<Diagnostic>) {
        let mut stmts = Vec::new();
        let mut diagnostics = Vec::new();

        for (idx, line) in body.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(stmt) => stmts.push(stmt),
                Err(msg) => {
                    diagnostics.push(Diagnostic::error(format!("line {}: {}", idx + 1, msg)));
                }
            }
        }

        if let Some(descriptor) = &descriptor {
            check_names(&stmts, descriptor, &mut diagnostics);
        }

        if diagnostics.iter().any(Diagnostic::is_error) {
            return (None, diagnostics);
        }
        let program = Program { stmts, descriptor };
        (Some(Box::new(program)), diagnostics)
    }
}

/// With a descriptor bound, every name the body touches must be a declared
/// field; there are no locals to fall back on.
fn check_names(stmts: &[Stmt], descriptor: &ContextDescriptor, diagnostics: &mut Vec<Diagnostic>) {
    let mut names: Vec<&str> = Vec::new();
    for stmt in stmts {
        match stmt {
            Stmt::Print(expr) | Stmt::Expr(expr) => expr.collect_vars(&mut names),
            Stmt::Assign { name, value } => {
                names.push(name.as_str());
                value.collect_vars(&mut names);
            }
        }
    }
    names.sort_unstable();
    names.dedup();
    for name in names {
        if !descriptor.has_field(name) {
            diagnostics.push(Diagnostic::error(format!(
                "unknown field '{}' in context for '{}'",
                name, descriptor.owner
            )));
        }
    }
}

struct Program {
    stmts: Vec<Stmt>,
    descriptor: Option<Arc<ContextDescriptor>>,
}

impl CompiledBody for Program {
    fn run(
        &self,
        ctx: Option<&mut ContextValues>,
        opts: &InvokeOptions,
    ) -> Result<Invocation, RuntimeError> {
        let mut env = Env {
            ctx,
            descriptor: self.descriptor.as_deref(),
            locals: HashMap::new(),
            steps: 0,
            limit: opts.step_limit,
        };

        let mut last = Value::Unit;
        let mut output = Vec::new();
        for stmt in &self.stmts {
            match stmt {
                Stmt::Print(expr) => {
                    let value = env.eval(expr)?;
                    let line = value.to_string();
                    tracing::info!(target: "modscript::script", "{}", line);
                    output.push(line);
                }
                Stmt::Assign { name, value } => {
                    let value = env.eval(value)?;
                    env.write(name, value)?;
                }
                Stmt::Expr(expr) => last = env.eval(expr)?,
            }
        }
        Ok(Invocation {
            value: last,
            output,
        })
    }
}

struct Env<'a> {
    ctx: Option<&'a mut ContextValues>,
    descriptor: Option<&'a ContextDescriptor>,
    locals: HashMap<String, Value>,
    steps: usize,
    limit: Option<usize>,
}

impl Env<'_> {
    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        match self.limit {
            Some(limit) if self.steps > limit => Err(RuntimeError::BudgetExhausted(limit)),
            _ => Ok(()),
        }
    }

    fn read(&mut self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(ctx) = &self.ctx {
            if let Some(value) = ctx.get(name) {
                return Ok(value.clone());
            }
        }
        self.locals
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedName(name.to_string()))
    }

    fn write(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if let Some(descriptor) = self.descriptor {
            if let Some(ty) = descriptor.field_type(name) {
                if !value.conforms_to(ty) {
                    return Err(RuntimeError::FieldTypeMismatch {
                        field: name.to_string(),
                        expected: ty.to_string(),
                        found: value.type_name().to_string(),
                    });
                }
            }
        }
        if let Some(ctx) = &mut self.ctx {
            let declared = self
                .descriptor
                .map(|d| d.has_field(name))
                .unwrap_or(false);
            if declared || ctx.contains(name) {
                ctx.set(name, value);
                return Ok(());
            }
        }
        self.locals.insert(name.to_string(), value);
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        self.tick()?;
        match expr {
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(name) => self.read(name),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                apply_unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                apply_binary(*op, lhs, rhs)
            }
        }
    }
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, RuntimeError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(-i)),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, v) => Err(type_error("number", &v)),
        (UnaryOp::Not, v) => Err(type_error("Bool", &v)),
    }
}

fn apply_binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    use BinOp::*;
    match op {
        Add => match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (a, b) => numeric(a, b, i64::checked_add, |x, y| x + y),
        },
        Sub => numeric(lhs, rhs, i64::checked_sub, |x, y| x - y),
        Mul => numeric(lhs, rhs, i64::checked_mul, |x, y| x * y),
        Div => match (&lhs, &rhs) {
            (_, Value::Int(0)) => Err(RuntimeError::DivisionByZero),
            _ => numeric(lhs, rhs, i64::checked_div, |x, y| x / y),
        },
        Mod => match (&lhs, &rhs) {
            (_, Value::Int(0)) => Err(RuntimeError::DivisionByZero),
            _ => numeric(lhs, rhs, i64::checked_rem, |x, y| x % y),
        },
        Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        Lt | Le | Gt | Ge => compare(op, lhs, rhs),
    }
}

fn numeric(
    lhs: Value,
    rhs: Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            int_op(a, b).map(Value::Int).ok_or(RuntimeError::Overflow)
        }
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(a as f64, b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(a, b as f64))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(a, b))),
        (a, b) => {
            let bad = if matches!(a, Value::Int(_) | Value::Float(_)) {
                b
            } else {
                a
            };
            Err(type_error("number", &bad))
        }
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (a, b) => a == b,
    }
}

fn compare(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    let ordering = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        _ => None,
    };
    let ordering = ordering.ok_or_else(|| type_error("comparable values", &rhs))?;
    let result = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!("compare called with non-ordering op"),
    };
    Ok(Value::Bool(result))
}

fn type_error(expected: &str, found: &Value) -> RuntimeError {
    RuntimeError::TypeError {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::FieldType;

    fn run_body(body: &str, ctx: Option<&mut ContextValues>) -> Invocation {
        let backend = Interpreter::new();
        let (program, diags) = backend.compile(body, None);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        program
            .unwrap()
            .run(ctx, &InvokeOptions::default())
            .unwrap()
    }

    #[test]
    fn increments_context_field() {
        let mut ctx = ContextValues::from_pairs([("i", Value::Int(0))]);
        run_body("i = i + 1;", Some(&mut ctx));
        assert_eq!(ctx.get("i"), Some(&Value::Int(1)));
    }

    #[test]
    fn last_bare_expression_is_the_return_value() {
        let result = run_body("x = 2;\nx * 21;", None);
        assert_eq!(result.value, Value::Int(42));
    }

    #[test]
    fn print_collects_output_lines() {
        let result = run_body("print(\"hello\");\nprint(1 + 1);", None);
        assert_eq!(result.output, vec!["hello", "2"]);
    }

    #[test]
    fn locals_require_assignment_before_read() {
        let backend = Interpreter::new();
        let (program, _) = backend.compile("y = x + 1;", None);
        let err = program
            .unwrap()
            .run(None, &InvokeOptions::default())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedName(name) if name == "x"));
    }

    #[test]
    fn descriptor_rejects_unknown_names_at_compile_time() {
        let backend = Interpreter::new();
        let descriptor = Arc::new(ContextDescriptor::new("item", [("i", FieldType::Int)]));
        let (program, diags) = backend.compile("j = i + 1;", Some(descriptor));
        assert!(program.is_none());
        assert!(diags.iter().any(|d| d.message.contains("unknown field 'j'")));
    }

    #[test]
    fn typed_field_rejects_mismatched_write() {
        let backend = Interpreter::new();
        let descriptor = Arc::new(ContextDescriptor::new("item", [("i", FieldType::Int)]));
        let (program, diags) = backend.compile("i = \"oops\";", Some(descriptor));
        assert!(diags.is_empty());
        let mut ctx = ContextValues::from_pairs([("i", Value::Int(0))]);
        let err = program
            .unwrap()
            .run(Some(&mut ctx), &InvokeOptions::default())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::FieldTypeMismatch { .. }));
        assert_eq!(ctx.get("i"), Some(&Value::Int(0)));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let backend = Interpreter::new();
        let (program, _) = backend.compile("1 / 0;", None);
        let err = program
            .unwrap()
            .run(None, &InvokeOptions::default())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero));
    }

    #[test]
    fn step_budget_is_enforced() {
        let backend = Interpreter::new();
        let (program, _) = backend.compile("i = 1 + 2 + 3 + 4;", None);
        let opts = InvokeOptions {
            step_limit: Some(2),
        };
        let err = program.unwrap().run(None, &opts).unwrap_err();
        assert!(matches!(err, RuntimeError::BudgetExhausted(2)));
    }

    #[test]
    fn mixed_arithmetic_widens_to_float() {
        let result = run_body("1 + 0.5;", None);
        assert_eq!(result.value, Value::Float(1.5));
        let cmp = run_body("3 > 2.5;", None);
        assert_eq!(cmp.value, Value::Bool(true));
    }
}
