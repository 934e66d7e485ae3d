//! Pluggable compilation capability.
//!
//! The block parser hands each accumulated method body to a
//! [`ScriptBackend`], which turns it into something invocable. The default
//! backend is [`Interpreter`]: a direct AST interpreter for the statement
//! subset the DSL actually produces (assignment, arithmetic and comparison,
//! field read/write, print). Hosts that need more can supply their own
//! backend without touching the pipeline.

pub mod ast;
pub mod interp;
pub mod parser;
pub mod value;

pub use interp::Interpreter;

use crate::error::RuntimeError;
use crate::registry::ContextDescriptor;
use crate::unit::Diagnostic;
use std::sync::Arc;
use value::{ContextValues, Value};

/// Result of one successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Value of the last bare expression in the body, or `Unit`.
    pub value: Value,
    /// Lines emitted by `print` statements, in order.
    pub output: Vec<String>,
}

/// Per-invocation execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeOptions {
    /// Upper bound on interpreter steps; `None` means unbounded. This is
    /// the synchronous equivalent of an invocation timeout.
    pub step_limit: Option<usize>,
}

/// An invocable compiled method body.
pub trait CompiledBody: Send + Sync {
    fn run(
        &self,
        ctx: Option<&mut ContextValues>,
        opts: &InvokeOptions,
    ) -> Result<Invocation, RuntimeError>;
}

/// Compiles body text into an invocable unit. Never fails outright: fatal
/// problems surface as Error diagnostics with no compiled body.
pub trait ScriptBackend: Send + Sync {
    fn compile(
        &self,
        body: &str,
        descriptor: Option<Arc<ContextDescriptor>>,
    ) -> (Option<Box<dyn CompiledBody>>, Vec<Diagnostic>);
}
