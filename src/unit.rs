//! Executable units and compile diagnostics.

use crate::engine::value::ContextValues;
use crate::engine::{CompiledBody, Invocation, InvokeOptions, ScriptBackend};
use crate::error::InvokeError;
use crate::registry::ContextDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// One compile- or job-level finding, tagged with as much identity as the
/// pipeline knows at the point it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub source: Option<String>,
    pub object: Option<String>,
    pub method: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            source: None,
            object: None,
            method: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            ..Self::error("")
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "warning: {}", self.message)?,
            Severity::Error => write!(f, "error: {}", self.message)?,
        }
        if let Some(source) = &self.source {
            write!(f, " [{}]", source)?;
        }
        if let (Some(object), Some(method)) = (&self.object, &self.method) {
            write!(f, " ({}.{})", object, method)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Compiled,
    Failed,
}

/// One compiled method body, ready to invoke. Immutable once built.
pub struct ExecutableUnit {
    body: String,
    descriptor: Option<Arc<ContextDescriptor>>,
    state: UnitState,
    diagnostics: Vec<Diagnostic>,
    program: Option<Box<dyn CompiledBody>>,
}

impl ExecutableUnit {
    /// Compiles `body` through the backend. A unit with only warnings is
    /// usable; one with errors is kept for inspection but marked failed.
    pub fn compile(
        backend: &dyn ScriptBackend,
        body: String,
        descriptor: Option<Arc<ContextDescriptor>>,
    ) -> Self {
        let (program, diagnostics) = backend.compile(&body, descriptor.clone());
        let state = if program.is_some() {
            UnitState::Compiled
        } else {
            UnitState::Failed
        };
        Self {
            body,
            descriptor,
            state,
            diagnostics,
            program,
        }
    }

    /// Runs the unit. `method` is only used to label the failure.
    pub fn run(
        &self,
        method: &str,
        ctx: Option<&mut ContextValues>,
        opts: &InvokeOptions,
    ) -> Result<Invocation, InvokeError> {
        match &self.program {
            Some(program) => program.run(ctx, opts).map_err(InvokeError::Runtime),
            None => Err(InvokeError::UnitNotCompiled(method.to_string())),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn descriptor(&self) -> Option<&Arc<ContextDescriptor>> {
        self.descriptor.as_ref()
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn is_compiled(&self) -> bool {
        self.state == UnitState::Compiled
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Debug for ExecutableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableUnit")
            .field("state", &self.state)
            .field("diagnostics", &self.diagnostics)
            .field("body", &self.body)
            .finish()
    }
}
