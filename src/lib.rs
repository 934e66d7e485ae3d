//! modscript - runtime script extension points for a host application.
//!
//! The host registers owner types and typed argument contexts, then loads
//! small line-oriented DSL scripts that implement named handler methods
//! without recompiling the host.
//!
//! ## Pipeline
//! DSL Source -> Statement Translator -> Block Parser -> Backend Compile
//! -> Object Pool -> Host Binding invoke
//!
//! ## Quick Start
//!
//! ```rust
//! use modscript::{
//!     CompileScheduler, ContextDescriptor, ContextRegistry, ContextValues, FieldType,
//!     HostBinding, ScriptSource, SourceSpec, Value,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut registry = ContextRegistry::new();
//! registry
//!     .register("item", &["use"], ContextDescriptor::new("item", [("i", FieldType::Int)]))
//!     .unwrap();
//!
//! let pool = modscript::shared_pool();
//! let scheduler = CompileScheduler::new(Arc::clone(&pool), Arc::new(registry));
//! let script = "type item called testItem1\nmethod use\ni = i + 1\nend\nend\n";
//! let handle = scheduler
//!     .run(vec![SourceSpec::memory(ScriptSource::from_text("demo.cns", script))])
//!     .unwrap();
//! handle.wait().await;
//!
//! let entry = pool.read().await.get("item.testItem1").unwrap();
//! let binding = HostBinding::bind(entry);
//! let mut ctx = ContextValues::from_pairs([("i", Value::Int(0))]);
//! binding.invoke_with("use", &mut ctx, Value::Unit);
//! assert_eq!(ctx.get("i"), Some(&Value::Int(1)));
//! # }
//! ```

// Core error handling
pub mod error;

// Statement-level translation and the pluggable compile/execute backend
pub mod engine;
pub mod translate;

// Host-side type metadata
pub mod registry;

// Source intake and the block parser over it
pub mod parser;
pub mod source;

// Compiled results and their repository
pub mod pool;
pub mod unit;

// Background compilation pipeline
pub mod job;

// Execution façade
pub mod binding;

pub use binding::{shared_failure_log, FailureRecord, HostBinding, SharedFailureLog};
pub use engine::value::{ContextValues, FieldType, Value};
pub use engine::{CompiledBody, Interpreter, Invocation, InvokeOptions, ScriptBackend};
pub use error::{InvokeError, JobError, PoolError, RegistryError, RuntimeError};
pub use job::{CompileScheduler, JobHandle, JobState, JobStatus, SourceSpec};
pub use parser::{BlockParser, ParseOutcome};
pub use pool::{shared_pool, ObjectEntry, ObjectPool, SharedPool};
pub use registry::{ContextDescriptor, ContextRegistry};
pub use source::ScriptSource;
pub use translate::Translator;
pub use unit::{Diagnostic, ExecutableUnit, Severity, UnitState};
