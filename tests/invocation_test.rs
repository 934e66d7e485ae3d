//! Host binding scenarios: compiled scripts driving host-visible state.

use modscript::{
    CompileScheduler, ContextDescriptor, ContextRegistry, ContextValues, FieldType, HostBinding,
    ObjectEntry, ScriptSource, SourceSpec, Value,
};
use std::sync::Arc;

async fn compile_one(registry: ContextRegistry, name: &str, text: &str) -> Arc<ObjectEntry> {
    let pool = modscript::shared_pool();
    let scheduler = CompileScheduler::new(Arc::clone(&pool), Arc::new(registry));
    let status = scheduler
        .run(vec![SourceSpec::memory(ScriptSource::from_text(
            "test.cns", text,
        ))])
        .unwrap()
        .wait()
        .await;
    assert!(
        status.diagnostics.iter().all(|d| !d.is_error()),
        "unexpected errors: {:?}",
        status.diagnostics
    );
    let pool = pool.read().await;
    pool.get(name).unwrap()
}

fn item_registry() -> ContextRegistry {
    let mut registry = ContextRegistry::new();
    registry
        .register(
            "item",
            &["use"],
            ContextDescriptor::new("item", [("i", FieldType::Int)]),
        )
        .unwrap();
    registry
}

const USE_SCRIPT: &str = "\
type item called testItem1
method use
i = i + 1
end
end
";

#[tokio::test]
async fn single_invocation_increments_host_field() {
    let entry = compile_one(item_registry(), "item.testItem1", USE_SCRIPT).await;
    let binding = HostBinding::bind(entry);
    let mut ctx = ContextValues::from_pairs([("i", Value::Int(0))]);
    binding.invoke_with("use", &mut ctx, Value::Unit);
    assert_eq!(ctx.get("i"), Some(&Value::Int(1)));
    assert!(binding.failures().is_empty());
}

#[tokio::test]
async fn ten_thousand_invocations_accumulate() {
    let entry = compile_one(item_registry(), "item.testItem1", USE_SCRIPT).await;
    let binding = HostBinding::bind(entry);
    let mut ctx = ContextValues::from_pairs([("i", Value::Int(0))]);
    for _ in 0..10_000 {
        binding.invoke_with("use", &mut ctx, Value::Unit);
    }
    assert_eq!(ctx.get("i"), Some(&Value::Int(10_000)));
    assert!(binding.failures().is_empty());
}

#[tokio::test]
async fn absent_method_yields_caller_default() {
    let entry = compile_one(item_registry(), "item.testItem1", USE_SCRIPT).await;
    let binding = HostBinding::bind(entry);
    let result = binding.invoke("onJump", Value::Str("fallback".into()));
    assert_eq!(result, Value::Str("fallback".into()));
    assert!(binding.failures().is_empty());
}

#[tokio::test]
async fn print_output_and_return_value_flow_back() {
    let text = "\
type item called chatty
method describe
print a worn blade
n = 2
n * 21
end
end
";
    let entry = compile_one(ContextRegistry::new(), "item.chatty", text).await;
    let binding = HostBinding::bind(entry);
    let invocation = binding.try_invoke("describe", None).unwrap();
    assert_eq!(invocation.output, vec!["a worn blade"]);
    assert_eq!(invocation.value, Value::Int(42));
}

#[tokio::test]
async fn bindings_share_one_entry_without_interference() {
    let entry = compile_one(item_registry(), "item.testItem1", USE_SCRIPT).await;
    let a = HostBinding::bind(Arc::clone(&entry));
    let b = HostBinding::bind(entry);
    let mut ctx_a = ContextValues::from_pairs([("i", Value::Int(0))]);
    let mut ctx_b = ContextValues::from_pairs([("i", Value::Int(100))]);
    a.invoke_with("use", &mut ctx_a, Value::Unit);
    b.invoke_with("use", &mut ctx_b, Value::Unit);
    assert_eq!(ctx_a.get("i"), Some(&Value::Int(1)));
    assert_eq!(ctx_b.get("i"), Some(&Value::Int(101)));
}

#[tokio::test]
async fn failed_unit_invocation_returns_default_and_logs() {
    // 'j' is not a declared context field, so the unit fails to compile.
    let text = "\
type item called broken
method use
j = j + 1
end
end
";
    let pool = modscript::shared_pool();
    let scheduler = CompileScheduler::new(Arc::clone(&pool), Arc::new(item_registry()));
    let status = scheduler
        .run(vec![SourceSpec::memory(ScriptSource::from_text(
            "broken.cns",
            text,
        ))])
        .unwrap()
        .wait()
        .await;
    assert!(status.diagnostics.iter().any(|d| d.is_error()));

    let entry = pool.read().await.get("item.broken").unwrap();
    let binding = HostBinding::bind(entry);
    let mut ctx = ContextValues::from_pairs([("i", Value::Int(0))]);
    let result = binding.invoke_with("use", &mut ctx, Value::Int(-1));
    assert_eq!(result, Value::Int(-1));
    assert_eq!(binding.failures().len(), 1);
    assert!(binding.failures()[0].reason.contains("failed to compile"));
}
