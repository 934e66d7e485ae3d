//! Block parser / compiler.
//!
//! Stateful scan of one source into object entries. A segment runs from a
//! `type T called N` header to the `end` that closes it at depth 0; the
//! next segment begins at the first line strictly after that `end`. Within
//! a segment, `method` opens a body, `interop start` toggles verbatim
//! passthrough, and every other line goes through the statement translator.

use crate::engine::ScriptBackend;
use crate::pool::ObjectEntry;
use crate::registry::ContextRegistry;
use crate::source::ScriptSource;
use crate::translate::Translator;
use crate::unit::{Diagnostic, ExecutableUnit};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const METHOD_KEYWORD: &str = "method";
const INTEROP_START: &str = "interop start";
const END_KEYWORD: &str = "end";

/// Everything one source produced: zero or more completed objects plus the
/// findings along the way. Structural errors abandon the rest of the
/// source, so `objects` holds only segments that closed cleanly.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub objects: Vec<ObjectEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct BlockParser<'a> {
    translator: &'a Translator,
    registry: &'a ContextRegistry,
    backend: &'a dyn ScriptBackend,
    header: Regex,
}

impl<'a> BlockParser<'a> {
    pub fn new(
        translator: &'a Translator,
        registry: &'a ContextRegistry,
        backend: &'a dyn ScriptBackend,
    ) -> Self {
        Self {
            translator,
            registry,
            backend,
            header: Regex::new(r"^type (.+?) called (.+)$").unwrap(),
        }
    }

    pub fn parse_source(&self, source: &ScriptSource) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let lines = source.lines();
        let mut idx = 0;

        while idx < lines.len() {
            match self.parse_segment(source, lines, idx, &mut outcome) {
                Some(next) => idx = next,
                None => break,
            }
        }
        outcome
    }

    /// Parses one segment starting at `start`. Returns the index of the
    /// first line after the segment's closing `end`, or `None` when the
    /// source must be abandoned.
    fn parse_segment(
        &self,
        source: &ScriptSource,
        lines: &[String],
        start: usize,
        outcome: &mut ParseOutcome,
    ) -> Option<usize> {
        let caps = match self.header.captures(&lines[start]) {
            Some(caps) => caps,
            None => {
                outcome.diagnostics.push(
                    Diagnostic::error(format!(
                        "expected header 'type <T> called <N>', found '{}'",
                        lines[start]
                    ))
                    .with_source(source.name()),
                );
                return None;
            }
        };
        let owner = caps[1].to_string();
        let object = caps[2].to_string();
        let key = format!("{}.{}", owner, object);
        debug!(source = source.name(), key = %key, "parsing object segment");

        let mut methods: HashMap<String, Arc<ExecutableUnit>> = HashMap::new();
        let mut pending_method: Option<String> = None;
        let mut in_interop = false;
        let mut body: Vec<String> = Vec::new();

        let mut i = start + 1;
        while i < lines.len() {
            let line = lines[i].as_str();

            if in_interop {
                if line == END_KEYWORD {
                    in_interop = false;
                } else {
                    // Verbatim passthrough, no translation.
                    body.push(line.to_string());
                }
            } else if let Some(name) = method_name(line) {
                if pending_method.is_some() {
                    outcome.diagnostics.push(
                        structural_error(
                            source,
                            &key,
                            format!("'{} {}' opened while a method block is still open", METHOD_KEYWORD, name),
                        ),
                    );
                    return None;
                }
                // The name is the verbatim remainder, left unvalidated.
                pending_method = Some(name.to_string());
            } else if line == INTEROP_START {
                if pending_method.is_none() {
                    outcome.diagnostics.push(structural_error(
                        source,
                        &key,
                        "'interop start' outside a method block".to_string(),
                    ));
                    return None;
                }
                in_interop = true;
            } else if line == END_KEYWORD {
                match pending_method.take() {
                    Some(method) => {
                        let unit = self.finalize_method(source, &owner, &key, &method, &body, outcome);
                        if methods.insert(method.clone(), Arc::new(unit)).is_some() {
                            outcome.diagnostics.push(
                                Diagnostic::warning(format!(
                                    "method '{}' defined more than once; the last definition wins",
                                    method
                                ))
                                .with_source(source.name())
                                .with_object(key.as_str()),
                            );
                        }
                        body.clear();
                    }
                    None => {
                        // Segment closed at depth 0.
                        outcome.objects.push(ObjectEntry::new(owner, object, methods));
                        return Some(i + 1);
                    }
                }
            } else if let Some(stmt) = self.translator.translate(line) {
                body.push(stmt);
            }
            i += 1;
        }

        outcome.diagnostics.push(structural_error(
            source,
            &key,
            "object segment not closed before end of source".to_string(),
        ));
        None
    }

    fn finalize_method(
        &self,
        source: &ScriptSource,
        owner: &str,
        key: &str,
        method: &str,
        body: &[String],
        outcome: &mut ParseOutcome,
    ) -> ExecutableUnit {
        let descriptor = self.registry.lookup(owner, method);
        let unit = ExecutableUnit::compile(self.backend, body.join("\n"), descriptor);
        for diag in unit.diagnostics() {
            outcome.diagnostics.push(
                diag.clone()
                    .with_source(source.name())
                    .with_object(key)
                    .with_method(method),
            );
        }
        unit
    }
}

/// `method <name>` opener; the bare keyword yields an empty name, which the
/// parser accepts like any other.
fn method_name(line: &str) -> Option<&str> {
    if line == METHOD_KEYWORD {
        return Some("");
    }
    line.strip_prefix(METHOD_KEYWORD)
        .and_then(|rest| rest.strip_prefix(' '))
}

fn structural_error(source: &ScriptSource, key: &str, message: String) -> Diagnostic {
    Diagnostic::error(message)
        .with_source(source.name())
        .with_object(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Interpreter;
    use crate::unit::Severity;

    fn parse(text: &str) -> ParseOutcome {
        let translator = Translator::new();
        let registry = ContextRegistry::new();
        let backend = Interpreter::new();
        let parser = BlockParser::new(&translator, &registry, &backend);
        parser.parse_source(&ScriptSource::from_text("test.cns", text))
    }

    #[test]
    fn parses_one_segment_with_one_method() {
        let outcome = parse(
            "type item called testItem1\n\
             method use\n\
             i = i + 1\n\
             end\n\
             end\n",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        assert_eq!(outcome.objects.len(), 1);
        let entry = &outcome.objects[0];
        assert_eq!(entry.key(), "item.testItem1");
        assert_eq!(entry.method_names(), vec!["use"]);
        assert!(entry.method("use").unwrap().is_compiled());
    }

    #[test]
    fn two_consecutive_segments_yield_two_objects() {
        let outcome = parse(
            "type item called a\n\
             method use\n\
             i = 1\n\
             end\n\
             end\n\
             type item called b\n\
             method use\n\
             i = 2\n\
             end\n\
             end\n",
        );
        assert!(outcome.diagnostics.is_empty());
        let keys: Vec<String> = outcome.objects.iter().map(|o| o.key()).collect();
        assert_eq!(keys, vec!["item.a", "item.b"]);
    }

    #[test]
    fn interop_lines_are_kept_verbatim() {
        let outcome = parse(
            "type item called raw\n\
             method use\n\
             i = 1\n\
             interop start\n\
             x = 1\n\
             y = x + 2\n\
             end\n\
             j = 2\n\
             end\n\
             end\n",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let entry = &outcome.objects[0];
        let body = entry.method("use").unwrap().body();
        // Translated lines get terminators appended; interop lines do not.
        assert_eq!(body, "i = 1;\nx = 1\ny = x + 2\nj = 2;");
    }

    #[test]
    fn bad_header_is_fatal_for_the_source() {
        let outcome = parse("item called oops\nmethod use\nend\nend\n");
        assert!(outcome.objects.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
        assert!(outcome.diagnostics[0].message.contains("expected header"));
    }

    #[test]
    fn bad_header_in_second_segment_keeps_the_first_object() {
        let outcome = parse(
            "type item called ok\n\
             method use\n\
             i = 1\n\
             end\n\
             end\n\
             not a header\n",
        );
        assert_eq!(outcome.objects.len(), 1);
        assert_eq!(outcome.objects[0].key(), "item.ok");
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn unterminated_segment_is_dropped() {
        let outcome = parse("type item called open\nmethod use\ni = 1\nend\n");
        assert!(outcome.objects.is_empty());
        assert!(outcome.diagnostics[0]
            .message
            .contains("not closed before end of source"));
    }

    #[test]
    fn compile_diagnostics_are_tagged_with_identity() {
        let outcome = parse(
            "type item called broken\n\
             method use\n\
             this is not ( a statement\n\
             end\n\
             end\n",
        );
        assert_eq!(outcome.objects.len(), 1);
        let entry = &outcome.objects[0];
        assert!(!entry.method("use").unwrap().is_compiled());
        let diag = &outcome.diagnostics[0];
        assert_eq!(diag.source.as_deref(), Some("test.cns"));
        assert_eq!(diag.object.as_deref(), Some("item.broken"));
        assert_eq!(diag.method.as_deref(), Some("use"));
    }

    #[test]
    fn duplicate_method_names_warn_and_last_wins() {
        let outcome = parse(
            "type item called dup\n\
             method use\n\
             i = 1\n\
             end\n\
             method use\n\
             i = 2\n\
             end\n\
             end\n",
        );
        assert_eq!(outcome.objects.len(), 1);
        assert_eq!(outcome.objects[0].method_names(), vec!["use"]);
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("more than once")));
        assert_eq!(
            outcome.objects[0].method("use").unwrap().body(),
            "i = 2;"
        );
    }

    #[test]
    fn method_keyword_inside_interop_is_verbatim() {
        let outcome = parse(
            "type item called tricky\n\
             method use\n\
             interop start\n\
             method not_a_method\n\
             end\n\
             end\n\
             end\n",
        );
        // The line is body text, not a structural keyword; the segment
        // still closes cleanly even though the body itself will not compile.
        assert_eq!(outcome.objects.len(), 1);
        let body = outcome.objects[0].method("use").unwrap().body();
        assert_eq!(body, "method not_a_method");
    }
}
