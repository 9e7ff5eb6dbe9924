// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

struct Fixture {
    variables: HashMap<String, String>,
    outputs_by_id: HashMap<String, NodeOutput>,
    ids_by_label: HashMap<String, String>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            variables: HashMap::new(),
            outputs_by_id: HashMap::new(),
            ids_by_label: HashMap::new(),
        }
    }

    fn var(mut self, name: &str, value: &str) -> Self {
        self.variables.insert(name.to_string(), value.to_string());
        self
    }

    fn output(mut self, label: &str, id: &str, output: NodeOutput) -> Self {
        self.ids_by_label.insert(label.to_string(), id.to_string());
        self.outputs_by_id.insert(id.to_string(), output);
        self
    }

    fn resolve(&self, template: &str) -> String {
        let env = ResolveEnv {
            variables: &self.variables,
            outputs_by_id: &self.outputs_by_id,
            ids_by_label: &self.ids_by_label,
        };
        resolve(template, &env)
    }
}

#[test]
fn vars_substitute() {
    let fx = Fixture::new().var("city", "Lisbon");
    assert_eq!(fx.resolve("Weather in {{$vars.city}}"), "Weather in Lisbon");
}

#[test]
fn absent_var_resolves_to_empty_string() {
    let fx = Fixture::new();
    assert_eq!(fx.resolve("[{{$vars.missing}}]"), "[]");
}

#[test]
fn node_output_text_substitutes_exactly() {
    let fx = Fixture::new().output("Fetch", "n1", NodeOutput::ok_text("A"));
    assert_eq!(fx.resolve("{{$nodes.Fetch.output.text}}"), "A");
    assert_eq!(fx.resolve("{{$nodes.Fetch.output}}"), "A");
}

#[test]
fn node_data_stringifies_json() {
    let fx = Fixture::new().output(
        "Fetch",
        "n1",
        NodeOutput::ok_data("t", json!({"price": 42})),
    );
    assert_eq!(fx.resolve("{{$nodes.Fetch.output.data}}"), r#"{"price":42}"#);
}

#[test]
fn node_data_falls_back_to_text_when_absent() {
    let fx = Fixture::new().output("Fetch", "n1", NodeOutput::ok_text("plain"));
    assert_eq!(fx.resolve("{{$nodes.Fetch.output.data}}"), "plain");
}

#[test]
fn dot_path_walks_object_data() {
    let fx = Fixture::new().output(
        "Fetch",
        "n1",
        NodeOutput::ok_data("t", json!({"quote": {"usd": "67000", "vol": 3}})),
    );
    assert_eq!(fx.resolve("{{$nodes.Fetch.output.quote.usd}}"), "67000");
    assert_eq!(fx.resolve("{{$nodes.Fetch.output.quote.vol}}"), "3");
}

#[test]
fn unresolved_tokens_are_left_intact() {
    let fx = Fixture::new().output("Fetch", "n1", NodeOutput::ok_text("A"));
    assert_eq!(
        fx.resolve("{{$nodes.Missing.output.text}}"),
        "{{$nodes.Missing.output.text}}"
    );
    assert_eq!(
        fx.resolve("{{$nodes.Fetch.output.absent.field}}"),
        "{{$nodes.Fetch.output.absent.field}}"
    );
    assert_eq!(fx.resolve("{{not.a.known.root}}"), "{{not.a.known.root}}");
}

#[test]
fn forbidden_segments_do_not_resolve() {
    let fx = Fixture::new().output(
        "Fetch",
        "n1",
        NodeOutput::ok_data("t", json!({"__proto__": {"x": "pwn"}})),
    );
    assert_eq!(
        fx.resolve("{{$nodes.Fetch.output.__proto__.x}}"),
        "{{$nodes.Fetch.output.__proto__.x}}"
    );
    assert_eq!(
        fx.resolve("{{$nodes.Fetch.output.constructor}}"),
        "{{$nodes.Fetch.output.constructor}}"
    );
}

#[test]
fn non_output_sections_do_not_resolve() {
    let fx = Fixture::new().output("Fetch", "n1", NodeOutput::ok_text("A"));
    assert_eq!(
        fx.resolve("{{$nodes.Fetch.input.text}}"),
        "{{$nodes.Fetch.input.text}}"
    );
}

#[test]
fn multiple_tokens_resolve_in_one_pass() {
    let fx = Fixture::new()
        .var("name", "Nova")
        .output("Fetch", "n1", NodeOutput::ok_text("headline"));
    assert_eq!(
        fx.resolve("{{$vars.name}}: {{$nodes.Fetch.output.text}}"),
        "Nova: headline"
    );
}

#[test]
fn whitespace_inside_token_is_tolerated() {
    let fx = Fixture::new().var("x", "1");
    assert_eq!(fx.resolve("{{ $vars.x }}"), "1");
}
