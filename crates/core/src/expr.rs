// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression resolver for `{{ … }}` templates.
//!
//! Two path roots are recognized: `$vars.<name>` reads the run's variable
//! map (absent names resolve to the empty string), and
//! `$nodes.<Label>.output[.<field>…]` reads a prior node's output by its
//! unique label. Any token that does not resolve is left intact.

use crate::context::NodeOutput;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for `{{ path }}` tokens.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("constant regex pattern is valid")
});

/// Property names rejected during dot-path walks. These never address
/// user data and historically enabled prototype-pollution lookups.
const FORBIDDEN_SEGMENTS: &[&str] = &["__proto__", "prototype", "constructor"];

/// Read-only view of the run state a template resolves against.
pub struct ResolveEnv<'a> {
    pub variables: &'a HashMap<String, String>,
    /// Node outputs keyed by node id.
    pub outputs_by_id: &'a HashMap<String, NodeOutput>,
    /// Label → node id. Labels are the only addressing surface.
    pub ids_by_label: &'a HashMap<String, String>,
}

/// Substitute every resolvable `{{ … }}` token in `template`.
pub fn resolve(template: &str, env: &ResolveEnv) -> String {
    TOKEN_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            let path = &caps[1];
            match resolve_path(path, env) {
                Some(value) => value,
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

fn resolve_path(path: &str, env: &ResolveEnv) -> Option<String> {
    if let Some(name) = path.strip_prefix("$vars.") {
        // Absent variables resolve to the empty string by contract.
        return Some(env.variables.get(name).cloned().unwrap_or_default());
    }

    let rest = path.strip_prefix("$nodes.")?;
    let mut segments = rest.split('.');
    let label = segments.next()?;
    let section = segments.next().unwrap_or("output");
    if section != "output" {
        return None;
    }
    let fields: Vec<&str> = segments.collect();

    let id = env.ids_by_label.get(label)?;
    let output = env.outputs_by_id.get(id)?;

    match fields.as_slice() {
        [] | ["text"] => Some(output.text.clone().unwrap_or_default()),
        ["data"] => match &output.data {
            Some(data) => Some(data.to_string()),
            None => Some(output.text.clone().unwrap_or_default()),
        },
        path_fields => walk_data(output.data.as_ref()?, path_fields),
    }
}

/// Walk a dot path through structured output data.
fn walk_data(data: &Value, fields: &[&str]) -> Option<String> {
    let mut current = data;
    for field in fields {
        if FORBIDDEN_SEGMENTS.contains(field) {
            return None;
        }
        current = current.as_object()?.get(*field)?;
    }
    Some(match current {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod tests;
