// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission node model: a tagged variant per node type.
//!
//! The discriminant lives in the `"type"` field of the serialized node.
//! Unknown node types are captured verbatim by the `Unknown` variant so
//! they survive load/save cycles untouched; the executor registry reports
//! them as `NO_EXECUTOR` at run time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Canvas coordinates for the mission editor. Opaque to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A single node in a mission graph.
///
/// `label` is unique within a mission and is the addressing key used by
/// the expression resolver (`{{$nodes.<Label>.output…}}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub kind: NodePayload,
}

impl MissionNode {
    /// The serialized `type` discriminant for this node.
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn family(&self) -> NodeFamily {
        self.kind.family()
    }

    pub fn is_trigger(&self) -> bool {
        self.family() == NodeFamily::Trigger
    }

    pub fn is_output(&self) -> bool {
        self.family() == NodeFamily::Output
    }

    /// The typed kind, when this build recognizes the node type.
    pub fn known_kind(&self) -> Option<&NodeKind> {
        match &self.kind {
            NodePayload::Known(kind) => Some(kind),
            NodePayload::Unknown(_) => None,
        }
    }

    pub fn known_kind_mut(&mut self) -> Option<&mut NodeKind> {
        match &mut self.kind {
            NodePayload::Known(kind) => Some(kind),
            NodePayload::Unknown(_) => None,
        }
    }

    /// Channel name for output nodes (`telegram-output` → `telegram`).
    pub fn output_channel(&self) -> Option<&'static str> {
        self.known_kind().and_then(NodeKind::output_channel)
    }
}

/// Either a node type this build understands, or a verbatim payload for
/// one it does not. Deserialization tries the tagged form first, then
/// captures the whole map so unknown types survive load/save cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodePayload {
    Known(NodeKind),
    /// Preserved untouched, including the `type` field.
    Unknown(Value),
}

impl NodePayload {
    pub fn type_name(&self) -> &str {
        match self {
            NodePayload::Known(kind) => kind.type_name(),
            NodePayload::Unknown(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }

    pub fn family(&self) -> NodeFamily {
        match self {
            NodePayload::Known(kind) => kind.family(),
            NodePayload::Unknown(_) => NodeFamily::Unknown,
        }
    }
}

impl From<NodeKind> for NodePayload {
    fn from(kind: NodeKind) -> Self {
        NodePayload::Known(kind)
    }
}

/// The six node families plus a bucket for unrecognized types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFamily {
    Trigger,
    Data,
    Ai,
    Logic,
    Transform,
    Output,
    Utility,
    Unknown,
}

impl fmt::Display for NodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeFamily::Trigger => "trigger",
            NodeFamily::Data => "data",
            NodeFamily::Ai => "ai",
            NodeFamily::Logic => "logic",
            NodeFamily::Transform => "transform",
            NodeFamily::Output => "output",
            NodeFamily::Utility => "utility",
            NodeFamily::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Schedule trigger cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    Once,
    #[default]
    Daily,
    Weekly,
    Interval,
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleMode::Once => "once",
            ScheduleMode::Daily => "daily",
            ScheduleMode::Weekly => "weekly",
            ScheduleMode::Interval => "interval",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTriggerConfig {
    #[serde(default)]
    pub mode: ScheduleMode,
    /// Local time of day, `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Lowercased short weekday names for weekly mode (`mon`…`sun`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<u32>,
}

/// Config for node types whose fields belong to a leaf executor.
///
/// The engine stores these verbatim and never interprets them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassthroughConfig {
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchConfig {
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RssFeedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub rest: Map<String, Value>,
}

/// Shared config for the five AI node types. Fields irrelevant to a given
/// kind default to empty and are omitted from the serialized form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiNodeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Candidate labels for `ai-classify`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Field names for `ai-extract`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub rest: Map<String, Value>,
}

/// Comparison operator for condition and filter rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOp {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRule {
    #[serde(default)]
    pub left: String,
    #[serde(default)]
    pub op: ConditionOp,
    #[serde(default)]
    pub right: String,
}

/// How multiple condition rules combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    #[serde(default)]
    pub rules: Vec<ConditionRule>,
    #[serde(default)]
    pub combine: CombineMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchCase {
    #[serde(default)]
    pub value: String,
    /// Port name for this case; defaults to `case_<index>` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchConfig {
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub cases: Vec<SwitchCase>,
    /// Port taken when no case matches. Defaults to `default`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_port: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitConfig {
    /// Dot path into upstream `data` locating the array to split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitConfig {
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariablesConfig {
    /// Name → template; values are resolved before assignment.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatConfig {
    #[serde(default)]
    pub template: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub op: ConditionOp,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Shared config for the six output node types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    /// Subject line for `email-output`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Target URL for `webhook-output`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Message template; upstream text is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub rest: Map<String, Value>,
}

/// The node type discriminant and its per-kind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    // Triggers
    ScheduleTrigger(ScheduleTriggerConfig),
    WebhookTrigger(PassthroughConfig),
    ManualTrigger(PassthroughConfig),
    EventTrigger(PassthroughConfig),
    // Data
    HttpRequest(HttpRequestConfig),
    WebSearch(WebSearchConfig),
    RssFeed(RssFeedConfig),
    Coinbase(PassthroughConfig),
    FileRead(PassthroughConfig),
    FormInput(PassthroughConfig),
    // AI
    AiSummarize(AiNodeConfig),
    AiClassify(AiNodeConfig),
    AiExtract(AiNodeConfig),
    AiGenerate(AiNodeConfig),
    AiChat(AiNodeConfig),
    // Logic
    Condition(ConditionConfig),
    Switch(SwitchConfig),
    Loop(PassthroughConfig),
    Merge(PassthroughConfig),
    Split(SplitConfig),
    Wait(WaitConfig),
    // Transform
    SetVariables(SetVariablesConfig),
    Code(PassthroughConfig),
    Format(FormatConfig),
    Filter(FilterConfig),
    Sort(SortConfig),
    Dedupe(DedupeConfig),
    // Output
    TelegramOutput(OutputConfig),
    DiscordOutput(OutputConfig),
    EmailOutput(OutputConfig),
    WebhookOutput(OutputConfig),
    SlackOutput(OutputConfig),
    NovachatOutput(OutputConfig),
    // Utility
    StickyNote(PassthroughConfig),
    SubWorkflow(PassthroughConfig),
}

impl NodeKind {
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::ScheduleTrigger(_) => "schedule-trigger",
            NodeKind::WebhookTrigger(_) => "webhook-trigger",
            NodeKind::ManualTrigger(_) => "manual-trigger",
            NodeKind::EventTrigger(_) => "event-trigger",
            NodeKind::HttpRequest(_) => "http-request",
            NodeKind::WebSearch(_) => "web-search",
            NodeKind::RssFeed(_) => "rss-feed",
            NodeKind::Coinbase(_) => "coinbase",
            NodeKind::FileRead(_) => "file-read",
            NodeKind::FormInput(_) => "form-input",
            NodeKind::AiSummarize(_) => "ai-summarize",
            NodeKind::AiClassify(_) => "ai-classify",
            NodeKind::AiExtract(_) => "ai-extract",
            NodeKind::AiGenerate(_) => "ai-generate",
            NodeKind::AiChat(_) => "ai-chat",
            NodeKind::Condition(_) => "condition",
            NodeKind::Switch(_) => "switch",
            NodeKind::Loop(_) => "loop",
            NodeKind::Merge(_) => "merge",
            NodeKind::Split(_) => "split",
            NodeKind::Wait(_) => "wait",
            NodeKind::SetVariables(_) => "set-variables",
            NodeKind::Code(_) => "code",
            NodeKind::Format(_) => "format",
            NodeKind::Filter(_) => "filter",
            NodeKind::Sort(_) => "sort",
            NodeKind::Dedupe(_) => "dedupe",
            NodeKind::TelegramOutput(_) => "telegram-output",
            NodeKind::DiscordOutput(_) => "discord-output",
            NodeKind::EmailOutput(_) => "email-output",
            NodeKind::WebhookOutput(_) => "webhook-output",
            NodeKind::SlackOutput(_) => "slack-output",
            NodeKind::NovachatOutput(_) => "novachat-output",
            NodeKind::StickyNote(_) => "sticky-note",
            NodeKind::SubWorkflow(_) => "sub-workflow",
        }
    }

    pub fn family(&self) -> NodeFamily {
        match self {
            NodeKind::ScheduleTrigger(_)
            | NodeKind::WebhookTrigger(_)
            | NodeKind::ManualTrigger(_)
            | NodeKind::EventTrigger(_) => NodeFamily::Trigger,
            NodeKind::HttpRequest(_)
            | NodeKind::WebSearch(_)
            | NodeKind::RssFeed(_)
            | NodeKind::Coinbase(_)
            | NodeKind::FileRead(_)
            | NodeKind::FormInput(_) => NodeFamily::Data,
            NodeKind::AiSummarize(_)
            | NodeKind::AiClassify(_)
            | NodeKind::AiExtract(_)
            | NodeKind::AiGenerate(_)
            | NodeKind::AiChat(_) => NodeFamily::Ai,
            NodeKind::Condition(_)
            | NodeKind::Switch(_)
            | NodeKind::Loop(_)
            | NodeKind::Merge(_)
            | NodeKind::Split(_)
            | NodeKind::Wait(_) => NodeFamily::Logic,
            NodeKind::SetVariables(_)
            | NodeKind::Code(_)
            | NodeKind::Format(_)
            | NodeKind::Filter(_)
            | NodeKind::Sort(_)
            | NodeKind::Dedupe(_) => NodeFamily::Transform,
            NodeKind::TelegramOutput(_)
            | NodeKind::DiscordOutput(_)
            | NodeKind::EmailOutput(_)
            | NodeKind::WebhookOutput(_)
            | NodeKind::SlackOutput(_)
            | NodeKind::NovachatOutput(_) => NodeFamily::Output,
            NodeKind::StickyNote(_) | NodeKind::SubWorkflow(_) => NodeFamily::Utility,
        }
    }

    /// Channel name for output nodes (`telegram-output` → `telegram`).
    pub fn output_channel(&self) -> Option<&'static str> {
        match self {
            NodeKind::TelegramOutput(_) => Some("telegram"),
            NodeKind::DiscordOutput(_) => Some("discord"),
            NodeKind::EmailOutput(_) => Some("email"),
            NodeKind::WebhookOutput(_) => Some("webhook"),
            NodeKind::SlackOutput(_) => Some("slack"),
            NodeKind::NovachatOutput(_) => Some("novachat"),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
