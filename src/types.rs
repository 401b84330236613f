//! Core types and constants for the demo-block compiler

use serde::{Deserialize, Serialize};
use std::fmt;

// Document / module naming
pub const DOCUMENT_EXTENSION: &str = ".md";
pub const COMPONENT_EXTENSION: &str = ".vue";
pub const VIRTUAL_NAMESPACE: &str = "virtual:component-demo/";
pub const REFERENCE_PREFIX: &str = "Oar";
pub const INLINE_PREFIX: &str = "demo-component-";
pub const REFERENCE_COMPONENT_PREFIX: &str = "VirtualComponentDemo";
pub const INLINE_LOCAL_PREFIX: &str = "component";

// Host framework
pub const FRAMEWORK_MODULE: &str = "vue";
pub const DEFINE_COMPONENT_BINDING: &str = "defineComponent as _defineComponent";
pub const DEMO_BLOCK_IMPORT: &str = "@VueMarkdown/demo-block/index.vue";
pub const WRAPPER_CLASS: &str = "markdown-body";
pub const SCRIPT_LANG: &str = "ts";

// Container names
pub const DEMO_CONTAINER: &str = "demo";
pub const DETAILS_CONTAINER: &str = "details";

// Sentinels delimiting generated display metadata. Never valid in user content.
pub const SENTINEL_START: &str = "<remove-code-start>";
pub const SENTINEL_END: &str = "<remove-code-end>";

pub const MIN_CONTAINER_MARKER: usize = 3;

/// How demo snippets are turned into renderable units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoMode {
    /// Each snippet becomes its own virtual module, served through `load`
    Reference,
    /// Each snippet is compiled and spliced into the document's own script
    Inline,
}

impl Default for DemoMode {
    fn default() -> Self {
        DemoMode::Reference
    }
}

impl fmt::Display for DemoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoMode::Reference => write!(f, "reference"),
            DemoMode::Inline => write!(f, "inline"),
        }
    }
}

/// One recognised `::: demo` region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoBlock {
    /// Inner text exactly as authored
    pub raw: String,
    /// Inner text guaranteed to carry a root `<template>` block
    pub normalized: String,
    /// 1-based document line of the snippet's first line
    pub line: usize,
}

/// Identity assigned to a compiled snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    pub index: usize,
    pub identifier: String,
    pub local_name: String,
}

/// Per-document transform statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformStats {
    /// Source size in bytes
    pub source_size: u64,

    /// Generated SFC size in bytes
    pub output_size: u64,

    /// Demo blocks encountered
    pub demo_count: usize,

    /// Demo blocks that compiled into a component
    pub compiled_count: usize,

    /// Demo blocks passed through verbatim (no template content)
    pub passthrough_count: usize,

    /// Details blocks encountered
    pub details_count: usize,

    /// Containers closed implicitly at end of document
    pub unclosed_count: usize,

    /// Transform time in milliseconds
    pub transform_time_ms: u64,
}

/// Escape text for use inside a double-quoted HTML attribute
pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attribute() {
        assert_eq!(escape_attribute("plain"), "plain");
        assert_eq!(
            escape_attribute(r#"<a href="x">&</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_demo_mode_serde() {
        let mode: DemoMode = serde_json::from_str("\"inline\"").unwrap();
        assert_eq!(mode, DemoMode::Inline);
        assert_eq!(DemoMode::default().to_string(), "reference");
    }
}
