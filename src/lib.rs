//! Markdown Demo-Block Compiler
//!
//! Turns documentation pages written in markdown into single-file components
//! in which every `::: demo` region becomes a live, interactive demo next to
//! its own source code.
//!
//! # Features
//!
//! - `::: demo` and `::: details` containers, nestable with longer colon fences
//! - Reference mode: each snippet becomes a virtual module served by the plugin
//! - Inline mode: each snippet is compiled straight into the page's script
//! - Build-tool hooks (`resolve_id`, `load`, `transform`, `handle_hot_update`)
//! - In-process dev server with digest-based reload suppression
//!
//! # Basic Usage
//!
//! ```rust
//! use demoblock::{transform_document, PluginOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let output = transform_document(
//!         "# Button\n\n::: demo\n<button>Hi</button>\n:::\n",
//!         "button.md",
//!         PluginOptions::default(),
//!     )?;
//!     assert!(output.code.contains("<VirtualComponentDemoOar0 />"));
//!     assert_eq!(output.components.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! # Transform Pipeline
//!
//! 1. **Tokenize**: split the page into prose and `:::` container tokens
//! 2. **Extract**: collect the raw text of each demo container
//! 3. **Normalize**: wrap bare markup in a `<template>` root
//! 4. **Compile**: register the snippet (reference) or compile it (inline)
//! 5. **Assemble**: emit placeholders, strip sentinel spans, wrap the page

pub mod types;
pub mod error;
pub mod markup;
pub mod extractor;
pub mod normalizer;
pub mod sfc;
pub mod compiler;
pub mod scaffold;
pub mod session;
pub mod demo;
pub mod assembler;
pub mod plugin;
pub mod dev_server;
pub mod cli;

use serde::{Deserialize, Serialize};
use std::path::Path;

// Re-export commonly used types and functions
pub use error::{CompilerError, Result};
pub use types::*;
pub use markup::{BlockTokenizer, ContainerRule, MarkupRenderer, Token, TokenKind};
pub use extractor::extract_block_content;
pub use normalizer::normalize_snippet;
pub use sfc::{SfcBlock, SfcDescriptor};
pub use compiler::{ComponentCompiler, StaticComponentCompiler};
pub use session::{CompilerSession, ComponentRegistry, DocumentScope, ImportAggregate};
pub use demo::{DemoCompiler, DemoOutput, InlineCompiler, ReferenceCompiler};
pub use assembler::{AssembledDocument, DocumentAssembler};
pub use plugin::{HmrContext, HostServer, MarkdownDemoPlugin, ModuleNode, TransformResult};
pub use dev_server::{DevServer, ModuleGraph};
pub use cli::DemoCli;

/// Compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Plugin options and naming conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginOptions {
    /// How demo snippets are compiled
    pub mode: DemoMode,

    /// Extension of documents the plugin transforms
    pub document_extension: String,

    /// Prefix of synthetic module ids served by `load`
    pub virtual_namespace: String,

    /// Extension of synthetic component modules
    pub component_extension: String,

    /// Identifier prefix in reference mode
    pub reference_prefix: String,

    /// Identifier prefix in inline mode
    pub inline_prefix: String,

    /// Module path of the display wrapper component
    pub demo_block_import: String,

    /// Module providing the framework's core exports
    pub framework_module: String,

    /// Class of the element wrapping the rendered page
    pub wrapper_class: String,

    /// `lang` attribute of the generated script block
    pub script_lang: String,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            mode: DemoMode::default(),
            document_extension: DOCUMENT_EXTENSION.to_string(),
            virtual_namespace: VIRTUAL_NAMESPACE.to_string(),
            component_extension: COMPONENT_EXTENSION.to_string(),
            reference_prefix: REFERENCE_PREFIX.to_string(),
            inline_prefix: INLINE_PREFIX.to_string(),
            demo_block_import: DEMO_BLOCK_IMPORT.to_string(),
            framework_module: FRAMEWORK_MODULE.to_string(),
            wrapper_class: WRAPPER_CLASS.to_string(),
            script_lang: SCRIPT_LANG.to_string(),
        }
    }
}

/// A transformed document together with the components it references
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub code: String,
    /// `(synthetic module id, source)` for every registered snippet
    pub components: Vec<(String, String)>,
    pub stats: TransformStats,
}

/// Transform one document in a fresh session
pub fn transform_document(source: &str, document: &str, options: PluginOptions) -> Result<TransformOutput> {
    let mut plugin = MarkdownDemoPlugin::new(options);
    let id = forced_document_id(document, plugin.options());
    let result = plugin
        .transform(source, &id)?
        .ok_or_else(|| CompilerError::invalid_format(format!("{} is not a document", document)))?;

    let components = plugin
        .session()
        .registry()
        .iter()
        .map(|(identifier, source)| (plugin.virtual_id(identifier), source.to_string()))
        .collect();

    Ok(TransformOutput {
        code: result.code,
        components,
        stats: result.stats,
    })
}

fn forced_document_id(document: &str, options: &PluginOptions) -> String {
    if document.ends_with(&options.document_extension) {
        document.to_string()
    } else {
        format!("{}{}", document, options.document_extension)
    }
}

/// Transform a document on disk, writing `<stem>.vue` (and any virtual
/// components) into `output_dir`
pub fn transform_file(input_path: &str, output_dir: &str, options: PluginOptions) -> Result<TransformStats> {
    let path = Path::new(input_path);
    log::info!("{} v{}: transforming '{}' into '{}'", NAME, VERSION, input_path, output_dir);

    let mut server = DevServer::new(MarkdownDemoPlugin::new(options), output_dir);
    server.load_document(path)?.ok_or_else(|| {
        CompilerError::invalid_format(format!("{} is not a markdown document", input_path))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_transform_document_reference() {
        let output = transform_document(
            "::: demo\n<button>A</button>\n:::\n\n::: demo\n<button>A</button>\n:::\n",
            "twice.md",
            PluginOptions::default(),
        )
        .unwrap();

        assert_eq!(
            output.components,
            vec![
                (
                    "virtual:component-demo/Oar0.vue".to_string(),
                    "<template><button>A</button></template>".to_string()
                ),
                (
                    "virtual:component-demo/Oar1.vue".to_string(),
                    "<template><button>A</button></template>".to_string()
                ),
            ]
        );
        assert_eq!(output.stats.compiled_count, 2);
    }

    #[test]
    fn test_shared_symbol_imported_once() {
        let options = PluginOptions {
            mode: DemoMode::Inline,
            ..Default::default()
        };
        let source = "::: demo\n<script setup>\nimport { ref } from 'vue'\nconst a = ref(1)\n</script>\n<template>\n<p>a</p>\n</template>\n:::\n\n::: demo\n<script setup>\nimport { ref, computed } from 'vue'\nconst b = computed(() => ref(2))\n</script>\n<template>\n<p>b</p>\n</template>\n:::\n";
        let output = transform_document(source, "shared", options).unwrap();

        let script = output.code.split("<script setup lang='ts'>").nth(1).unwrap();
        let import_lines: Vec<&str> = script.lines().filter(|l| l.contains("from 'vue'")).collect();
        assert_eq!(import_lines.len(), 1);
        assert_eq!(import_lines[0].matches("ref").count(), 1);
        assert!(import_lines[0].contains("computed"));
        assert!(output.code.contains("const component0 = _defineComponent({"));
        assert!(output.code.contains("const component1 = _defineComponent({"));
        assert!(output.components.is_empty());
    }

    #[test]
    fn test_custom_options() {
        let options = PluginOptions {
            wrapper_class: "doc".to_string(),
            script_lang: "js".to_string(),
            demo_block_import: "@/components/DemoBlock.vue".to_string(),
            reference_prefix: "Demo".to_string(),
            virtual_namespace: "virtual:demo/".to_string(),
            ..Default::default()
        };
        let output = transform_document("::: demo\n<i>x</i>\n:::\n", "custom.md", options).unwrap();

        assert!(output.code.contains("<div class='doc'>"));
        assert!(output.code.contains("<script setup lang='js'>"));
        assert!(output.code.contains("import DemoBlock from '@/components/DemoBlock.vue'"));
        assert!(output.code.contains("import VirtualComponentDemoDemo0 from 'virtual:demo/Demo0.vue'"));
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: PluginOptions = serde_json::from_str(r#"{ "mode": "inline", "wrapper_class": "x" }"#).unwrap();
        assert_eq!(options.mode, DemoMode::Inline);
        assert_eq!(options.wrapper_class, "x");
        assert_eq!(options.virtual_namespace, VIRTUAL_NAMESPACE);
    }

    #[test]
    fn test_transform_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("guide.md");
        fs::write(&input, "Guide\n\n::: demo\n<button>Go</button>\n:::\n").unwrap();
        let out = temp_dir.path().join("dist");

        let stats = transform_file(input.to_str().unwrap(), out.to_str().unwrap(), PluginOptions::default()).unwrap();

        assert_eq!(stats.demo_count, 1);
        assert!(stats.output_size > stats.source_size);
        assert!(out.join("guide.vue").exists());
        assert!(out.join("__virtual__").join("Oar0.vue").exists());
    }

    #[test]
    fn test_transform_file_rejects_other_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("notes.txt");
        fs::write(&input, "hello").unwrap();

        let result = transform_file(input.to_str().unwrap(), temp_dir.path().to_str().unwrap(), PluginOptions::default());
        assert!(matches!(result, Err(CompilerError::InvalidFormat { .. })));
    }
}
