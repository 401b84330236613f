//! Component compiler seam and the built-in static-markup compiler
//!
//! A [`ComponentCompiler`] prints standalone module text in the shape the
//! host framework's SFC compiler produces: framework imports as single-line
//! `import { a as _a } from 'vue'` statements, a `render` function export for
//! templates, and a `defineComponent` default export for scripts.

use crate::error::{CompilerError, Result};
use crate::sfc::SfcDescriptor;
use crate::types::DEFINE_COMPONENT_BINDING;
use std::collections::HashSet;

pub trait ComponentCompiler {
    /// Compile template markup into a module exporting `render`
    fn compile_template(&self, id: &str, filename: &str, source: &str) -> Result<String>;

    /// Compile the script blocks into a module whose default export is the
    /// component, with the template inlined as the setup render function
    fn compile_script(&self, id: &str, descriptor: &SfcDescriptor) -> Result<String>;
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Renders templates as hoisted static vnodes.
///
/// Interpolations and directives are emitted as literal markup; plug in the
/// framework's own compiler for reactive demos.
#[derive(Debug, Clone)]
pub struct StaticComponentCompiler {
    framework_module: String,
}

impl StaticComponentCompiler {
    pub fn new(framework_module: &str) -> Self {
        Self {
            framework_module: framework_module.to_string(),
        }
    }

    fn static_vnode(&self, id: &str, markup: &str) -> Result<String> {
        if markup.contains("{{") || markup.contains(" v-") || markup.contains(" :") || markup.contains(" @") {
            log::warn!("Demo {} uses dynamic template syntax; rendering it as static markup", id);
        }
        let literal = serde_json::to_string(markup.trim())
            .map_err(|e| CompilerError::compile(id, format!("Cannot encode template: {}", e)))?;
        Ok(format!(
            "/*#__PURE__*/_createStaticVNode({}, {})",
            literal,
            count_root_nodes(markup)
        ))
    }

    fn framework_import(&self, binding: &str) -> String {
        format!("import {{ {} }} from '{}'", binding, self.framework_module)
    }
}

impl Default for StaticComponentCompiler {
    fn default() -> Self {
        Self::new(crate::types::FRAMEWORK_MODULE)
    }
}

impl ComponentCompiler for StaticComponentCompiler {
    fn compile_template(&self, id: &str, filename: &str, source: &str) -> Result<String> {
        log::debug!("Compiling template for {} ({})", id, filename);
        let vnode = self.static_vnode(id, source)?;
        Ok(format!(
            "{}\n\nconst _hoisted_1 = {}\n\nexport function render(_ctx, _cache) {{\n  return _hoisted_1\n}}",
            self.framework_import("createStaticVNode as _createStaticVNode"),
            vnode
        ))
    }

    fn compile_script(&self, id: &str, descriptor: &SfcDescriptor) -> Result<String> {
        let template = descriptor.template_content().unwrap_or_default();
        let vnode = self.static_vnode(id, template)?;

        let mut imports = vec![
            self.framework_import(DEFINE_COMPONENT_BINDING),
            self.framework_import("createStaticVNode as _createStaticVNode"),
        ];
        let mut members = vec![format!("  __name: '{}',", id)];

        if let Some(script) = &descriptor.script {
            let (script_imports, body) = split_imports(&script.content);
            imports.extend(script_imports);
            let (before, object) = body.split_once("export default").ok_or_else(|| {
                CompilerError::compile(id, "<script> block has no default export")
            })?;
            members.push(format!(
                "  ...(function () {{\n{}\nreturn {}\n}})(),",
                before.trim(),
                object.trim().trim_end_matches(';')
            ));
        }

        match &descriptor.script_setup {
            Some(setup) => {
                let (setup_imports, body) = split_imports(&setup.content);
                imports.extend(setup_imports);
                members.push(format!(
                    "  setup(__props) {{\n{}\nreturn (_ctx, _cache) => {{\n  return {}\n}}\n}}",
                    body.trim(),
                    vnode
                ));
            }
            None => {
                members.push(format!("  render(_ctx, _cache) {{\n    return {}\n  }}", vnode));
            }
        }

        let mut seen = HashSet::new();
        imports.retain(|import| seen.insert(import.clone()));
        Ok(format!(
            "{}\n\nexport default /*@__PURE__*/_defineComponent({{\n{}\n\n}})",
            imports.join("\n"),
            members.join("\n")
        ))
    }
}

/// Separate top-level import statements (collapsed to one line each) from the rest of a script
pub fn split_imports(script: &str) -> (Vec<String>, String) {
    let mut imports = Vec::new();
    let mut body = Vec::new();
    let mut pending: Option<String> = None;

    for line in script.lines() {
        if let Some(mut statement) = pending.take() {
            statement.push(' ');
            statement.push_str(line.trim());
            if is_complete_import(&statement) {
                imports.push(collapse_whitespace(&statement));
            } else {
                pending = Some(statement);
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.starts_with("import ") || trimmed.starts_with("import{") {
            if is_complete_import(trimmed) {
                imports.push(collapse_whitespace(trimmed));
            } else {
                pending = Some(trimmed.to_string());
            }
        } else {
            body.push(line.to_string());
        }
    }

    // Unterminated import: leave it where the author put it
    if let Some(statement) = pending {
        body.push(statement);
    }

    (imports, body.join("\n"))
}

fn is_complete_import(statement: &str) -> bool {
    let trimmed = statement.trim_end().trim_end_matches(';');
    (trimmed.ends_with('\'') || trimmed.ends_with('"')) && (trimmed.contains(" from ") || !trimmed.contains('{'))
}

fn collapse_whitespace(statement: &str) -> String {
    statement.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of top-level nodes in an HTML fragment (at least one)
pub fn count_root_nodes(markup: &str) -> usize {
    let mut count = 0;
    let mut depth = 0usize;
    let mut in_text = false;
    let mut rest = markup;

    while let Some(ch) = rest.chars().next() {
        if ch != '<' {
            if depth == 0 && !in_text && !ch.is_whitespace() {
                count += 1;
                in_text = true;
            }
            rest = &rest[ch.len_utf8()..];
            continue;
        }
        in_text = false;

        if let Some(comment) = rest.strip_prefix("<!--") {
            if depth == 0 {
                count += 1;
            }
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        let end = tag_end(rest);
        let tag = &rest[1..end];
        rest = if end < rest.len() { &rest[end + 1..] } else { "" };

        if tag.starts_with('/') {
            depth = depth.saturating_sub(1);
            continue;
        }
        if depth == 0 {
            count += 1;
        }
        let name: String = tag
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect::<String>()
            .to_ascii_lowercase();
        let self_closing = tag.trim_end().ends_with('/');
        if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
            depth += 1;
        }
    }

    count.max(1)
}

/// Index of the `>` closing the tag at the start of `text`, skipping quoted attribute values
fn tag_end(text: &str) -> usize {
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '>' => return i,
            None => {}
        }
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(source: &str) -> SfcDescriptor {
        SfcDescriptor::parse(source, "demo.vue").unwrap()
    }

    #[test]
    fn test_count_root_nodes() {
        assert_eq!(count_root_nodes("<button>Hi</button>"), 1);
        assert_eq!(count_root_nodes("<p>a</p>\n<p>b</p>"), 2);
        assert_eq!(count_root_nodes("<div><span>x</span><br></div>text"), 2);
        assert_eq!(count_root_nodes("<img src=\"a>b\"><input/><!-- c -->"), 3);
        assert_eq!(count_root_nodes("   "), 1);
    }

    #[test]
    fn test_template_module_shape() {
        let compiler = StaticComponentCompiler::default();
        let code = compiler
            .compile_template("demo-component-0", "demo-component-0.vue", "<button>Hi</button>")
            .unwrap();

        assert!(code.starts_with("import { createStaticVNode as _createStaticVNode } from 'vue'"));
        assert!(code.contains(r#"_createStaticVNode("<button>Hi</button>", 1)"#));
        assert!(code.contains("export function render(_ctx, _cache) {"));
    }

    #[test]
    fn test_script_setup_module_shape() {
        let compiler = StaticComponentCompiler::default();
        let desc = descriptor(
            "<script setup>\nimport {\n  ref\n} from 'vue'\nimport dayjs from 'dayjs'\nconst n = ref(dayjs())\n</script>\n<template>\n<p>hi</p>\n</template>",
        );
        let code = compiler.compile_script("demo-component-3", &desc).unwrap();

        assert!(code.contains("import { defineComponent as _defineComponent } from 'vue'"));
        assert!(code.contains("import { ref } from 'vue'"));
        assert!(code.contains("import dayjs from 'dayjs'"));
        assert!(code.contains("export default /*@__PURE__*/_defineComponent({"));
        assert!(code.contains("__name: 'demo-component-3',"));
        assert!(code.contains("setup(__props) {\nconst n = ref(dayjs())"));
        assert!(code.trim_end().ends_with("})"));
    }

    #[test]
    fn test_options_script_is_spread() {
        let compiler = StaticComponentCompiler::default();
        let desc = descriptor(
            "<script>\nconst greeting = 'hi'\nexport default {\n  data() { return { greeting } }\n};\n</script>\n<template><p>x</p></template>",
        );
        let code = compiler.compile_script("demo-component-1", &desc).unwrap();

        assert!(code.contains("...(function () {\nconst greeting = 'hi'\nreturn {\n  data() { return { greeting } }\n}\n})(),"));
        assert!(code.contains("render(_ctx, _cache) {"));
    }

    #[test]
    fn test_options_script_without_default_export() {
        let compiler = StaticComponentCompiler::default();
        let desc = descriptor("<script>\nconst a = 1\n</script>\n<template><p>x</p></template>");
        let err = compiler.compile_script("demo-component-2", &desc).unwrap_err();
        assert!(matches!(err, CompilerError::Compile { ref id, .. } if id == "demo-component-2"));
    }

    #[test]
    fn test_split_imports() {
        let (imports, body) = split_imports("import { a,\n b } from 'vue';\nimport './side.css'\nconst x = a + b");
        assert_eq!(imports, vec!["import { a, b } from 'vue';", "import './side.css'"]);
        assert_eq!(body, "const x = a + b");
    }
}
