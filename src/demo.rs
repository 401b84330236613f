//! Demo compilers: turn a normalized snippet into a renderable unit
//!
//! [`ReferenceCompiler`] registers each snippet as its own virtual module and
//! references it by import. [`InlineCompiler`] compiles each snippet and
//! splices the component definition into the document's script.

use crate::compiler::ComponentCompiler;
use crate::error::{CompilerError, Result};
use crate::scaffold::Scaffold;
use crate::session::{CompilerSession, DocumentScope};
use crate::sfc::SfcDescriptor;
use crate::types::*;
use crate::PluginOptions;

/// What a demo block renders as inside its display wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoOutput {
    pub placeholder: String,
    /// `None` when the snippet was passed through uncompiled
    pub unit: Option<CompiledUnit>,
}

impl DemoOutput {
    fn passthrough(raw: &str) -> Self {
        Self {
            placeholder: raw.to_string(),
            unit: None,
        }
    }
}

pub trait DemoCompiler {
    fn mode(&self) -> DemoMode;

    fn compile(&self, block: &DemoBlock, session: &mut CompilerSession, scope: &mut DocumentScope) -> Result<DemoOutput>;

    /// Script statements the document needs for every demo compiled into `scope`
    fn render_script(&self, scope: &DocumentScope) -> String;
}

/// Parse the snippet; `None` means there is no template to compile.
/// SFC error lines are reported relative to the document.
fn describe(block: &DemoBlock, scope: &DocumentScope) -> Result<Option<SfcDescriptor>> {
    let descriptor = SfcDescriptor::parse(&block.normalized, &scope.document).map_err(|e| match e {
        CompilerError::Sfc { file, line, message } => CompilerError::Sfc {
            file,
            line: block.line + line.saturating_sub(1),
            message,
        },
        other => other,
    })?;

    if descriptor.has_template_content() {
        Ok(Some(descriptor))
    } else {
        log::warn!(
            "Demo at {}:{} has no template content; emitting it verbatim",
            scope.document,
            block.line
        );
        Ok(None)
    }
}

pub struct ReferenceCompiler {
    namespace: String,
    extension: String,
    prefix: String,
    local_prefix: String,
}

impl ReferenceCompiler {
    pub fn new(options: &PluginOptions) -> Self {
        Self {
            namespace: options.virtual_namespace.clone(),
            extension: options.component_extension.clone(),
            prefix: options.reference_prefix.clone(),
            local_prefix: format!("{}{}", REFERENCE_COMPONENT_PREFIX, options.reference_prefix),
        }
    }

    /// Synthetic module id for a registered identifier
    pub fn module_id(&self, identifier: &str) -> String {
        format!("{}{}{}", self.namespace, identifier, self.extension)
    }
}

impl DemoCompiler for ReferenceCompiler {
    fn mode(&self) -> DemoMode {
        DemoMode::Reference
    }

    fn compile(&self, block: &DemoBlock, session: &mut CompilerSession, scope: &mut DocumentScope) -> Result<DemoOutput> {
        if describe(block, scope)?.is_none() {
            return Ok(DemoOutput::passthrough(&block.raw));
        }

        let unit = session.next_unit(&self.prefix, &self.local_prefix);
        session.registry_mut().register(&unit.identifier, &block.normalized);
        log::debug!("Registered {} from {}:{}", unit.identifier, scope.document, block.line);

        scope.add_component_import(format!(
            "import {} from '{}'",
            unit.local_name,
            self.module_id(&unit.identifier)
        ));

        Ok(DemoOutput {
            placeholder: format!("<{} />", unit.local_name),
            unit: Some(unit),
        })
    }

    fn render_script(&self, scope: &DocumentScope) -> String {
        scope.component_imports.join("\n")
    }
}

pub struct InlineCompiler {
    compiler: Box<dyn ComponentCompiler>,
    scaffold: Scaffold,
    prefix: String,
    framework_module: String,
    extension: String,
}

impl InlineCompiler {
    pub fn new(options: &PluginOptions, compiler: Box<dyn ComponentCompiler>) -> Self {
        Self {
            compiler,
            scaffold: Scaffold::new(&options.framework_module),
            prefix: options.inline_prefix.clone(),
            framework_module: options.framework_module.clone(),
            extension: options.component_extension.clone(),
        }
    }
}

impl DemoCompiler for InlineCompiler {
    fn mode(&self) -> DemoMode {
        DemoMode::Inline
    }

    fn compile(&self, block: &DemoBlock, session: &mut CompilerSession, scope: &mut DocumentScope) -> Result<DemoOutput> {
        let Some(descriptor) = describe(block, scope)? else {
            return Ok(DemoOutput::passthrough(&block.raw));
        };

        let unit = session.next_unit(&self.prefix, INLINE_LOCAL_PREFIX);
        let filename = format!("{}{}", unit.identifier, self.extension);

        let fragment = if descriptor.has_script() {
            let code = self.compiler.compile_script(&unit.identifier, &descriptor)?;
            self.scaffold.unwrap_component(&code)
        } else {
            let template = descriptor.template_content().unwrap_or_default();
            let code = self.compiler.compile_template(&unit.identifier, &filename, template)?;
            self.scaffold.render_property(&unit.identifier, &code)?
        };
        log::debug!(
            "Compiled {} inline ({} framework bindings)",
            unit.identifier,
            fragment.framework_bindings.len()
        );

        scope.imports.extend(fragment.framework_bindings);
        for statement in fragment.foreign_imports {
            scope.add_foreign_import(statement);
        }
        scope.definitions.push(format!(
            "const {} = _defineComponent({{\n  name: '{}',\n  {}\n}})",
            unit.local_name, unit.identifier, fragment.body
        ));

        Ok(DemoOutput {
            placeholder: format!("<component :is='{}' />", unit.local_name),
            unit: Some(unit),
        })
    }

    fn render_script(&self, scope: &DocumentScope) -> String {
        let mut imports = scope.imports.clone();
        if !scope.definitions.is_empty() {
            imports.insert(DEFINE_COMPONENT_BINDING);
        }

        let mut lines: Vec<String> = Vec::new();
        lines.extend(imports.render(&self.framework_module));
        lines.extend(scope.foreign_imports.iter().cloned());
        lines.extend(scope.definitions.iter().cloned());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::StaticComponentCompiler;
    use crate::normalizer::normalize_snippet;

    fn block(raw: &str) -> DemoBlock {
        DemoBlock {
            raw: raw.to_string(),
            normalized: normalize_snippet(raw),
            line: 3,
        }
    }

    fn inline_compiler() -> InlineCompiler {
        InlineCompiler::new(&PluginOptions::default(), Box::new(StaticComponentCompiler::default()))
    }

    #[test]
    fn test_reference_registers_normalized_source() {
        let compiler = ReferenceCompiler::new(&PluginOptions::default());
        let mut session = CompilerSession::new();
        let mut scope = DocumentScope::new("button.md");

        let output = compiler.compile(&block("<button>Hi</button>"), &mut session, &mut scope).unwrap();

        assert_eq!(output.placeholder, "<VirtualComponentDemoOar0 />");
        assert_eq!(
            session.registry().get("Oar0"),
            Some("<template><button>Hi</button></template>")
        );
        assert_eq!(
            compiler.render_script(&scope),
            "import VirtualComponentDemoOar0 from 'virtual:component-demo/Oar0.vue'"
        );
    }

    #[test]
    fn test_reference_identical_snippets_get_distinct_ids() {
        let compiler = ReferenceCompiler::new(&PluginOptions::default());
        let mut session = CompilerSession::new();
        let mut scope = DocumentScope::new("button.md");

        let first = compiler.compile(&block("<i>same</i>"), &mut session, &mut scope).unwrap();
        let second = compiler.compile(&block("<i>same</i>"), &mut session, &mut scope).unwrap();

        assert_ne!(first.unit.unwrap().identifier, second.unit.unwrap().identifier);
        assert_eq!(session.registry().len(), 2);
        assert_eq!(scope.component_imports.len(), 2);
    }

    #[test]
    fn test_template_less_snippet_passes_through() {
        let compiler = ReferenceCompiler::new(&PluginOptions::default());
        let mut session = CompilerSession::new();
        let mut scope = DocumentScope::new("button.md");
        let raw = "<script setup>\nconst a = 1\n</script>\n<template></template>";

        let output = compiler.compile(&block(raw), &mut session, &mut scope).unwrap();

        assert_eq!(output.placeholder, raw);
        assert!(output.unit.is_none());
        assert_eq!(session.issued(), 0);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_sfc_error_reports_document_line() {
        let compiler = ReferenceCompiler::new(&PluginOptions::default());
        let mut session = CompilerSession::new();
        let mut scope = DocumentScope::new("broken.md");
        let raw = "<script setup>\nconst a = 1\n<template><p>x</p></template>";

        let err = compiler.compile(&block(raw), &mut session, &mut scope).unwrap_err();
        match err {
            CompilerError::Sfc { file, line, .. } => {
                assert_eq!(file, "broken.md");
                assert_eq!(line, 3);
            }
            other => panic!("Expected SFC error, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_template_only() {
        let compiler = inline_compiler();
        let mut session = CompilerSession::new();
        let mut scope = DocumentScope::new("button.md");

        let output = compiler.compile(&block("<button>Hi</button>"), &mut session, &mut scope).unwrap();

        assert_eq!(output.placeholder, "<component :is='component0' />");
        assert!(session.registry().is_empty());
        assert_eq!(scope.definitions.len(), 1);
        assert!(scope.definitions[0].starts_with("const component0 = _defineComponent({\n  name: 'demo-component-0',\n  render: function renderFn(_ctx, _cache) {"));
        assert!(scope.imports.contains("createStaticVNode as _createStaticVNode"));
    }

    #[test]
    fn test_inline_script_setup() {
        let compiler = inline_compiler();
        let mut session = CompilerSession::new();
        let mut scope = DocumentScope::new("counter.md");
        let raw = "<script setup>\nimport { ref } from 'vue'\nimport dayjs from 'dayjs'\nconst n = ref(0)\n</script>\n<template>\n<p>count</p>\n</template>";

        compiler.compile(&block(raw), &mut session, &mut scope).unwrap();

        assert!(scope.imports.contains("ref"));
        assert!(scope.imports.contains("defineComponent as _defineComponent"));
        assert_eq!(scope.foreign_imports, vec!["import dayjs from 'dayjs'"]);
        let definition = &scope.definitions[0];
        assert!(definition.contains("__name: 'demo-component-0',"));
        assert!(definition.contains("setup(__props) {\nconst n = ref(0)"));
        assert!(!definition.contains("import"));
    }

    #[test]
    fn test_inline_script_lists_imports_once() {
        let compiler = inline_compiler();
        let mut session = CompilerSession::new();
        let mut scope = DocumentScope::new("a.md");

        compiler.compile(&block("<b>one</b>"), &mut session, &mut scope).unwrap();
        compiler.compile(&block("<b>two</b>"), &mut session, &mut scope).unwrap();

        let script = compiler.render_script(&scope);
        assert_eq!(script.matches("createStaticVNode as _createStaticVNode").count(), 1);
        assert!(script.starts_with(
            "import { createStaticVNode as _createStaticVNode, defineComponent as _defineComponent } from 'vue';"
        ));
        assert!(script.contains("const component1 = _defineComponent({"));
    }
}
