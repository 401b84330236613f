//! Unwrapping of printed compiler modules into spliceable fragments
//!
//! Inline demos are spliced into the document's own script, so the
//! standalone-module scaffolding the component compiler prints (imports,
//! `export`, the `defineComponent(...)` call) has to come off. This works on
//! the printed text and depends on the shapes described in [`crate::compiler`].

use crate::error::{CompilerError, Result};
use regex::Regex;

const FACTORY_CALL: &str = "_defineComponent(";
const PURE_ANNOTATION: &str = "/*@__PURE__*/";

/// A compiled component body ready to be placed inside `_defineComponent({ ... })`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub body: String,
    /// Named bindings imported from the framework module (`ref`, `createStaticVNode as _createStaticVNode`)
    pub framework_bindings: Vec<String>,
    /// Any other import statements, verbatim
    pub foreign_imports: Vec<String>,
}

pub struct Scaffold {
    framework_import: Regex,
    import_statement: Regex,
    render_args: Regex,
}

impl Scaffold {
    pub fn new(framework_module: &str) -> Self {
        let module = regex::escape(framework_module);
        Self {
            framework_import: Regex::new(&format!(r#"import\s*\{{(.*)\}}\s*from\s*['"]{}['"]"#, module)).unwrap(),
            import_statement: Regex::new(r#"(?m)^[ \t]*import\b[^\n]*?['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#).unwrap(),
            render_args: Regex::new(r"function render\((.*?)\) \{").unwrap(),
        }
    }

    /// Named framework bindings across every framework import in `code`
    pub fn framework_bindings(&self, code: &str) -> Vec<String> {
        self.framework_import
            .captures_iter(code)
            .flat_map(|caps| {
                caps[1]
                    .split(',')
                    .map(|binding| binding.trim().to_string())
                    .filter(|binding| !binding.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn foreign_imports(&self, code: &str) -> Vec<String> {
        self.import_statement
            .captures_iter(code)
            .filter(|caps| !self.framework_import.is_match(&caps[0]))
            .map(|caps| caps[0].trim().to_string())
            .collect()
    }

    fn strip_imports(&self, code: &str) -> String {
        self.import_statement.replace_all(code, "").into_owned()
    }

    /// Turn a component module (`export default _defineComponent({...})`) into its options body
    pub fn unwrap_component(&self, code: &str) -> Fragment {
        let mut body = self
            .strip_imports(code)
            .replacen("export default", "", 1)
            .trim()
            .to_string();

        let wrapped = body
            .strip_prefix(PURE_ANNOTATION)
            .unwrap_or(&body)
            .strip_prefix(FACTORY_CALL)
            .map(str::to_string);
        if let Some(inner) = wrapped {
            body = inner.trim().to_string();
            body = body.trim_end_matches(';').trim_end().to_string();
            if body.ends_with(')') {
                body.pop();
            }
        }

        let trimmed = body.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            body = trimmed[1..trimmed.len() - 1].to_string();
        }

        Fragment {
            body: body.trim().to_string(),
            framework_bindings: self.framework_bindings(code),
            foreign_imports: self.foreign_imports(code),
        }
    }

    /// Turn a template module exporting `render` into a `render:` option that
    /// re-creates the hoisted declarations on each call
    pub fn render_property(&self, id: &str, code: &str) -> Result<Fragment> {
        let stripped = self.strip_imports(code).replacen("export ", "", 1);
        let stripped = stripped.trim();

        let (hoisted, render) = stripped
            .split_once("function render")
            .ok_or_else(|| CompilerError::compile(id, "compiled template has no render function"))?;
        let args = self
            .render_args
            .captures(code)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();

        let body = format!(
            "render: function renderFn({args}) {{\n  {hoisted}\n  return function render{render}({args})\n}}",
            args = args,
            hoisted = hoisted.trim(),
            render = render
        );

        Ok(Fragment {
            body,
            framework_bindings: self.framework_bindings(code),
            foreign_imports: self.foreign_imports(code),
        })
    }
}
