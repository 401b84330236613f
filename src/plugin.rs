//! Build-tool plugin: module resolution, loading, transform and hot update hooks

use crate::assembler::DocumentAssembler;
use crate::compiler::StaticComponentCompiler;
use crate::demo::{DemoCompiler, InlineCompiler, ReferenceCompiler};
use crate::error::{CompilerError, Result};
use crate::session::CompilerSession;
use crate::types::{DemoMode, TransformStats};
use crate::PluginOptions;
use std::path::{Path, PathBuf};

pub const PLUGIN_NAME: &str = "vite-plugin-vue-markdown";

/// A node in the host's module graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub id: String,
    pub file: Option<PathBuf>,
}

/// The capabilities the plugin needs from the host dev server
pub trait HostServer {
    /// Module whose id is exactly `id`
    fn module_by_id(&self, id: &str) -> Option<ModuleNode>;

    /// Request a targeted reload of one module
    fn reload_module(&mut self, module: &ModuleNode);
}

/// Arguments of a hot update notification
pub struct HmrContext<'a, S: HostServer + ?Sized> {
    pub file: &'a str,
    pub timestamp: u64,
    /// Modules the host already associates with `file`
    pub modules: Vec<ModuleNode>,
    pub server: &'a mut S,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub code: String,
    /// Always `None`; source maps are not produced
    pub map: Option<String>,
    pub stats: TransformStats,
}

pub struct MarkdownDemoPlugin {
    options: PluginOptions,
    session: CompilerSession,
    compiler: Box<dyn DemoCompiler>,
}

impl MarkdownDemoPlugin {
    pub fn new(options: PluginOptions) -> Self {
        let compiler: Box<dyn DemoCompiler> = match options.mode {
            DemoMode::Reference => Box::new(ReferenceCompiler::new(&options)),
            DemoMode::Inline => Box::new(InlineCompiler::new(
                &options,
                Box::new(StaticComponentCompiler::new(&options.framework_module)),
            )),
        };
        Self {
            options,
            session: CompilerSession::new(),
            compiler,
        }
    }

    /// Replace the demo compiler, e.g. an [`InlineCompiler`] backed by the
    /// framework's own component compiler
    pub fn with_demo_compiler(mut self, compiler: Box<dyn DemoCompiler>) -> Self {
        self.options.mode = compiler.mode();
        self.compiler = compiler;
        self
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn mode(&self) -> DemoMode {
        self.options.mode
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// The long-lived reference-mode session
    pub fn session(&self) -> &CompilerSession {
        &self.session
    }

    /// Claim ids in the virtual namespace. Inline mode claims nothing.
    pub fn resolve_id(&self, id: &str) -> Option<String> {
        if self.options.mode == DemoMode::Reference && id.starts_with(&self.options.virtual_namespace) {
            Some(id.to_string())
        } else {
            None
        }
    }

    /// Serve the registered source for a virtual component id
    pub fn load(&self, id: &str) -> Result<Option<String>> {
        let Some(identifier) = id
            .strip_prefix(&self.options.virtual_namespace)
            .and_then(|rest| rest.strip_suffix(&self.options.component_extension))
        else {
            return Ok(None);
        };

        match self.session.registry().get(identifier) {
            Some(source) => {
                log::debug!("Loaded {} ({} bytes)", id, source.len());
                Ok(Some(source.to_string()))
            }
            None => Err(CompilerError::unknown_component(identifier)),
        }
    }

    /// Transform a markdown document into component source
    pub fn transform(&mut self, code: &str, id: &str) -> Result<Option<TransformResult>> {
        if !id.ends_with(&self.options.document_extension) {
            return Ok(None);
        }

        let assembler = DocumentAssembler::new(&self.options, self.compiler.as_ref());
        let assembled = match self.options.mode {
            DemoMode::Reference => assembler.assemble(code, id, &mut self.session)?,
            DemoMode::Inline => assembler.assemble(code, id, &mut CompilerSession::new())?,
        };

        Ok(Some(TransformResult {
            code: assembled.code,
            map: None,
            stats: assembled.stats,
        }))
    }

    /// Reload the derived module of a changed markdown document
    pub fn handle_hot_update<S: HostServer + ?Sized>(&self, ctx: HmrContext<'_, S>) -> Option<Vec<ModuleNode>> {
        if !ctx.file.ends_with(&self.options.document_extension) {
            return None;
        }

        let module = ctx.server.module_by_id(ctx.file)?;
        log::info!("Hot update for {} at {}", ctx.file, ctx.timestamp);
        ctx.server.reload_module(&module);
        Some(vec![module])
    }

    /// Synthetic module id for a registered identifier
    pub fn virtual_id(&self, identifier: &str) -> String {
        format!(
            "{}{}{}",
            self.options.virtual_namespace, identifier, self.options.component_extension
        )
    }
}

/// Module id the host would use for a document on disk
pub fn document_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
