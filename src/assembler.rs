//! Document assembly: render a markdown page into a single-file component
//!
//! The `demo` container emits a display wrapper around each compiled
//! placeholder and fences the raw snippet between sentinel markers; the
//! sentinel spans are removed after rendering. The `details` container emits
//! a collapsible section. The rendered body is wrapped in template, script
//! and style blocks.

use crate::demo::DemoCompiler;
use crate::error::Result;
use crate::extractor::extract_block_content;
use crate::markup::{ContainerRule, MarkupRenderer, Token, TokenKind};
use crate::normalizer::normalize_snippet;
use crate::session::{CompilerSession, DocumentScope};
use crate::types::*;
use crate::PluginOptions;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Instant;

lazy_static! {
    static ref SENTINEL_SPAN: Regex = Regex::new(&format!(
        "(?s){}.*?{}",
        regex::escape(SENTINEL_START),
        regex::escape(SENTINEL_END)
    ))
    .unwrap();
}

/// Mutable state threaded through the container rules while one document renders
pub struct AssemblyContext<'a> {
    pub compiler: &'a dyn DemoCompiler,
    pub session: &'a mut CompilerSession,
    pub scope: DocumentScope,
    pub stats: TransformStats,
}

/// `::: demo` handler
struct DemoContainer;

impl<'a> ContainerRule<AssemblyContext<'a>> for DemoContainer {
    fn name(&self) -> &str {
        DEMO_CONTAINER
    }

    fn raw_content(&self) -> bool {
        true
    }

    fn open(&mut self, tokens: &[Token], idx: usize, ctx: &mut AssemblyContext<'a>) -> Result<String> {
        let raw = extract_block_content(tokens, idx);
        let line = match tokens.get(idx + 1) {
            Some(token) if token.kind == TokenKind::Raw => token.line,
            _ => tokens[idx].line + 1,
        };
        let block = DemoBlock {
            normalized: normalize_snippet(&raw),
            raw,
            line,
        };

        ctx.stats.demo_count += 1;
        let output = ctx.compiler.compile(&block, ctx.session, &mut ctx.scope)?;
        match output.unit {
            Some(_) => ctx.stats.compiled_count += 1,
            None => ctx.stats.passthrough_count += 1,
        }

        Ok(format!(
            "<DemoBlock code=\"{}\">{}{}",
            escape_attribute(&block.raw),
            output.placeholder,
            SENTINEL_START
        ))
    }

    fn close(&mut self, token: &Token, ctx: &mut AssemblyContext<'a>) -> Result<String> {
        if token.nesting == 1 {
            ctx.stats.unclosed_count += 1;
        }
        Ok(format!("{}</DemoBlock>\n", SENTINEL_END))
    }
}

/// `::: details [title]` handler
struct DetailsContainer;

impl<'a> ContainerRule<AssemblyContext<'a>> for DetailsContainer {
    fn name(&self) -> &str {
        DETAILS_CONTAINER
    }

    fn open(&mut self, tokens: &[Token], idx: usize, ctx: &mut AssemblyContext<'a>) -> Result<String> {
        ctx.stats.details_count += 1;
        let info = &tokens[idx].info;
        let title = info.strip_prefix(DETAILS_CONTAINER).unwrap_or(info).trim();
        let title = if title.is_empty() { DETAILS_CONTAINER } else { title };
        Ok(format!("<details class=\"details\">\n<summary>{}</summary>\n", title))
    }

    fn close(&mut self, token: &Token, ctx: &mut AssemblyContext<'a>) -> Result<String> {
        if token.nesting == 1 {
            ctx.stats.unclosed_count += 1;
        }
        Ok("</details>\n".to_string())
    }
}

/// Remove every sentinel-delimited span
pub fn strip_sentinels(html: &str) -> String {
    SENTINEL_SPAN.replace_all(html, "").into_owned()
}

#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub code: String,
    pub stats: TransformStats,
}

pub struct DocumentAssembler<'a> {
    options: &'a PluginOptions,
    compiler: &'a dyn DemoCompiler,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(options: &'a PluginOptions, compiler: &'a dyn DemoCompiler) -> Self {
        Self { options, compiler }
    }

    /// Render `source` and wrap it as a component. `document` is the module id
    /// used in diagnostics.
    pub fn assemble(&self, source: &str, document: &str, session: &mut CompilerSession) -> Result<AssembledDocument> {
        let start_time = Instant::now();

        let mut ctx = AssemblyContext {
            compiler: self.compiler,
            session,
            scope: DocumentScope::new(document),
            stats: TransformStats::default(),
        };

        let mut renderer = MarkupRenderer::new()
            .with_container(DemoContainer)
            .with_container(DetailsContainer);
        let html = renderer.render(source, &mut ctx)?;

        let body = strip_sentinels(&html);
        let script = self.compiler.render_script(&ctx.scope);
        let code = self.wrap(&body, &script);

        let mut stats = ctx.stats;
        stats.source_size = source.len() as u64;
        stats.output_size = code.len() as u64;
        stats.transform_time_ms = start_time.elapsed().as_millis() as u64;

        log::info!(
            "Assembled {} ({} mode): {} demos, {} details",
            document,
            self.compiler.mode(),
            stats.demo_count,
            stats.details_count
        );

        Ok(AssembledDocument { code, stats })
    }

    fn wrap(&self, body: &str, script: &str) -> String {
        let mut code = String::with_capacity(body.len() + script.len() + 256);
        code.push_str(&format!(
            "<template>\n<div class='{}'>\n{}</div>\n</template>\n",
            self.options.wrapper_class, body
        ));
        code.push_str(&format!("<script setup lang='{}'>\n", self.options.script_lang));
        code.push_str(&format!("import DemoBlock from '{}'\n", self.options.demo_block_import));
        if !script.is_empty() {
            code.push_str(script);
            code.push('\n');
        }
        code.push_str("</script>\n");
        code.push_str("<style scoped>\nsummary {\n  user-select: none;\n}\n</style>\n");
        code
    }
}
