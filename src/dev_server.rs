//! In-process development host
//!
//! [`ModuleGraph`] is a minimal [`HostServer`]: it tracks one module per
//! document and queues the reloads the plugin requests. [`DevServer`] owns the
//! plugin and the graph, turns file changes into hot updates, re-transforms the
//! queued modules and writes the generated components to disk.

use crate::error::{CompilerError, Result};
use crate::plugin::{document_id, HmrContext, HostServer, MarkdownDemoPlugin, ModuleNode};
use crate::types::TransformStats;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Directory under the output directory holding served virtual components
pub const VIRTUAL_OUTPUT_DIR: &str = "__virtual__";

#[derive(Debug, Clone)]
struct ModuleRecord {
    node: ModuleNode,
    /// md5 of the source last transformed
    digest: Option<[u8; 16]>,
}

#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: HashMap<String, ModuleRecord>,
    pending: Vec<ModuleNode>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: &str, file: &Path) -> ModuleNode {
        let record = self.modules.entry(id.to_string()).or_insert_with(|| ModuleRecord {
            node: ModuleNode {
                id: id.to_string(),
                file: Some(file.to_path_buf()),
            },
            digest: None,
        });
        record.node.clone()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules backed by `file`
    pub fn modules_for_file(&self, file: &Path) -> Vec<ModuleNode> {
        self.modules
            .values()
            .filter(|record| record.node.file.as_deref() == Some(file))
            .map(|record| record.node.clone())
            .collect()
    }

    /// Drain the reload queue
    pub fn take_pending(&mut self) -> Vec<ModuleNode> {
        std::mem::take(&mut self.pending)
    }

    /// Digest of `source`, or `None` when it matches the last one built for `id`
    pub fn digest_changed(&self, id: &str, source: &str) -> Option<[u8; 16]> {
        let digest = md5::compute(source.as_bytes()).0;
        match self.modules.get(id) {
            Some(record) if record.digest == Some(digest) => None,
            _ => Some(digest),
        }
    }

    /// Mark `digest` as built for `id`
    pub fn commit_digest(&mut self, id: &str, digest: [u8; 16]) {
        if let Some(record) = self.modules.get_mut(id) {
            record.digest = Some(digest);
        }
    }
}

impl HostServer for ModuleGraph {
    fn module_by_id(&self, id: &str) -> Option<ModuleNode> {
        self.modules.get(id).map(|record| record.node.clone())
    }

    fn reload_module(&mut self, module: &ModuleNode) {
        if !self.pending.iter().any(|pending| pending.id == module.id) {
            self.pending.push(module.clone());
        }
    }
}

pub struct DevServer {
    plugin: MarkdownDemoPlugin,
    graph: ModuleGraph,
    /// Documents under this directory keep their relative layout in the output
    root: Option<PathBuf>,
    out_dir: PathBuf,
    emitted: HashSet<String>,
}

impl DevServer {
    pub fn new(plugin: MarkdownDemoPlugin, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin,
            graph: ModuleGraph::new(),
            root: None,
            out_dir: out_dir.into(),
            emitted: HashSet::new(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn plugin(&self) -> &MarkdownDemoPlugin {
        &self.plugin
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// Virtual components written so far
    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }

    /// Transform a document, write its component and register it for hot updates.
    /// Returns `None` for files the plugin does not transform.
    pub fn load_document(&mut self, path: &Path) -> Result<Option<TransformStats>> {
        if !path.exists() {
            return Err(CompilerError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let id = document_id(path);
        let source = fs::read_to_string(path)?;
        let Some(result) = self.plugin.transform(&source, &id)? else {
            return Ok(None);
        };

        self.graph.register(&id, path);
        self.write_document(path, &result.code)?;
        self.emit_virtual_modules()?;
        if let Some(digest) = self.graph.digest_changed(&id, &source) {
            self.graph.commit_digest(&id, digest);
        }
        Ok(Some(result.stats))
    }

    /// Handle a change notification for `path`. Returns the number of modules rebuilt.
    pub fn handle_change(&mut self, path: &Path) -> Result<usize> {
        let id = document_id(path);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let ctx = HmrContext {
            file: &id,
            timestamp,
            modules: self.graph.modules_for_file(path),
            server: &mut self.graph,
        };
        if self.plugin.handle_hot_update(ctx).is_none() {
            log::debug!("No module to reload for {}", id);
            return Ok(0);
        }

        let mut rebuilt = 0;
        for node in self.graph.take_pending() {
            if self.rebuild(&node)? {
                rebuilt += 1;
            }
        }
        Ok(rebuilt)
    }

    fn rebuild(&mut self, node: &ModuleNode) -> Result<bool> {
        let Some(path) = node.file.clone() else {
            return Ok(false);
        };
        if !path.exists() {
            log::debug!("{} was removed; nothing to rebuild", path.display());
            return Ok(false);
        }

        let source = fs::read_to_string(&path)?;
        let Some(digest) = self.graph.digest_changed(&node.id, &source) else {
            log::debug!("{} unchanged; skipping reload", node.id);
            return Ok(false);
        };

        let Some(result) = self.plugin.transform(&source, &node.id)? else {
            return Ok(false);
        };
        self.write_document(&path, &result.code)?;
        self.emit_virtual_modules()?;
        self.graph.commit_digest(&node.id, digest);
        log::info!("Reloaded {} ({} demos)", node.id, result.stats.demo_count);
        Ok(true)
    }

    /// Output location for a document's component
    pub fn output_path(&self, path: &Path) -> PathBuf {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(path.file_name().unwrap_or_default()));
        let extension = self.plugin.options().component_extension.trim_start_matches('.');
        self.out_dir.join(relative).with_extension(extension)
    }

    fn write_document(&self, path: &Path, code: &str) -> Result<()> {
        let output = self.output_path(path);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output, code)?;
        log::debug!("Wrote {}", output.display());
        Ok(())
    }

    fn emit_virtual_modules(&mut self) -> Result<()> {
        let dir = self.out_dir.join(VIRTUAL_OUTPUT_DIR);
        let extension = self.plugin.options().component_extension.clone();

        let fresh: Vec<String> = self
            .plugin
            .session()
            .registry()
            .iter()
            .map(|(identifier, _)| identifier.to_string())
            .filter(|identifier| !self.emitted.contains(identifier))
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&dir)?;
        for identifier in fresh {
            let source = self
                .plugin
                .load(&self.plugin.virtual_id(&identifier))?
                .ok_or_else(|| CompilerError::unknown_component(identifier.as_str()))?;
            fs::write(dir.join(format!("{}{}", identifier, extension)), source)?;
            self.emitted.insert(identifier);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DemoMode;
    use crate::PluginOptions;
    use tempfile::TempDir;

    fn server(out: &Path, mode: DemoMode) -> DevServer {
        let options = PluginOptions {
            mode,
            ..Default::default()
        };
        DevServer::new(MarkdownDemoPlugin::new(options), out)
    }

    #[test]
    fn test_load_document_writes_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("button.md");
        fs::write(&doc, "# Button\n\n::: demo\n<button>Hi</button>\n:::\n").unwrap();
        let out = temp_dir.path().join("out");

        let mut dev = server(&out, DemoMode::Reference);
        let stats = dev.load_document(&doc).unwrap().unwrap();

        assert_eq!(stats.demo_count, 1);
        let page = fs::read_to_string(out.join("button.vue")).unwrap();
        assert!(page.contains("<VirtualComponentDemoOar0 />"));
        let component = fs::read_to_string(out.join(VIRTUAL_OUTPUT_DIR).join("Oar0.vue")).unwrap();
        assert_eq!(component, "<template><button>Hi</button></template>");
        assert_eq!(dev.emitted_count(), 1);
        assert_eq!(dev.graph().len(), 1);
    }

    #[test]
    fn test_non_document_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("notes.txt");
        fs::write(&file, "::: demo\nx\n:::").unwrap();

        let mut dev = server(&temp_dir.path().join("out"), DemoMode::Reference);
        assert!(dev.load_document(&file).unwrap().is_none());
        assert!(dev.graph().is_empty());
    }

    #[test]
    fn test_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let mut dev = server(temp_dir.path(), DemoMode::Reference);
        let result = dev.load_document(&temp_dir.path().join("missing.md"));
        assert!(matches!(result, Err(CompilerError::FileNotFound { .. })));
    }

    #[test]
    fn test_change_rebuilds_and_unchanged_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("page.md");
        fs::write(&doc, "::: demo\n<b>one</b>\n:::\n").unwrap();
        let out = temp_dir.path().join("out");

        let mut dev = server(&out, DemoMode::Reference);
        dev.load_document(&doc).unwrap();

        assert_eq!(dev.handle_change(&doc).unwrap(), 0);

        fs::write(&doc, "::: demo\n<b>two</b>\n:::\n").unwrap();
        assert_eq!(dev.handle_change(&doc).unwrap(), 1);

        let page = fs::read_to_string(out.join("page.vue")).unwrap();
        assert!(page.contains("<VirtualComponentDemoOar1 />"));
        assert!(out.join(VIRTUAL_OUTPUT_DIR).join("Oar1.vue").exists());
        assert_eq!(dev.plugin().session().issued(), 2);
    }

    #[test]
    fn test_failed_rebuild_is_retried() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("page.md");
        fs::write(&doc, "::: demo\n<b>one</b>\n:::\n").unwrap();
        let out = temp_dir.path().join("out");

        let mut dev = server(&out, DemoMode::Reference);
        dev.load_document(&doc).unwrap();

        // A directory in place of the page makes the write fail
        fs::remove_file(out.join("page.vue")).unwrap();
        fs::create_dir_all(out.join("page.vue")).unwrap();
        fs::write(&doc, "::: demo\n<b>two</b>\n:::\n").unwrap();
        assert!(dev.handle_change(&doc).is_err());

        fs::remove_dir_all(out.join("page.vue")).unwrap();
        assert_eq!(dev.handle_change(&doc).unwrap(), 1);
        assert!(out.join("page.vue").is_file());
        let page = fs::read_to_string(out.join("page.vue")).unwrap();
        assert!(page.contains("&lt;b&gt;two&lt;/b&gt;"));
    }

    #[test]
    fn test_digest_committed_only_on_request() {
        let mut graph = ModuleGraph::new();
        graph.register("/docs/a.md", Path::new("/docs/a.md"));

        let digest = graph.digest_changed("/docs/a.md", "one").unwrap();
        assert!(graph.digest_changed("/docs/a.md", "one").is_some());

        graph.commit_digest("/docs/a.md", digest);
        assert!(graph.digest_changed("/docs/a.md", "one").is_none());
        assert!(graph.digest_changed("/docs/a.md", "two").is_some());
    }

    #[test]
    fn test_change_to_unknown_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let mut dev = server(temp_dir.path(), DemoMode::Reference);

        assert_eq!(dev.handle_change(&temp_dir.path().join("style.css")).unwrap(), 0);
        assert_eq!(dev.handle_change(&temp_dir.path().join("other.md")).unwrap(), 0);
    }

    #[test]
    fn test_inline_mode_writes_no_virtual_modules() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("inline.md");
        fs::write(&doc, "::: demo\n<b>x</b>\n:::\n").unwrap();
        let out = temp_dir.path().join("out");

        let mut dev = server(&out, DemoMode::Inline);
        dev.load_document(&doc).unwrap();

        assert!(out.join("inline.vue").exists());
        assert!(!out.join(VIRTUAL_OUTPUT_DIR).exists());
    }

    #[test]
    fn test_output_path_keeps_layout_under_root() {
        let dev = server(Path::new("/out"), DemoMode::Reference).with_root("/docs");

        assert_eq!(dev.output_path(Path::new("/docs/guide/intro.md")), PathBuf::from("/out/guide/intro.vue"));
        assert_eq!(dev.output_path(Path::new("/elsewhere/page.md")), PathBuf::from("/out/page.vue"));
    }
}
