// FILE: src/cli/handlers.rs
use crate::{
    dev_server::DevServer, plugin::document_id, CompilerError, MarkdownDemoPlugin, PluginOptions, Result,
    TransformStats,
};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Instant;

// --- BUILD ---
pub fn handle_build_command(cli: &super::DemoCli, matches: &clap::ArgMatches) -> Result<()> {
    let input = Path::new(matches.get_one::<String>("input").unwrap());
    if !input.exists() {
        return Err(CompilerError::FileNotFound {
            path: input.display().to_string(),
        });
    }
    // Watcher events carry absolute paths
    let input_path = &input.canonicalize()?;

    let options = cli.build_plugin_options(matches)?;
    let output_dir = cli.output_directory(matches).map(PathBuf::from).unwrap_or_else(|| {
        if input_path.is_dir() {
            input_path.to_path_buf()
        } else {
            input_path.parent().map(Path::to_path_buf).unwrap_or_default()
        }
    });

    let documents = collect_documents(input_path, &options)?;
    let mut server = DevServer::new(MarkdownDemoPlugin::new(options), &output_dir);
    if input_path.is_dir() {
        server = server.with_root(input_path);
    }

    println!(
        "🔨 Building {} document(s) from {} -> {} ({} mode)",
        documents.len(),
        input_path.display(),
        output_dir.display(),
        server.plugin().mode()
    );

    let build_start = Instant::now();
    let mut failures = 0;
    for document in &documents {
        match server.load_document(document) {
            Ok(Some(stats)) => {
                println!(
                    "✅ {} ({} demos, {} bytes)",
                    document.display(),
                    stats.demo_count,
                    stats.output_size
                );
                if matches.get_flag("stats") {
                    print_detailed_stats(&stats)?;
                }
            }
            Ok(None) => {}
            Err(e) => {
                failures += 1;
                eprintln!("❌ {} - {}", document.display(), e);
            }
        }
    }

    println!("   Virtual components: {}", server.emitted_count());
    println!("   Time: {}ms", build_start.elapsed().as_millis());

    if matches.get_flag("watch") {
        return watch_and_rebuild(input_path, &mut server);
    }

    if failures > 0 {
        Err(CompilerError::invalid_format(format!("{} documents failed to build", failures)))
    } else {
        Ok(())
    }
}

fn watch_and_rebuild(input_path: &Path, server: &mut DevServer) -> Result<()> {
    println!("👀 Watching {} for changes...", input_path.display());

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| CompilerError::watch(format!("Failed to create file watcher: {}", e)))?;

    let mode = if input_path.is_dir() {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher
        .watch(input_path, mode)
        .map_err(|e| CompilerError::watch(format!("Failed to watch {}: {}", input_path.display(), e)))?;

    let extension = server.plugin().options().document_extension.clone();
    loop {
        let event = match rx.recv() {
            Ok(event) => event,
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        };
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }

        for path in event.paths.iter().filter(|p| p.to_string_lossy().ends_with(&extension)) {
            let known = !server.graph().modules_for_file(path).is_empty();
            let result = if known {
                server.handle_change(path).map(|rebuilt| rebuilt > 0)
            } else {
                server.load_document(path).map(|stats| stats.is_some())
            };
            match result {
                Ok(true) => println!("🔄 Rebuilt {}", document_id(path)),
                Ok(false) => log::debug!("{} unchanged", path.display()),
                Err(e) => eprintln!("❌ {} - {}", path.display(), e),
            }
        }
    }

    Ok(())
}

// --- CHECK ---
pub fn handle_check_command(cli: &super::DemoCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = Path::new(matches.get_one::<String>("input").unwrap());
    let options = cli.build_plugin_options(matches)?;
    let documents = collect_documents(input_path, &options)?;
    let mut plugin = MarkdownDemoPlugin::new(options);

    let mut error_files = 0;
    let mut demo_total = 0;
    for document in &documents {
        println!("🔍 Checking {}", document.display());
        match check_document(&mut plugin, document) {
            Ok(stats) => {
                demo_total += stats.demo_count;
                println!(
                    "✅ {} - {} demos ({} compiled, {} passed through)",
                    document.display(),
                    stats.demo_count,
                    stats.compiled_count,
                    stats.passthrough_count
                );
                if stats.unclosed_count > 0 {
                    println!("   ⚠️  {} unclosed container(s)", stats.unclosed_count);
                }
            }
            Err(e) => {
                error_files += 1;
                println!("❌ {} - {}", document.display(), e);
            }
        }
    }

    println!("\n📊 Check Summary:");
    println!("   Total files: {}", documents.len());
    println!("   Total demos: {}", demo_total);
    println!("   Files with errors: {}", error_files);

    if error_files > 0 {
        Err(CompilerError::invalid_format(format!("{} files have errors", error_files)))
    } else {
        Ok(())
    }
}

fn check_document(plugin: &mut MarkdownDemoPlugin, path: &Path) -> Result<TransformStats> {
    let source = fs::read_to_string(path)?;
    let id = document_id(path);
    plugin
        .transform(&source, &id)?
        .map(|result| result.stats)
        .ok_or_else(|| CompilerError::invalid_format(format!("{} is not a markdown document", id)))
}

/// The input itself, or every document below it when it is a directory
fn collect_documents(input_path: &Path, options: &PluginOptions) -> Result<Vec<PathBuf>> {
    if !input_path.is_dir() {
        return Ok(vec![input_path.to_path_buf()]);
    }

    let mut documents = Vec::new();
    for entry in walkdir::WalkDir::new(input_path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            CompilerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_string_lossy()
                .ends_with(&options.document_extension)
        {
            documents.push(entry.into_path());
        }
    }
    Ok(documents)
}

fn print_detailed_stats(stats: &TransformStats) -> Result<()> {
    println!("\n📊 Detailed Transform Statistics:");
    println!("   Source size: {} bytes", stats.source_size);
    println!("   Output size: {} bytes", stats.output_size);
    println!("   Transform time: {}ms", stats.transform_time_ms);
    println!("\n   Block breakdown:");
    println!("     Demos: {}", stats.demo_count);
    println!("     Compiled: {}", stats.compiled_count);
    println!("     Passed through: {}", stats.passthrough_count);
    println!("     Details: {}", stats.details_count);
    if stats.unclosed_count > 0 {
        println!("     Unclosed: {}", stats.unclosed_count);
    }
    log::debug!(
        "Stats: {}",
        serde_json::to_string(stats).map_err(|e| CompilerError::invalid_format(e.to_string()))?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_documents_walks_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("guide")).unwrap();
        fs::write(temp_dir.path().join("index.md"), "# Home").unwrap();
        fs::write(temp_dir.path().join("guide").join("button.md"), "# Button").unwrap();
        fs::write(temp_dir.path().join("guide").join("notes.txt"), "skip").unwrap();

        let documents = collect_documents(temp_dir.path(), &PluginOptions::default()).unwrap();
        let names: Vec<String> = documents
            .iter()
            .map(|p| p.strip_prefix(temp_dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["guide/button.md", "index.md"]);
    }

    #[test]
    fn test_collect_documents_single_file() {
        let documents = collect_documents(Path::new("page.md"), &PluginOptions::default()).unwrap();
        assert_eq!(documents, vec![PathBuf::from("page.md")]);
    }

    #[test]
    fn test_check_document() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("page.md");
        fs::write(&doc, "::: demo\n<b>x</b>\n:::\n\n::: demo\n<script setup>\nconst a = 1\n</script>\n<template></template>\n:::\n").unwrap();

        let mut plugin = MarkdownDemoPlugin::new(PluginOptions::default());
        let stats = check_document(&mut plugin, &doc).unwrap();
        assert_eq!(stats.demo_count, 2);
        assert_eq!(stats.compiled_count, 1);
        assert_eq!(stats.passthrough_count, 1);
    }
}
