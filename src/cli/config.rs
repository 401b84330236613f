// FILE: src/cli/config.rs

use crate::error::{CompilerError, Result};
use crate::types::DemoMode;
use crate::PluginOptions;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub mode: Option<DemoMode>,
    pub document_extension: Option<String>,
    pub virtual_namespace: Option<String>,
    pub component_extension: Option<String>,
    pub reference_prefix: Option<String>,
    pub inline_prefix: Option<String>,
    pub demo_block_import: Option<String>,
    pub framework_module: Option<String>,
    pub wrapper_class: Option<String>,
    pub script_lang: Option<String>,
    pub output_directory: Option<String>,
}

impl ConfigFile {
    /// Overlay the configured values onto `options`
    pub fn apply(&self, options: &mut PluginOptions) {
        if let Some(mode) = self.mode {
            options.mode = mode;
        }
        let overrides = [
            (&self.document_extension, &mut options.document_extension),
            (&self.virtual_namespace, &mut options.virtual_namespace),
            (&self.component_extension, &mut options.component_extension),
            (&self.reference_prefix, &mut options.reference_prefix),
            (&self.inline_prefix, &mut options.inline_prefix),
            (&self.demo_block_import, &mut options.demo_block_import),
            (&self.framework_module, &mut options.framework_module),
            (&self.wrapper_class, &mut options.wrapper_class),
            (&self.script_lang, &mut options.script_lang),
        ];
        for (value, target) in overrides {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
    }
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("Config file {}: {}", config_path, e),
    })?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })?
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })?
    } else {
        return Err(CompilerError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        });
    };

    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}
