//! Language configuration for compilation and execution

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use serde::Deserialize;

use crate::runner::CommandSpec;

const BUILTIN_LANGUAGES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));

/// Configuration for a supported programming language
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageConfig {
    /// Name of the source file (e.g., "main.cpp")
    pub source_file: String,
    /// Compile command template (None if not needed)
    pub compile_command: Option<Vec<String>>,
    /// Run command template
    pub run_command: Vec<String>,
}

impl LanguageConfig {
    pub fn compile_spec(&self, work_dir: &Path) -> Option<CommandSpec> {
        self.compile_command
            .as_ref()
            .map(|cmd| CommandSpec::from_vec(cmd).with_work_dir(work_dir))
    }

    pub fn run_spec(&self, work_dir: &Path) -> CommandSpec {
        CommandSpec::from_vec(&self.run_command).with_work_dir(work_dir)
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    source_file: String,
    compile_command: Option<String>,
    run_command: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Global language configurations
static LANGUAGES: OnceLock<HashMap<String, LanguageConfig>> = OnceLock::new();

/// Initialize language configurations, from a TOML file if one is given
/// and from the built-in table otherwise
pub fn init_languages(path: Option<&Path>) -> anyhow::Result<()> {
    let languages = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read language config {}", path.display()))?;
            parse_languages(&content)?
        }
        None => parse_languages(BUILTIN_LANGUAGES)?,
    };

    LANGUAGES
        .set(languages)
        .map_err(|_| anyhow::anyhow!("Languages already initialized"))?;

    Ok(())
}

fn parse_languages(content: &str) -> anyhow::Result<HashMap<String, LanguageConfig>> {
    let raw_configs: HashMap<String, RawLanguageConfig> =
        toml::from_str(content).context("Invalid language configuration")?;

    let mut languages = HashMap::new();

    for (name, raw) in raw_configs {
        let run_command = into_command(&raw.run_command);
        if run_command.is_empty() {
            anyhow::bail!("Empty run command for {}", name);
        }

        let config = LanguageConfig {
            source_file: raw.source_file,
            compile_command: raw
                .compile_command
                .map(|cmd| into_command(&cmd))
                .filter(|cmd| !cmd.is_empty()),
            run_command,
        };

        // Add main language name
        languages.insert(name.to_lowercase(), config.clone());

        // Add aliases
        for alias in raw.aliases {
            languages.insert(alias.to_lowercase(), config.clone());
        }
    }

    Ok(languages)
}

fn registry() -> &'static HashMap<String, LanguageConfig> {
    LANGUAGES.get_or_init(|| {
        parse_languages(BUILTIN_LANGUAGES).unwrap_or_else(|e| {
            tracing::error!("Built-in language table is invalid: {:#}", e);
            HashMap::new()
        })
    })
}

/// Get language configuration by language name
pub fn get_language_config(language: &str) -> Option<LanguageConfig> {
    registry().get(&language.trim().to_lowercase()).cloned()
}

/// Get all supported language names
pub fn get_supported_languages() -> Vec<String> {
    let mut names: Vec<String> = registry().keys().cloned().collect();
    names.sort();
    names
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}
