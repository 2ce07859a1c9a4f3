//! Configuration management for article

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::mode::EditorMode;
use crate::security::SecurityEvent;
use crate::shortcuts::{default_shortcuts, KeyboardShortcut};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
    pub preview: PreviewConfig,
    pub security: SecurityConfig,
    /// Replaces the default shortcut table when non-empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shortcuts: Vec<KeyboardShortcut>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Mode used when a file extension does not decide it
    pub default_mode: EditorMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub sanitize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Forces preview sanitizing on
    pub safe_mode: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { sanitize: true }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { safe_mode: true }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "article")
            .map(|proj_dirs| proj_dirs.config_dir().join("article.toml"))
    }

    /// Load configuration from file, falling back to defaults if missing.
    /// Returns the config and security events describing the effective settings.
    pub fn load() -> Result<(Self, Vec<SecurityEvent>)> {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                let config = Self::load_from(&path)?;
                let events = config.security_events(false);
                return Ok((config, events));
            }
        }

        let config = Self::default();
        let events = config.security_events(true);
        Ok((config, events))
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        // Check config file permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
            if metadata.permissions().mode() & 0o002 != 0 {
                anyhow::bail!(
                    "Config file {} is world-writable (insecure permissions)",
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.enforce_safe_mode();
        Ok(config)
    }

    fn enforce_safe_mode(&mut self) {
        if self.security.safe_mode {
            self.preview.sanitize = true;
        }
    }

    fn security_events(&self, defaults: bool) -> Vec<SecurityEvent> {
        let suffix = if defaults { " (default)" } else { "" };
        let mut events = Vec::new();
        if self.security.safe_mode {
            events.push(SecurityEvent::info(format!("Safe mode enabled{}", suffix), "config"));
        }
        if !self.preview.sanitize {
            events.push(SecurityEvent::warning(
                "Preview sanitizing disabled; previews may run scripts",
                "config",
            ));
        }
        events
    }

    /// Whether previews must be sanitized, honouring safe mode
    pub fn sanitize_preview(&self) -> bool {
        self.preview.sanitize || self.security.safe_mode
    }

    /// The configured shortcut table, or the default one
    pub fn shortcut_table(&self) -> &[KeyboardShortcut] {
        if self.shortcuts.is_empty() {
            default_shortcuts()
        } else {
            &self.shortcuts
        }
    }
}
