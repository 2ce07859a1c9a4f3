//! Findings reported by the sanitizer and by configuration loading

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityEventLevel {
    /// Effective settings, nothing was changed
    Info,
    /// Something unsafe was found and neutralized, or protection is off
    Warning,
}

impl SecurityEventLevel {
    fn as_str(self) -> &'static str {
        match self {
            SecurityEventLevel::Info => "info",
            SecurityEventLevel::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub level: SecurityEventLevel,
    pub message: String,
    /// "config" or "sanitizer"
    pub source: String,
}

impl SecurityEvent {
    fn with_level(
        level: SecurityEventLevel,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn info(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::with_level(SecurityEventLevel::Info, message, source)
    }

    pub fn warning(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::with_level(SecurityEventLevel::Warning, message, source)
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level.as_str(), self.source, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitizer_finding() {
        let event = SecurityEvent::warning("Removed <script> element", "sanitizer");
        assert_eq!(event.level, SecurityEventLevel::Warning);
        assert_eq!(event.message, "Removed <script> element");
        assert_eq!(event.source, "sanitizer");
        assert!(SecurityEventLevel::Info < event.level);
    }

    #[test]
    fn test_display() {
        let event = SecurityEvent::info("Safe mode enabled", "config");
        assert_eq!(event.to_string(), "[info] config: Safe mode enabled");
        let event = SecurityEvent::warning("Removed onclick", "sanitizer");
        assert_eq!(event.to_string(), "[warning] sanitizer: Removed onclick");
    }
}
