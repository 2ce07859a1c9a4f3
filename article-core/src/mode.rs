//! Editor modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which syntax the article content is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    Html,
    #[default]
    Markdown,
}

impl EditorMode {
    fn as_str(&self) -> &'static str {
        match self {
            EditorMode::Html => "html",
            EditorMode::Markdown => "markdown",
        }
    }

    /// Guess the mode from a file extension (`.md`, `.markdown`, `.html`, `.htm`)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(EditorMode::Markdown),
            "html" | "htm" => Some(EditorMode::Html),
            _ => None,
        }
    }
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(EditorMode::Html),
            "markdown" | "md" => Ok(EditorMode::Markdown),
            other => anyhow::bail!("Unknown editor mode: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_mode() {
        assert_eq!("html".parse::<EditorMode>().unwrap(), EditorMode::Html);
        assert_eq!("Markdown".parse::<EditorMode>().unwrap(), EditorMode::Markdown);
        assert_eq!("md".parse::<EditorMode>().unwrap(), EditorMode::Markdown);
        assert!("rtf".parse::<EditorMode>().is_err());
    }

    #[test]
    fn test_mode_from_path() {
        assert_eq!(
            EditorMode::from_path(&PathBuf::from("post.MD")),
            Some(EditorMode::Markdown)
        );
        assert_eq!(
            EditorMode::from_path(&PathBuf::from("/tmp/page.htm")),
            Some(EditorMode::Html)
        );
        assert_eq!(EditorMode::from_path(&PathBuf::from("notes.txt")), None);
        assert_eq!(EditorMode::from_path(&PathBuf::from("README")), None);
    }

    #[test]
    fn test_display_roundtrip() {
        for mode in [EditorMode::Html, EditorMode::Markdown] {
            assert_eq!(mode.to_string().parse::<EditorMode>().unwrap(), mode);
        }
    }
}
