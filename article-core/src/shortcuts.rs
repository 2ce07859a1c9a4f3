//! Keyboard shortcut matching
//!
//! A shortcut's `ctrl` flag is satisfied by either Ctrl or the platform
//! Meta (Cmd) key. `shift` and `alt` must match the event exactly.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::actions::ToolbarAction;

/// A key press as reported by the editing surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// One entry of a shortcut table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardShortcut {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    pub action: ToolbarAction,
}

impl KeyboardShortcut {
    fn ctrl(key: &str, action: ToolbarAction) -> Self {
        Self {
            key: key.to_string(),
            ctrl: true,
            shift: false,
            alt: false,
            action,
        }
    }

    fn ctrl_alt(key: &str, action: ToolbarAction) -> Self {
        Self {
            alt: true,
            ..Self::ctrl(key, action)
        }
    }
}

/// Built-in shortcut table
pub fn default_shortcuts() -> &'static [KeyboardShortcut] {
    static DEFAULTS: OnceLock<Vec<KeyboardShortcut>> = OnceLock::new();
    DEFAULTS.get_or_init(|| {
        vec![
            KeyboardShortcut::ctrl("b", ToolbarAction::Bold),
            KeyboardShortcut::ctrl("i", ToolbarAction::Italic),
            KeyboardShortcut::ctrl("u", ToolbarAction::Underline),
            KeyboardShortcut::ctrl("k", ToolbarAction::Link),
            KeyboardShortcut::ctrl_alt("1", ToolbarAction::H1),
            KeyboardShortcut::ctrl_alt("2", ToolbarAction::H2),
            KeyboardShortcut::ctrl_alt("3", ToolbarAction::H3),
        ]
    })
}

pub fn matches_shortcut(event: &KeyEvent, shortcut: &KeyboardShortcut) -> bool {
    event.key.eq_ignore_ascii_case(&shortcut.key)
        && shortcut.ctrl == (event.ctrl || event.meta)
        && shortcut.shift == event.shift
        && shortcut.alt == event.alt
}

/// First matching action in `table`, or in the default table when `None`
pub fn get_action_from_keyboard(
    event: &KeyEvent,
    table: Option<&[KeyboardShortcut]>,
) -> Option<ToolbarAction> {
    table
        .unwrap_or_else(|| default_shortcuts())
        .iter()
        .find(|shortcut| matches_shortcut(event, shortcut))
        .map(|shortcut| shortcut.action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_for(shortcut: &KeyboardShortcut) -> KeyEvent {
        let mut event = KeyEvent::new(shortcut.key.clone());
        event.ctrl = shortcut.ctrl;
        event.shift = shortcut.shift;
        event.alt = shortcut.alt;
        event
    }

    #[test]
    fn test_every_default_resolves() {
        for shortcut in default_shortcuts() {
            let event = event_for(shortcut);
            assert_eq!(get_action_from_keyboard(&event, None), Some(shortcut.action));
        }
    }

    #[test]
    fn test_key_is_case_insensitive() {
        let event = KeyEvent::new("B").with_ctrl();
        assert_eq!(get_action_from_keyboard(&event, None), Some(ToolbarAction::Bold));
    }

    #[test]
    fn test_meta_counts_as_ctrl() {
        let event = KeyEvent::new("i").with_meta();
        assert_eq!(get_action_from_keyboard(&event, None), Some(ToolbarAction::Italic));
    }

    #[test]
    fn test_modifiers_must_match_exactly() {
        assert_eq!(get_action_from_keyboard(&KeyEvent::new("b"), None), None);
        let event = KeyEvent::new("b").with_ctrl().with_shift();
        assert_eq!(get_action_from_keyboard(&event, None), None);
        let event = KeyEvent::new("1").with_ctrl();
        assert_eq!(get_action_from_keyboard(&event, None), None);
        let event = KeyEvent::new("1").with_ctrl().with_alt();
        assert_eq!(get_action_from_keyboard(&event, None), Some(ToolbarAction::H1));
    }

    #[test]
    fn test_unknown_key() {
        let event = KeyEvent::new("q").with_ctrl();
        assert_eq!(get_action_from_keyboard(&event, None), None);
    }

    #[test]
    fn test_custom_table_first_match_wins() {
        let table = vec![
            KeyboardShortcut {
                key: "e".to_string(),
                ctrl: true,
                shift: true,
                alt: false,
                action: ToolbarAction::Code,
            },
            KeyboardShortcut {
                key: "E".to_string(),
                ctrl: true,
                shift: true,
                alt: false,
                action: ToolbarAction::CodeBlock,
            },
        ];
        let event = KeyEvent::new("e").with_ctrl().with_shift();
        assert_eq!(
            get_action_from_keyboard(&event, Some(&table)),
            Some(ToolbarAction::Code)
        );
        let bold = KeyEvent::new("b").with_ctrl();
        assert_eq!(get_action_from_keyboard(&bold, Some(&table)), None);
    }

    #[test]
    fn test_deserialize_shortcut() -> anyhow::Result<()> {
        let shortcut: KeyboardShortcut = toml::from_str("key = \"h\"\nctrl = true\naction = \"hr\"")?;
        assert_eq!(shortcut.action, ToolbarAction::Hr);
        assert!(shortcut.ctrl);
        assert!(!shortcut.shift && !shortcut.alt);
        Ok(())
    }
}
