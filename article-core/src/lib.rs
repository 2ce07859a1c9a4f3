//! Article Core - Markdown/HTML content engine
//!
//! This crate contains the article editing logic, independent of any editor surface:
//! - Markdown to HTML block parser and HTML to Markdown transcoder
//! - Inline span transcoding and the HTML entity table
//! - Denylist HTML sanitizer for previews
//! - Selection-aware toolbar actions and keyboard shortcuts
//! - Article document model and configuration

pub mod actions;
pub mod block;
pub mod config;
pub mod convert;
pub mod doc;
pub mod entities;
pub mod html;
pub mod inline;
pub mod markdown;
pub mod mode;
pub mod sanitize;
pub mod security;
pub mod selection;
pub mod shortcuts;
pub mod toc;

// Re-export commonly used types
pub use actions::{
    apply_named_toolbar_action, apply_toolbar_action, ToolbarAction, ToolbarActionResult,
    ToolbarOptions,
};
pub use config::Config;
pub use convert::{
    convert_content, get_preview_html, html_to_markdown, markdown_to_html, safe_preview_html,
};
pub use doc::Article;
pub use mode::EditorMode;
pub use sanitize::{sanitize_html, sanitize_html_with_report};
pub use security::{SecurityEvent, SecurityEventLevel};
pub use selection::TextSelection;
pub use shortcuts::{
    default_shortcuts, get_action_from_keyboard, matches_shortcut, KeyEvent, KeyboardShortcut,
};
