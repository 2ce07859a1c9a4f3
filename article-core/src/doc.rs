//! Article document model with Rope-based text storage

use anyhow::{Context, Result};
use log::debug;
use ropey::Rope;
use std::fs;
use std::path::{Path, PathBuf};

use crate::actions::{apply_toolbar_action, ToolbarAction, ToolbarActionResult, ToolbarOptions};
use crate::convert::{convert_content, get_preview_html, html_to_markdown};
use crate::mode::EditorMode;
use crate::sanitize::sanitize_html;
use crate::selection::TextSelection;
use crate::shortcuts::{get_action_from_keyboard, KeyEvent, KeyboardShortcut};
use crate::toc::{self, Heading};

/// An article being edited
#[derive(Clone, Debug)]
pub struct Article {
    /// Source file, if the article was loaded from disk
    pub path: Option<PathBuf>,
    pub rope: Rope,
    pub mode: EditorMode,
    pub selection: TextSelection,
    /// Bumped on every change to the content
    pub rev: u64,
}

impl Article {
    pub fn new(content: &str, mode: EditorMode) -> Self {
        Self {
            path: None,
            rope: Rope::from_str(content),
            mode,
            selection: TextSelection::caret(0),
            rev: 1,
        }
    }

    /// Load an article, inferring the mode from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_mode(path, EditorMode::default())
    }

    /// Load an article; `fallback` is used when the extension says nothing
    pub fn load_with_mode(path: &Path, fallback: EditorMode) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let mode = EditorMode::from_path(path).unwrap_or(fallback);
        debug!("loaded {} as {}", path.display(), mode);

        let mut article = Self::new(&content, mode);
        article.path = Some(path.to_path_buf());
        Ok(article)
    }

    /// Reload the article from disk, keeping mode and a clamped selection
    pub fn reload(&mut self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .context("Article has no source file to reload")?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to reload file: {}", path.display()))?;

        self.rope = Rope::from_str(&content);
        self.selection = self.selection.clamp_to(&content);
        self.rev += 1;
        Ok(())
    }

    pub fn content(&self) -> String {
        self.rope.to_string()
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Select `anchor..cursor` (character offsets, either order)
    pub fn select(&mut self, anchor: usize, cursor: usize) {
        self.selection = TextSelection::new(&self.content(), anchor, cursor);
    }

    /// Run a toolbar action against the current selection and adopt the result
    pub fn apply(
        &mut self,
        action: ToolbarAction,
        url: Option<&str>,
        alt: Option<&str>,
    ) -> ToolbarActionResult {
        let content = self.content();
        let result = apply_toolbar_action(&ToolbarOptions {
            content: &content,
            selection: self.selection.clone(),
            mode: self.mode,
            action,
            url,
            alt,
        });
        self.set_content(&result.new_content);
        self.select(result.new_selection_start, result.new_selection_end);
        result
    }

    /// Resolve a key press through `table` (default table when `None`) and apply it
    pub fn apply_shortcut(
        &mut self,
        event: &KeyEvent,
        table: Option<&[KeyboardShortcut]>,
    ) -> Option<ToolbarAction> {
        let action = get_action_from_keyboard(event, table)?;
        self.apply(action, None, None);
        Some(action)
    }

    /// Convert the content to another mode; the caret moves to the end
    pub fn switch_mode(&mut self, mode: EditorMode) {
        if mode == self.mode {
            return;
        }
        let converted = convert_content(&self.content(), self.mode, mode);
        self.mode = mode;
        self.set_content(&converted);
        self.selection = TextSelection::caret(self.rope.len_chars());
    }

    pub fn preview_html(&self, sanitize: bool) -> String {
        let html = get_preview_html(&self.content(), self.mode);
        if sanitize {
            sanitize_html(&html)
        } else {
            html
        }
    }

    /// Headings of the article; HTML content is read through its Markdown form
    pub fn headings(&self) -> Vec<Heading> {
        match self.mode {
            EditorMode::Markdown => toc::extract_headings(&self.rope),
            EditorMode::Html => {
                let markdown = html_to_markdown(&self.content());
                toc::extract_headings(&Rope::from_str(&markdown))
            }
        }
    }

    fn set_content(&mut self, content: &str) {
        self.rope = Rope::from_str(content);
        self.rev += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_load_infers_mode() -> Result<()> {
        let mut file = Builder::new().suffix(".html").tempfile()?;
        file.write_all(b"<h1>Title</h1>")?;

        let article = Article::load(file.path())?;
        assert_eq!(article.mode, EditorMode::Html);
        assert_eq!(article.rev, 1);
        assert_eq!(article.path.as_deref(), Some(file.path()));
        Ok(())
    }

    #[test]
    fn test_load_unknown_extension_uses_fallback() -> Result<()> {
        let mut file = Builder::new().suffix(".txt").tempfile()?;
        file.write_all(b"# Title\n")?;

        assert_eq!(Article::load(file.path())?.mode, EditorMode::Markdown);
        let article = Article::load_with_mode(file.path(), EditorMode::Html)?;
        assert_eq!(article.mode, EditorMode::Html);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(Article::load(Path::new("/nonexistent/article.md")).is_err());
    }

    #[test]
    fn test_reload_increments_revision() -> Result<()> {
        let mut file = Builder::new().suffix(".md").tempfile()?;
        file.write_all(b"Initial content\n")?;
        file.flush()?;

        let mut article = Article::load(file.path())?;
        article.select(0, 100);
        file.write_all(b"More\n")?;
        file.flush()?;

        article.reload()?;
        assert_eq!(article.rev, 2);
        assert_eq!(article.content(), "Initial content\nMore\n");
        assert_eq!(article.selection.end, 16);
        Ok(())
    }

    #[test]
    fn test_apply_adopts_result() {
        let mut article = Article::new("test content", EditorMode::Html);
        article.select(0, 4);
        let result = article.apply(ToolbarAction::Bold, None, None);

        assert_eq!(article.content(), "<strong>test</strong> content");
        assert_eq!(article.selection.start, result.new_selection_start);
        assert_eq!(article.selection.text, "test");
        assert_eq!(article.rev, 2);
    }

    #[test]
    fn test_apply_shortcut() {
        let mut article = Article::new("word", EditorMode::Markdown);
        article.select(0, 4);

        let action = article.apply_shortcut(&KeyEvent::new("i").with_meta(), None);
        assert_eq!(action, Some(ToolbarAction::Italic));
        assert_eq!(article.content(), "*word*");

        let none = article.apply_shortcut(&KeyEvent::new("z").with_ctrl(), None);
        assert_eq!(none, None);
        assert_eq!(article.content(), "*word*");
    }

    #[test]
    fn test_switch_mode_converts_and_moves_caret() {
        let mut article = Article::new("# Title\n\nSome **bold** text", EditorMode::Markdown);
        article.switch_mode(EditorMode::Html);

        let content = article.content();
        assert_eq!(article.mode, EditorMode::Html);
        assert!(content.contains("<h1"));
        assert!(content.contains("<strong>bold</strong>"));
        assert!(article.selection.is_empty());
        assert_eq!(article.selection.start, article.rope.len_chars());

        let rev = article.rev;
        article.switch_mode(EditorMode::Html);
        assert_eq!(article.rev, rev);
    }

    #[test]
    fn test_preview_html() {
        let article = Article::new("[x](javascript:void)", EditorMode::Markdown);
        assert!(article.preview_html(false).contains("javascript:"));
        assert!(!article.preview_html(true).contains("javascript:"));
    }

    #[test]
    fn test_headings_in_both_modes() {
        let markdown = Article::new("# One\n\n## Two\n", EditorMode::Markdown);
        let html = Article::new("<h1>One</h1><h2>Two</h2>", EditorMode::Html);

        for article in [markdown, html] {
            let headings = article.headings();
            assert_eq!(headings.len(), 2);
            assert_eq!(headings[0].text, "One");
            assert_eq!(headings[1].level, 2);
            assert_eq!(headings[1].anchor, "two");
        }
    }
}
