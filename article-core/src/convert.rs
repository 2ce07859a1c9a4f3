//! Mode conversion and preview rendering

use log::debug;

use crate::mode::EditorMode;
use crate::sanitize::sanitize_html;

pub use crate::block::markdown_to_html;
pub use crate::markdown::html_to_markdown;

/// Convert content between modes; identity when the modes are equal
pub fn convert_content(content: &str, from: EditorMode, to: EditorMode) -> String {
    if from == to {
        return content.to_string();
    }
    debug!("converting {} chars from {} to {}", content.len(), from, to);
    match to {
        EditorMode::Html => markdown_to_html(content),
        EditorMode::Markdown => html_to_markdown(content),
    }
}

/// HTML to show in a preview; HTML content is returned as-is
pub fn get_preview_html(content: &str, mode: EditorMode) -> String {
    match mode {
        EditorMode::Html => content.to_string(),
        EditorMode::Markdown => markdown_to_html(content),
    }
}

/// Preview HTML with executable constructs removed
pub fn safe_preview_html(content: &str, mode: EditorMode) -> String {
    sanitize_html(&get_preview_html(content, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_mode_is_identity() {
        for content in ["", "# x\n\n<b>y</b>", "<p>a</p>"] {
            for mode in [EditorMode::Html, EditorMode::Markdown] {
                assert_eq!(convert_content(content, mode, mode), content);
            }
        }
    }

    #[test]
    fn test_convert_between_modes() {
        assert_eq!(
            convert_content("**bold**", EditorMode::Markdown, EditorMode::Html),
            "<p><strong>bold</strong></p>"
        );
        assert_eq!(
            convert_content("<strong>bold</strong>", EditorMode::Html, EditorMode::Markdown),
            "**bold**"
        );
    }

    #[test]
    fn test_preview_html_mode_is_passthrough() {
        let html = "<p onclick=\"x()\">hi</p>";
        assert_eq!(get_preview_html(html, EditorMode::Html), html);
        assert_eq!(safe_preview_html(html, EditorMode::Html), "<p>hi</p>");
    }

    #[test]
    fn test_safe_preview_markdown() {
        let out = safe_preview_html("[x](javascript:alert(1))", EditorMode::Markdown);
        assert!(!out.contains("javascript:"));
        assert!(out.contains("href=\"#\""));
    }
}
