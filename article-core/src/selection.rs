//! Text selection model for the toolbar engine
//!
//! Offsets are character indices into the content, matching `ropey`.

/// A caret or highlighted range in the edited text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextSelection {
    pub start: usize,
    pub end: usize,
    /// Text between `start` and `end`
    pub text: String,
}

impl TextSelection {
    /// Create a selection over `content`; reversed ranges are normalized
    pub fn new(content: &str, anchor: usize, cursor: usize) -> Self {
        Self {
            start: anchor.min(cursor),
            end: anchor.max(cursor),
            text: String::new(),
        }
        .clamp_to(content)
    }

    /// An empty selection at a single position
    pub fn caret(position: usize) -> Self {
        Self {
            start: position,
            end: position,
            text: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Clamp offsets into `content` and re-derive `text` from it
    pub fn clamp_to(&self, content: &str) -> Self {
        let len = content.chars().count();
        let start = self.start.min(self.end).min(len);
        let end = self.start.max(self.end).min(len);
        let text = content.chars().skip(start).take(end - start).collect();
        Self { start, end, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_forward_selection() {
        let sel = TextSelection::new("test content", 0, 4);
        assert_eq!((sel.start, sel.end), (0, 4));
        assert_eq!(sel.text, "test");
    }

    #[test]
    fn test_new_backward_selection() {
        let sel = TextSelection::new("test content", 12, 5);
        assert_eq!((sel.start, sel.end), (5, 12));
        assert_eq!(sel.text, "content");
    }

    #[test]
    fn test_caret() {
        let sel = TextSelection::caret(7);
        assert!(sel.is_empty());
        assert_eq!(sel.len(), 0);
    }

    #[test]
    fn test_clamp_out_of_range() {
        let sel = TextSelection {
            start: 3,
            end: 99,
            text: "stale".to_string(),
        };
        let clamped = sel.clamp_to("héllo");
        assert_eq!((clamped.start, clamped.end), (3, 5));
        assert_eq!(clamped.text, "lo");
    }
}
