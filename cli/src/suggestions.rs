pub const DEFAULT_SUGGESTIONS: [&str; 3] = [
    "Are there any visual defects in this image?",
    "Is this image of a used product or new?",
    "If text is present, is it readable?",
];

/// Canned questions offered until each one is used
#[derive(Debug, Clone)]
pub struct Suggestions {
    remaining: Vec<String>,
}

impl Default for Suggestions {
    fn default() -> Self {
        Self {
            remaining: DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Suggestions {
    pub fn list(&self) -> &[String] {
        &self.remaining
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Removes and returns suggestion `number` (1-based).
    pub fn take(&mut self, number: usize) -> Option<String> {
        if number == 0 || number > self.remaining.len() {
            return None;
        }
        Some(self.remaining.remove(number - 1))
    }

    /// Drops a suggestion the user typed out by hand.
    pub fn mark_used(&mut self, question: &str) {
        self.remaining.retain(|s| s != question.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_removes_suggestion() {
        let mut suggestions = Suggestions::default();
        assert_eq!(suggestions.list().len(), 3);

        let taken = suggestions.take(2).unwrap();
        assert_eq!(taken, DEFAULT_SUGGESTIONS[1]);
        assert_eq!(
            suggestions.list(),
            &[DEFAULT_SUGGESTIONS[0].to_string(), DEFAULT_SUGGESTIONS[2].to_string()]
        );
    }

    #[test]
    fn test_out_of_range_take() {
        let mut suggestions = Suggestions::default();
        assert_eq!(suggestions.take(0), None);
        assert_eq!(suggestions.take(4), None);
        assert_eq!(suggestions.list().len(), 3);
    }

    #[test]
    fn test_typed_suggestion_is_marked_used() {
        let mut suggestions = Suggestions::default();
        suggestions.mark_used(&format!("  {}  ", DEFAULT_SUGGESTIONS[0]));
        suggestions.mark_used("something else");

        assert_eq!(suggestions.list().len(), 2);
        while suggestions.take(1).is_some() {}
        assert!(suggestions.is_empty());
    }
}
