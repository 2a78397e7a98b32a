//! Per-file truncation
//!
//! Long files keep their beginning and their end, which is where imports,
//! exports and entry points usually live, with an explicit marker in
//! between so the model knows content is missing.

use std::borrow::Cow;

/// Truncation limits for one file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Truncation {
    /// Characters kept in total (head plus tail)
    pub max_chars: usize,

    /// Share of `max_chars` taken from the start
    pub head_ratio: f64,
}

impl Default for Truncation {
    fn default() -> Self {
        Self {
            max_chars: 20_000,
            head_ratio: 0.6,
        }
    }
}

impl Truncation {
    /// Shorten `content` to at most `max_chars` characters plus the marker.
    ///
    /// Content within the limit is returned unchanged and unallocated.
    /// Cuts always land on character boundaries.
    pub fn apply<'a>(&self, content: &'a str) -> Cow<'a, str> {
        let total = content.chars().count();
        if total <= self.max_chars {
            return Cow::Borrowed(content);
        }

        let head_chars = (self.max_chars as f64 * self.head_ratio).floor() as usize;
        let head_chars = head_chars.min(self.max_chars);
        let tail_chars = self.max_chars - head_chars;
        let omitted = total - self.max_chars;

        let head_end = byte_offset(content, head_chars);
        let tail_start = byte_offset(content, total - tail_chars);

        Cow::Owned(format!(
            "{}\n\n[... content truncated, {} characters omitted ...]\n\n{}",
            &content[..head_end],
            omitted,
            &content[tail_start..]
        ))
    }
}

/// Byte offset of the `n`th character (or the end of the string)
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_is_borrowed() {
        let truncation = Truncation {
            max_chars: 10,
            head_ratio: 0.6,
        };
        assert!(matches!(truncation.apply("short"), Cow::Borrowed("short")));
        assert!(matches!(
            truncation.apply("exactly10!"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_keeps_head_and_tail() {
        let truncation = Truncation {
            max_chars: 10,
            head_ratio: 0.6,
        };
        let content = "abcdefghijklmnopqrstuvwxyz";
        let result = truncation.apply(content);

        assert!(result.starts_with("abcdef\n"));
        assert!(result.ends_with("\nwxyz"));
        assert!(result.contains("[... content truncated, 16 characters omitted ...]"));
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let truncation = Truncation {
            max_chars: 4,
            head_ratio: 0.5,
        };
        let content = "ééééàààà";
        let result = truncation.apply(content);

        assert!(result.starts_with("éé\n"));
        assert!(result.ends_with("\nàà"));
        assert!(result.contains("4 characters omitted"));
    }
}
