//! Change-size guard for model-edited files

use similar::TextDiff;

/// Minimum similarity for an edited file to be accepted
pub const MIN_SIMILARITY: f64 = 0.5;

/// Character-level similarity ratio `2 * M / T`
///
/// `M` is the number of characters the diff keeps and `T` the total
/// character count of both texts. Two empty texts are identical.
pub fn similarity_ratio(original: &str, modified: &str) -> f64 {
    f64::from(TextDiff::from_chars(original, modified).ratio())
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines.last().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.pop();
    }
    lines.join("\n")
}
