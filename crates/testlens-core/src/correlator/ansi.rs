//! ANSI escape stripping for persisted output.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// CSI sequences (colors, cursor moves), OSC sequences (titles, hyperlinks)
/// terminated by BEL or ST, and lone two-byte escapes.
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]").unwrap()
});

/// Remove terminal escape sequences. Borrows when there is nothing to strip.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }
    ANSI_RE.replace_all(text, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_color_codes() {
        let colored = "test a ... \x1b[32mok\x1b[0m";
        assert_eq!(strip_ansi(colored), "test a ... ok");
    }

    #[test]
    fn test_strips_osc_hyperlinks() {
        let linked = "\x1b]8;;file:///src/lib.rs\x07src/lib.rs\x1b]8;;\x07";
        assert_eq!(strip_ansi(linked), "src/lib.rs");
    }

    #[test]
    fn test_borrows_plain_text() {
        assert!(matches!(strip_ansi("plain"), Cow::Borrowed("plain")));
    }
}
