//! Terminal output formatting helpers.

/// Render a URL with the ANSI underline attribute for terminals that show it.
///
/// The escape sequence degrades to the bare text on dumb terminals, so the
/// result is safe to write unconditionally.
pub fn with_link_format(url: &str) -> String {
    format!("\u{1b}[4m{url}\u{1b}[0m")
}
