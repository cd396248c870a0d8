//! Title cleaning for TOC entries
//!
//! Link text is reduced to a safe display string: letters (including CJK
//! ideographs), digits, and `. , ? !`. Runs of whitespace collapse into a
//! single `-` separator.

const SAFE_PUNCTUATION: &[char] = &['.', ',', '?', '!'];
const SEPARATOR: &str = "-";

/// Returns true if the character may appear in a cleaned title
pub fn is_safe_char(c: char) -> bool {
    c.is_alphanumeric() || SAFE_PUNCTUATION.contains(&c)
}

/// Cleans raw link text into a title
///
/// # Examples
///
/// ```
/// use sumi_binder::toc::clean_title;
///
/// assert_eq!(clean_title("  Hello,   World!  "), "Hello,-World!");
/// assert_eq!(clean_title("《科技爱好者周刊》第 300 期"), "科技爱好者周刊第-300-期");
/// ```
pub fn clean_title(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| word.chars().filter(|c| is_safe_char(*c)).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Title used when link text cleans down to nothing
pub fn fallback_title(content_key: &str) -> String {
    let prefix: String = content_key.chars().take(8).collect();
    format!("entry-{}", prefix)
}
