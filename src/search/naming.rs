//! Page name normalization used for suggestions

/// Punctuation kept by [`clean_link`]
pub const PUNCTUATION_CHARS_ALLOWED: &str = " ()&+,-=._$";

/// Punctuation kept by [`wikify_link`]
pub const LEGACY_CHARS_ALLOWED: &str = "._";

/// Clean a link into the current page-name form.
///
/// Runs of whitespace collapse to one space, characters that are neither
/// alphanumeric nor in [`PUNCTUATION_CHARS_ALLOWED`] are dropped, and every
/// word starts with an upper-case letter.
pub fn clean_link(link: &str) -> String {
    normalize(link, PUNCTUATION_CHARS_ALLOWED)
}

/// Clean a link into the legacy CamelCase page-name form (no spaces).
pub fn wikify_link(link: &str) -> String {
    normalize(link, LEGACY_CHARS_ALLOWED)
}

fn normalize(link: &str, allowed: &str) -> String {
    let link = link.trim();
    let mut clean = String::with_capacity(link.len());
    let mut word_start = true;
    let mut last_was_space = false;

    for ch in link.chars() {
        if ch.is_whitespace() {
            if !last_was_space && allowed.contains(' ') {
                clean.push(' ');
            }
            last_was_space = true;
            word_start = true;
            continue;
        }
        last_was_space = false;

        if ch.is_alphanumeric() || allowed.contains(ch) {
            if word_start {
                clean.extend(ch.to_uppercase());
            } else {
                clean.push(ch);
            }
            word_start = false;
        } else {
            word_start = true;
        }
    }

    clean
}
