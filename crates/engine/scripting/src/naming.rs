//! Identifier case conversion between script and native conventions

/// Convert a snake_case identifier to CamelCase.
///
/// Underscores and spaces separate words and are dropped. The first
/// character of every word is upper-cased and the rest of the word is left
/// alone. Other whitespace starts a new word but is kept. A leading
/// lowercase letter is upper-cased even without underscores (`alreadyCamel`
/// becomes `AlreadyCamel`).
pub fn to_camel(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len());
    let mut word_start = true;

    for ch in identifier.chars() {
        if ch == '_' || ch == ' ' {
            word_start = true;
        } else if ch.is_whitespace() {
            out.push(ch);
            word_start = true;
        } else if word_start {
            out.extend(ch.to_uppercase());
            word_start = false;
        } else {
            out.push(ch);
        }
    }

    out
}
