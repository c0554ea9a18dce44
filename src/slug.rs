//! Slug derivation for startup titles.
//!
//! Matches the store's slug conventions: lower-cased and strict, so
//! any character outside `[a-z0-9]` is dropped or folded into a single
//! `-`. Common accented Latin letters fold to their ASCII base first;
//! anything else non-ASCII is removed.

use regex::Regex;
use std::sync::OnceLock;

fn strip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s-]").expect("valid strip pattern"))
}

fn collapse_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s-]+").expect("valid collapse pattern"))
}

/// ASCII folding for the Latin accents that show up in titles, so
/// "Café" slugs as "cafe" rather than "caf". Input is already
/// lower-cased; anything not listed falls through to the strip pass.
fn fold_ascii(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => "i",
        'ñ' | 'ń' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => "u",
        'ý' | 'ÿ' => "y",
        'ś' | 'š' => "s",
        'ź' | 'ż' | 'ž' => "z",
        'ł' => "l",
        'ð' | 'đ' => "d",
        'þ' => "th",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

/// Derive the strict, lower-cased slug of `title`.
pub fn slugify(title: &str) -> String {
    let mut lowered = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        match fold_ascii(c) {
            Some(folded) => lowered.push_str(folded),
            None => lowered.push(c),
        }
    }
    let stripped = strip_re().replace_all(&lowered, "");
    let collapsed = collapse_re().replace_all(stripped.trim(), "-");
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_lowercases() {
        assert_eq!(slugify("My Cool Idea!"), "my-cool-idea");
        assert_eq!(slugify("We Robots"), "we-robots");
    }

    #[test]
    fn collapses_whitespace_and_hyphen_runs() {
        assert_eq!(slugify("a   b"), "a-b");
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("  padded  "), "padded");
    }

    #[test]
    fn folds_common_accents_to_ascii() {
        assert_eq!(slugify("Café Rocket"), "cafe-rocket");
        assert_eq!(slugify("Über Œuvre"), "uber-oeuvre");
        assert_eq!(slugify("Straße Neun"), "strasse-neun");
    }

    #[test]
    fn unfoldable_characters_are_dropped() {
        assert_eq!(slugify("日本 Robotics"), "robotics");
    }

    #[test]
    fn degenerate_titles_produce_empty_slug() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }
}
