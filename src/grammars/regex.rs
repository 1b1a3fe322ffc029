use std::fmt;
use std::sync::{Arc, OnceLock};

use onig::{RegexOptions, Region, SearchOptions, Syntax};

use crate::error::{Error, TintedResult};

/// The flags of a JS-style regex literal, eg the `gi` of `/abc/gi`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    /// `g`. Accepted but ignored: greedy patterns always search the remaining text
    pub global: bool,
    /// `i`
    pub ignore_case: bool,
    /// `m`: `^` and `$` match at line boundaries instead of the haystack boundaries
    pub multiline: bool,
    /// `s`: `.` also matches newlines
    pub dot_all: bool,
    /// `u`. Accepted but ignored, `\w`, `\d` and `\b` stay ASCII-only
    pub unicode: bool,
    /// `y`: a match has to start exactly where the search starts
    pub sticky: bool,
}

impl Flags {
    /// Unknown characters are ignored.
    pub fn parse(flags: &str) -> Self {
        let mut out = Self::default();
        for c in flags.chars() {
            match c {
                'g' => out.global = true,
                'i' => out.ignore_case = true,
                'm' => out.multiline = true,
                's' => out.dot_all = true,
                'u' => out.unicode = true,
                'y' => out.sticky = true,
                _ => {}
            }
        }
        out
    }

    fn to_options(self) -> RegexOptions {
        let mut options = RegexOptions::REGEX_OPTION_CAPTURE_GROUP;
        if self.ignore_case {
            options |= RegexOptions::REGEX_OPTION_IGNORECASE;
        }
        // Oniguruma's MULTILINE is the `s` flag of other engines
        if self.dot_all {
            options |= RegexOptions::REGEX_OPTION_MULTILINE;
        }
        if !self.multiline {
            options |= RegexOptions::REGEX_OPTION_SINGLELINE;
        }
        options
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, c) in [
            (self.global, 'g'),
            (self.ignore_case, 'i'),
            (self.multiline, 'm'),
            (self.dot_all, 's'),
            (self.unicode, 'u'),
            (self.sticky, 'y'),
        ] {
            if set {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// A match found by [`Regex::find_at`].
/// Positions are byte offsets in the searched haystack.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct RegexMatch {
    /// Start of the token, after the lookbehind prefix has been stripped
    pub from: usize,
    pub end: usize,
}

struct Inner {
    source: String,
    flags: Flags,
    compiled: OnceLock<Result<onig::Regex, String>>,
}

/// A JS-style regex that compiles lazily with Oniguruma.
///
/// Cloning is cheap and clones share the compiled regex: a regex is never mutated
/// after creation so grammars copies can keep pointing at the same one.
#[derive(Clone)]
pub struct Regex {
    inner: Arc<Inner>,
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "/{}/{}", self.inner.source, self.inner.flags)
    }
}

impl PartialEq for Regex {
    fn eq(&self, other: &Self) -> bool {
        self.inner.source == other.inner.source && self.inner.flags == other.inner.flags
    }
}

impl Eq for Regex {}

impl Regex {
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_flags(source, "")
    }

    pub fn with_flags(source: impl Into<String>, flags: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                source: source.into(),
                flags: Flags::parse(flags),
                compiled: OnceLock::new(),
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn flags(&self) -> Flags {
        self.inner.flags
    }

    pub fn compiled(&self) -> TintedResult<&onig::Regex> {
        self.inner
            .compiled
            .get_or_init(|| {
                onig::Regex::with_options(
                    &translate_source(&self.inner.source, self.inner.flags),
                    self.inner.flags.to_options(),
                    Syntax::default(),
                )
                .map_err(|e| format!("{e:?}"))
            })
            .as_ref()
            .map_err(|reason| Error::TokenizeRegex(format!("{self}: {reason}")))
    }

    /// Validate that this regex pattern compiles successfully
    pub fn validate(&self) -> TintedResult<()> {
        self.compiled().map(|_| ()).map_err(|e| Error::InvalidRegex {
            pattern: self.to_string(),
            reason: e.to_string(),
        })
    }

    /// Finds the first match starting at or after `start` whose token part is not empty.
    ///
    /// With `lookbehind`, the text of capture group 1 is excluded from the token.
    /// Matches leaving an empty token are skipped and the search resumes one
    /// character after their start so a pattern able to match the empty string
    /// can never stall the tokenizer.
    pub(crate) fn find_at(
        &self,
        haystack: &str,
        start: usize,
        lookbehind: bool,
    ) -> TintedResult<Option<RegexMatch>> {
        let regex = self.compiled()?;
        let mut search_start = start;

        while search_start <= haystack.len() {
            let mut region = Region::new();
            if regex
                .search_with_options(
                    haystack,
                    search_start,
                    haystack.len(),
                    SearchOptions::SEARCH_OPTION_NONE,
                    Some(&mut region),
                )
                .is_none()
            {
                return Ok(None);
            }
            let Some((match_start, match_end)) = region.pos(0) else {
                return Ok(None);
            };
            if self.inner.flags.sticky && match_start != start {
                return Ok(None);
            }

            let prefix_len = if lookbehind {
                region.pos(1).map_or(0, |(s, e)| e - s)
            } else {
                0
            };
            let from = (match_start + prefix_len).min(match_end);
            if from < match_end {
                return Ok(Some(RegexMatch {
                    from,
                    end: match_end,
                }));
            }

            search_start = haystack[match_start..]
                .chars()
                .next()
                .map_or(haystack.len() + 1, |c| match_start + c.len_utf8());
        }

        Ok(None)
    }
}

const WORD: &str = "a-zA-Z0-9_";
const WORD_BOUNDARY: &str =
    "(?:(?<=[a-zA-Z0-9_])(?![a-zA-Z0-9_])|(?<![a-zA-Z0-9_])(?=[a-zA-Z0-9_]))";
const NOT_WORD_BOUNDARY: &str =
    "(?:(?<=[a-zA-Z0-9_])(?=[a-zA-Z0-9_])|(?<![a-zA-Z0-9_])(?![a-zA-Z0-9_]))";

/// Rewrites the JS regex constructs Oniguruma reads differently:
/// - a bare `[` inside a character class starts a nested class in Oniguruma,
///   `[^]` matches any character and `[]` matches nothing
/// - `\w`, `\d` and `\b` only know ASCII, as JS regexes without the `u` flag
/// - without the `m` flag, `$` is the very end of the haystack, not before a final newline
fn translate_source(source: &str, flags: Flags) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    let mut in_class = false;
    let mut chars = source.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => match chars.next().map(|(_, escaped)| escaped) {
                Some('w') if in_class => out.push_str(WORD),
                Some('d') if in_class => out.push_str("0-9"),
                // nested classes are fine in Oniguruma
                Some('W') if in_class => out.push_str("[^a-zA-Z0-9_]"),
                Some('D') if in_class => out.push_str("[^0-9]"),
                Some('w') => out.push_str("[a-zA-Z0-9_]"),
                Some('W') => out.push_str("[^a-zA-Z0-9_]"),
                Some('d') => out.push_str("[0-9]"),
                Some('D') => out.push_str("[^0-9]"),
                Some('b') if !in_class => out.push_str(WORD_BOUNDARY),
                Some('B') if !in_class => out.push_str(NOT_WORD_BOUNDARY),
                Some(escaped) => {
                    out.push('\\');
                    out.push(escaped);
                }
                None => out.push('\\'),
            },
            '$' if !in_class && !flags.multiline => out.push_str("\\z"),
            '[' if in_class => out.push_str("\\["),
            '[' => {
                let after = &source[idx + 1..];
                if after.starts_with("^]") {
                    out.push_str("[\\s\\S]");
                    chars.nth(1);
                } else if after.starts_with(']') {
                    out.push_str("(?!)");
                    chars.next();
                } else {
                    in_class = true;
                    out.push('[');
                    if after.starts_with('^') {
                        out.push('^');
                        chars.next();
                    }
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_js_character_classes() {
        assert_eq!(translate_source(r"[{}[\]);,]", Flags::default()), r"[{}\[\]);,]");
        assert_eq!(translate_source(r"a[^]b", Flags::default()), r"a[\s\S]b");
        assert_eq!(translate_source(r"a[]b", Flags::default()), r"a(?!)b");
        assert_eq!(translate_source(r"[^[]", Flags::default()), r"[^\[]");
        assert_eq!(translate_source(r"\[[a-z]+]", Flags::default()), r"\[[a-z]+]");
        assert_eq!(translate_source(r"(^|[^\\])x", Flags::default()), r"(^|[^\\])x");
    }

    #[test]
    fn parses_and_displays_flags() {
        let flags = Flags::parse("gi");
        assert!(flags.global);
        assert!(flags.ignore_case);
        assert!(!flags.multiline);
        assert_eq!(Regex::with_flags("a+", "ig").to_string(), "/a+/gi");
    }

    #[test]
    fn clones_share_compilation_and_compare_by_source() {
        let re = Regex::with_flags("abc", "i");
        let cloned = re.clone();
        assert!(Arc::ptr_eq(&re.inner, &cloned.inner));
        assert_eq!(re, Regex::with_flags("abc", "i"));
        assert_ne!(re, Regex::new("abc"));
    }

    #[test]
    fn reports_invalid_patterns() {
        let re = Regex::new("(unclosed");
        assert!(matches!(re.validate(), Err(Error::InvalidRegex { .. })));
        assert!(matches!(re.find_at("x", 0, false), Err(Error::TokenizeRegex(_))));
    }

    #[test]
    fn finds_from_offset() {
        let re = Regex::new("b+");
        assert_eq!(
            re.find_at("abba bb", 3, false).unwrap(),
            Some(RegexMatch { from: 5, end: 7 })
        );
    }

    #[test]
    fn ignore_case_flag() {
        let re = Regex::with_flags("null", "i");
        assert_eq!(
            re.find_at("x NULL", 0, false).unwrap(),
            Some(RegexMatch { from: 2, end: 6 })
        );
    }

    #[test]
    fn anchors_follow_the_multiline_flag() {
        assert_eq!(Regex::new("^a").find_at("ba", 1, false).unwrap(), None);
        assert_eq!(Regex::new("^a").find_at("b\na", 0, false).unwrap(), None);
        assert_eq!(
            Regex::with_flags("^a", "m").find_at("b\na", 0, false).unwrap(),
            Some(RegexMatch { from: 2, end: 3 })
        );
    }

    #[test]
    fn dollar_is_the_very_end_without_multiline() {
        assert_eq!(Regex::new("a$").find_at("a\n", 0, false).unwrap(), None);
        assert_eq!(
            Regex::new("a$").find_at("ba", 0, false).unwrap(),
            Some(RegexMatch { from: 1, end: 2 })
        );
        assert_eq!(
            Regex::with_flags("a$", "m").find_at("a\nb", 0, false).unwrap(),
            Some(RegexMatch { from: 0, end: 1 })
        );
        // escaped or inside a class it is a plain dollar
        assert_eq!(
            Regex::new(r"\$[$]").find_at("x$$", 0, false).unwrap(),
            Some(RegexMatch { from: 1, end: 3 })
        );
    }

    #[test]
    fn word_classes_are_ascii_only() {
        assert_eq!(
            Regex::new(r"\w+").find_at("héllo", 0, false).unwrap(),
            Some(RegexMatch { from: 0, end: 1 })
        );
        assert_eq!(
            Regex::new(r"\bnull\b").find_at("énull", 0, false).unwrap(),
            Some(RegexMatch { from: 2, end: 6 })
        );
        assert_eq!(Regex::new(r"\d").find_at("٣", 0, false).unwrap(), None);
        assert_eq!(
            Regex::new(r"[^\w]").find_at("aé", 0, false).unwrap(),
            Some(RegexMatch { from: 1, end: 3 })
        );
        assert_eq!(
            Regex::new(r"x\B").find_at("x xy", 0, false).unwrap(),
            Some(RegexMatch { from: 2, end: 3 })
        );
        assert_eq!(
            translate_source(r"[\dA-F]\W", Flags::default()),
            r"[0-9A-F][^a-zA-Z0-9_]"
        );
    }

    #[test]
    fn sticky_flag_requires_match_at_start() {
        let re = Regex::with_flags("b", "y");
        assert_eq!(re.find_at("ab", 0, false).unwrap(), None);
        assert_eq!(
            re.find_at("ab", 1, false).unwrap(),
            Some(RegexMatch { from: 1, end: 2 })
        );
    }

    #[test]
    fn strips_lookbehind_group() {
        let re = Regex::new(r#"(^|[^\\])(["'])"#);
        assert_eq!(
            re.find_at("a\"x\"", 0, true).unwrap(),
            Some(RegexMatch { from: 1, end: 2 })
        );
        // without lookbehind the prefix is part of the match
        assert_eq!(
            re.find_at("a\"x\"", 0, false).unwrap(),
            Some(RegexMatch { from: 0, end: 2 })
        );
    }

    #[test]
    fn skips_empty_matches() {
        let re = Regex::new("x*");
        assert_eq!(re.find_at("abc", 0, false).unwrap(), None);
        assert_eq!(
            re.find_at("axxb", 0, false).unwrap(),
            Some(RegexMatch { from: 1, end: 3 })
        );
        // multi-byte characters are stepped over as a whole
        assert_eq!(
            re.find_at("éx", 0, false).unwrap(),
            Some(RegexMatch { from: 2, end: 3 })
        );
    }

    #[test]
    fn skips_matches_that_are_only_lookbehind() {
        // group 1 eats the whole match the first time around
        let re = Regex::new("(a)b?");
        assert_eq!(
            re.find_at("a ab", 0, true).unwrap(),
            Some(RegexMatch { from: 3, end: 4 })
        );
    }
}
