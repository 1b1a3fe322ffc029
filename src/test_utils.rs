use crate::tokenizer::{Fragment, TokenContent, fragments_text};

/// Compact one-line form of a fragment sequence: raw text is debug-quoted and tokens are
/// written `type[alias,...](content)`, nested content as a bracketed list.
pub(crate) fn format_fragments(fragments: &[Fragment]) -> String {
    let items: Vec<String> = fragments
        .iter()
        .map(|fragment| match fragment {
            Fragment::Raw(text) => format!("{text:?}"),
            Fragment::Token(token) => {
                let alias = if token.alias.is_empty() {
                    String::new()
                } else {
                    format!("[{}]", token.alias.join(","))
                };
                let content = match &token.content {
                    TokenContent::Text(text) => format!("{text:?}"),
                    TokenContent::Nested(inner) => format_fragments(inner),
                };
                format!("{}{alias}({content})", token.kind)
            }
        })
        .collect();
    format!("[{}]", items.join(", "))
}

/// Checks that `fragments` covers `text` exactly, at every nesting level.
pub(crate) fn assert_conserved(fragments: &[Fragment], text: &str) {
    assert_eq!(fragments_text(fragments), text);
    assert_eq!(fragments.iter().map(Fragment::len).sum::<usize>(), text.len());

    for fragment in fragments {
        match fragment {
            Fragment::Raw(raw) => assert!(!raw.is_empty(), "empty raw fragment in {fragments:?}"),
            Fragment::Token(token) => {
                assert!(token.length > 0, "empty token in {fragments:?}");
                if let TokenContent::Nested(inner) = &token.content {
                    assert_conserved(inner, &token.text());
                }
            }
        }
    }
}
