//! The matcher: turns a text into a sequence of raw text and tokens by applying the
//! patterns of a grammar in priority order.

use crate::error::TintedResult;
use crate::grammars::{Grammar, GrammarId, GrammarValue, PatternSpec, REST_KEY};

mod token;

pub use token::{Fragment, Token, TokenContent, fragments_text};

/// A grammar entry ready for matching
type Entry<'g> = (&'g str, &'g PatternSpec);

/// Where a match lands in the fragment sequence, all positions absolute in the text
#[derive(Debug, Clone, Copy)]
struct Span {
    /// Start of the token
    from: usize,
    /// End of the token
    to: usize,
    /// End of the replaced fragments
    end: usize,
    /// How many fragments get replaced
    removed: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Tokenizer<'g> {
    /// All the grammars in the registry
    grammars: &'g [Grammar],
}

impl<'g> Tokenizer<'g> {
    pub fn new(grammars: &'g [Grammar]) -> Self {
        Self { grammars }
    }

    pub fn tokenize(&self, text: &str, grammar: GrammarId) -> TintedResult<Vec<Fragment>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.resolve_entries(grammar);
        let mut fragments = vec![Fragment::Raw(text.to_string())];
        self.match_grammar(text, &mut fragments, &entries, 0, 0, false, None)?;
        Ok(fragments)
    }

    /// The entries of a grammar with its `rest` grammar merged in: entries of `rest`
    /// replace same-named entries in place and the others are appended.
    fn resolve_entries(&self, id: GrammarId) -> Vec<Entry<'g>> {
        let grammars = self.grammars;
        let grammar = &grammars[id.as_index()];
        let mut entries: Vec<(&'g str, &'g GrammarValue)> = grammar
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();

        if let Some(GrammarValue::Grammar(rest)) = grammar.get(REST_KEY) {
            for (key, value) in &grammars[rest.as_index()].entries {
                match entries.iter_mut().find(|(k, _)| *k == key.as_str()) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key.as_str(), value)),
                }
            }
            entries.retain(|(k, _)| *k != REST_KEY);
        }

        entries
            .into_iter()
            .filter_map(|(k, v)| match v {
                GrammarValue::Patterns(spec) => Some((k, spec)),
                GrammarValue::Grammar(_) => None,
            })
            .collect()
    }

    /// Applies `entries` in order to the raw fragments from `index` onwards, `start_pos`
    /// being the text offset of `fragments[index]`.
    ///
    /// With `one_shot`, each pattern stops after its first match. Matching stops entirely
    /// when reaching the entry named `target`: after a greedy match replaced several
    /// fragments, only the types declared before it get a chance at the leftover text.
    #[allow(clippy::too_many_arguments)]
    fn match_grammar(
        &self,
        text: &str,
        fragments: &mut Vec<Fragment>,
        entries: &[Entry<'g>],
        index: usize,
        start_pos: usize,
        one_shot: bool,
        target: Option<&str>,
    ) -> TintedResult<()> {
        for &(token_type, spec) in entries {
            if target == Some(token_type) {
                return Ok(());
            }

            for descriptor in spec.descriptors() {
                let mut i = index;
                let mut pos = start_pos;

                while i < fragments.len() {
                    if fragments.len() > text.len() {
                        return Ok(());
                    }
                    if fragments[i].is_token() {
                        pos += fragments[i].len();
                        i += 1;
                        continue;
                    }

                    let found = if descriptor.greedy && i != fragments.len() - 1 {
                        let Some(m) =
                            descriptor
                                .pattern
                                .find_at(text, pos, descriptor.lookbehind)?
                        else {
                            break;
                        };

                        // Extend over every fragment the match touches. A raw fragment
                        // following a non-greedy token is taken as well so the text
                        // left after the match stays a single raw fragment.
                        let mut k = i;
                        let mut p = pos;
                        while k < fragments.len()
                            && (p < m.end
                                || (!fragments[k].is_token()
                                    && !(k > 0 && fragments[k - 1].is_greedy())))
                        {
                            p += fragments[k].len();
                            if m.from >= p {
                                i += 1;
                                pos = p;
                            }
                            k += 1;
                        }

                        // The token would start inside an existing token
                        if !matches!(fragments.get(i), Some(Fragment::Raw(_))) {
                            if let Some(fragment) = fragments.get(i) {
                                pos += fragment.len();
                            }
                            i += 1;
                            continue;
                        }

                        Some(Span {
                            from: m.from,
                            to: m.end,
                            end: p,
                            removed: k - i,
                        })
                    } else {
                        let end = pos + fragments[i].len();
                        descriptor
                            .pattern
                            .find_at(&text[pos..end], 0, descriptor.lookbehind)?
                            .map(|m| Span {
                                from: pos + m.from,
                                to: pos + m.end,
                                end,
                                removed: 1,
                            })
                    };

                    let Some(Span {
                        from,
                        to,
                        end,
                        removed,
                    }) = found
                    else {
                        if one_shot {
                            break;
                        }
                        pos += fragments[i].len();
                        i += 1;
                        continue;
                    };

                    let matched = &text[from..to];
                    #[cfg(feature = "debug")]
                    log::debug!(
                        "[match_grammar] {token_type} matched {matched:?} at {from}..{to}, replacing {removed} fragment(s)"
                    );

                    let at = i;
                    let mut replacement = Vec::with_capacity(3);
                    if from > pos {
                        replacement.push(Fragment::Raw(text[pos..from].to_string()));
                        i += 1;
                        pos = from;
                    }

                    let content = match descriptor.inside {
                        Some(inside) => TokenContent::Nested(self.tokenize(matched, inside)?),
                        None => TokenContent::Text(matched.to_string()),
                    };
                    replacement.push(Fragment::Token(Token {
                        kind: token_type.to_string(),
                        content,
                        alias: descriptor.alias.clone(),
                        length: matched.len(),
                        greedy: descriptor.greedy,
                    }));

                    if to < end {
                        replacement.push(Fragment::Raw(text[to..end].to_string()));
                    }

                    fragments.splice(at..at + removed, replacement);

                    if removed != 1 {
                        #[cfg(feature = "debug")]
                        log::debug!(
                            "[match_grammar] greedy {token_type} spanned {removed} fragments, re-matching from {pos}"
                        );
                        self.match_grammar(text, fragments, entries, i, pos, true, Some(token_type))?;
                    }

                    if one_shot {
                        break;
                    }

                    pos += fragments[i].len();
                    i += 1;
                }
            }
        }

        Ok(())
    }
}
