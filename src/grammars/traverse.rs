//! Cycle-safe copy and traversal of the grammar graph.
//!
//! Grammars reference each other through [`GrammarId`] so the graph can contain cycles
//! (a grammar whose `inside` points back at itself) and shared nodes (a grammar used by
//! several languages). Both operations here track the grammars they have seen by id.

use std::collections::{HashMap, HashSet};

use crate::grammars::{Grammar, GrammarId, GrammarValue, PatternDescriptor, PatternSpec};

/// What [`depth_first_walk`] hands to the visitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    /// A grammar, reached from a language entry, a nested grammar entry like `rest`
    /// or an `inside` link
    Grammar(GrammarId),
    /// The patterns of a token type
    Patterns(&'a PatternSpec),
    /// One of the alternatives of a token type
    Descriptor(&'a PatternDescriptor),
}

/// Copies the grammar `root` and every grammar reachable from it, returning the id of the copy.
///
/// A grammar is registered in the visited map before its entries are copied so that
/// references back to it, or to a grammar already copied, point to the copy.
/// Regexes are shared with the original.
pub(crate) fn deep_clone(grammars: &mut Vec<Grammar>, root: GrammarId) -> GrammarId {
    let mut visited = HashMap::new();
    clone_grammar(grammars, root, &mut visited)
}

fn clone_grammar(
    grammars: &mut Vec<Grammar>,
    id: GrammarId,
    visited: &mut HashMap<GrammarId, GrammarId>,
) -> GrammarId {
    if let Some(&clone) = visited.get(&id) {
        return clone;
    }

    let clone = GrammarId(grammars.len() as u32);
    grammars.push(Grammar::default());
    visited.insert(id, clone);

    let mut entries = grammars[id].entries.clone();
    for (_, value) in &mut entries {
        value.map_references(|r| clone_grammar(grammars, r, visited));
    }
    grammars[clone].entries = entries;

    clone
}

/// Visits every `(key, node, type_hint)` reachable from `roots`.
///
/// Each grammar is entered once even if several entries point to it. `type_hint` is the
/// closest token type name: the language name for the roots, the entry name below that.
pub(crate) fn depth_first_walk<'a, F>(
    grammars: &'a [Grammar],
    roots: &[(&str, GrammarId)],
    visit: &mut F,
) -> HashSet<GrammarId>
where
    F: FnMut(&str, Node<'a>, &str),
{
    let mut visited = HashSet::new();
    for (name, id) in roots {
        walk_reference(grammars, name, *id, name, &mut visited, visit);
    }
    visited
}

fn walk_reference<'a, F>(
    grammars: &'a [Grammar],
    key: &str,
    id: GrammarId,
    type_hint: &str,
    visited: &mut HashSet<GrammarId>,
    visit: &mut F,
) where
    F: FnMut(&str, Node<'a>, &str),
{
    if !visited.insert(id) {
        return;
    }
    visit(key, Node::Grammar(id), type_hint);

    for (key, value) in &grammars[id.as_index()].entries {
        match value {
            GrammarValue::Grammar(sub) => {
                walk_reference(grammars, key, *sub, key, visited, visit);
            }
            GrammarValue::Patterns(spec) => {
                visit(key, Node::Patterns(spec), key);
                if let PatternSpec::Alternatives(descriptors) = spec {
                    for (idx, descriptor) in descriptors.iter().enumerate() {
                        visit(&idx.to_string(), Node::Descriptor(descriptor), key);
                    }
                }
                for inside in spec.descriptors().iter().filter_map(|d| d.inside) {
                    walk_reference(grammars, "inside", inside, key, visited, visit);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammars::Regex;

    fn push(grammars: &mut Vec<Grammar>, grammar: Grammar) -> GrammarId {
        grammars.push(grammar);
        GrammarId(grammars.len() as u32 - 1)
    }

    /// `root` has a `tag` whose inside is `inner`, and `inner` points back to `root`
    fn cyclic() -> (Vec<Grammar>, GrammarId, GrammarId) {
        let mut grammars = Vec::new();
        let root = push(&mut grammars, Grammar::new());
        let inner = push(
            &mut grammars,
            Grammar::new().token(
                "nested",
                PatternDescriptor::new(Regex::new("n")).inside(root),
            ),
        );
        grammars[root] = Grammar::new()
            .token("tag", PatternDescriptor::new(Regex::new("<t>")).inside(inner))
            .token("word", Regex::new(r"\w+"));
        (grammars, root, inner)
    }

    #[test]
    fn clone_handles_cycles() {
        let (mut grammars, root, inner) = cyclic();
        let clone = deep_clone(&mut grammars, root);

        assert_eq!(grammars.len(), 4);
        assert_ne!(clone, root);

        let Some(GrammarValue::Patterns(PatternSpec::Single(tag))) = grammars[clone].get("tag")
        else {
            panic!("tag was not cloned");
        };
        let inner_clone = tag.inside.unwrap();
        assert_ne!(inner_clone, inner);

        let Some(GrammarValue::Patterns(PatternSpec::Single(nested))) =
            grammars[inner_clone].get("nested")
        else {
            panic!("nested was not cloned");
        };
        // the back edge points to the clone, not to the original
        assert_eq!(nested.inside, Some(clone));
        assert_eq!(grammars[clone].get("word"), grammars[root].get("word"));
    }

    #[test]
    fn clone_keeps_sharing() {
        let mut grammars = Vec::new();
        let shared = push(&mut grammars, Grammar::new().token("a", Regex::new("a")));
        let root = push(
            &mut grammars,
            Grammar::new()
                .token("x", PatternDescriptor::new(Regex::new("x")).inside(shared))
                .token(
                    "y",
                    vec![
                        PatternDescriptor::new(Regex::new("y")),
                        PatternDescriptor::new(Regex::new("z")).inside(shared),
                    ],
                ),
        );

        let clone = deep_clone(&mut grammars, root);
        // one copy of root, one copy of shared
        assert_eq!(grammars.len(), 4);

        let mut refs = Vec::new();
        for (_, value) in grammars[clone].iter() {
            value.for_each_reference(|id| refs.push(id));
        }
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], refs[1]);
        assert_ne!(refs[0], shared);
        assert_eq!(grammars[refs[0]], grammars[shared]);
    }

    #[test]
    fn clone_is_independent() {
        let (mut grammars, root, _) = cyclic();
        let clone = deep_clone(&mut grammars, root);

        grammars[clone].set("word", Regex::new("changed"));
        grammars[clone].set("new", Regex::new("new"));

        assert_eq!(
            grammars[root].get("word"),
            Some(&GrammarValue::from(Regex::new(r"\w+")))
        );
        assert!(grammars[root].get("new").is_none());
    }

    #[test]
    fn walk_visits_each_grammar_once() {
        let (grammars, root, inner) = cyclic();
        let mut seen = Vec::new();
        let mut visit = |key: &str, node: Node<'_>, hint: &str| {
            let node = match node {
                Node::Grammar(id) => format!("grammar {}", *id),
                Node::Patterns(_) => "patterns".to_string(),
                Node::Descriptor(_) => "descriptor".to_string(),
            };
            seen.push(format!("{key} {node} ({hint})"));
        };
        let visited = depth_first_walk(&grammars, &[("lang", root), ("alias", root)], &mut visit);

        assert_eq!(
            seen,
            [
                "lang grammar 0 (lang)",
                "tag patterns (tag)",
                "inside grammar 1 (tag)",
                "nested patterns (nested)",
                "word patterns (word)",
            ]
        );
        assert_eq!(visited, HashSet::from([root, inner]));
    }

    #[test]
    fn walk_reports_alternatives_with_the_token_type() {
        let mut grammars = Vec::new();
        let root = push(
            &mut grammars,
            Grammar::new().token(
                "punctuation",
                vec![
                    PatternDescriptor::new(Regex::new("^=")),
                    PatternDescriptor::new(Regex::new("[\"']")),
                ],
            ),
        );

        let mut seen = Vec::new();
        let mut visit = |key: &str, node: Node<'_>, hint: &str| {
            if let Node::Descriptor(d) = node {
                seen.push((key.to_string(), d.pattern.source().to_string(), hint.to_string()));
            }
        };
        depth_first_walk(&grammars, &[("lang", root)], &mut visit);
        assert_eq!(
            seen,
            [
                ("0".to_string(), "^=".to_string(), "punctuation".to_string()),
                ("1".to_string(), "[\"']".to_string(), "punctuation".to_string()),
            ]
        );
    }
}
