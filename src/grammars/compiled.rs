use std::ops::{Deref, Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::grammars::regex::Regex;

/// The key of the entry whose grammar gets merged into its parent before tokenizing.
pub const REST_KEY: &str = "rest";

/// Identity of a grammar inside a [`crate::Registry`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrammarId(pub(crate) u32);

impl GrammarId {
    #[inline]
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

impl Deref for GrammarId {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Index<GrammarId> for Vec<Grammar> {
    type Output = Grammar;

    fn index(&self, index: GrammarId) -> &Self::Output {
        &self[index.as_index()]
    }
}

impl IndexMut<GrammarId> for Vec<Grammar> {
    fn index_mut(&mut self, index: GrammarId) -> &mut Self::Output {
        &mut self[index.as_index()]
    }
}

/// A regex plus the modifiers changing how its match becomes a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternDescriptor {
    pub pattern: Regex,
    /// Capture group 1 is a required prefix that is not part of the token
    pub lookbehind: bool,
    /// Can match across fragments already produced by earlier patterns
    pub greedy: bool,
    /// Extra labels for the token, used as additional classes when rendering
    pub alias: Vec<String>,
    /// Grammar used to tokenize the content of the match
    pub inside: Option<GrammarId>,
}

impl PatternDescriptor {
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            lookbehind: false,
            greedy: false,
            alias: Vec::new(),
            inside: None,
        }
    }

    pub fn lookbehind(mut self, value: bool) -> Self {
        self.lookbehind = value;
        self
    }

    pub fn greedy(mut self, value: bool) -> Self {
        self.greedy = value;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    pub fn inside(mut self, grammar: GrammarId) -> Self {
        self.inside = Some(grammar);
        self
    }
}

impl From<Regex> for PatternDescriptor {
    fn from(pattern: Regex) -> Self {
        Self::new(pattern)
    }
}

/// One or more descriptors for a token type, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSpec {
    Single(PatternDescriptor),
    Alternatives(Vec<PatternDescriptor>),
}

impl PatternSpec {
    pub fn descriptors(&self) -> &[PatternDescriptor] {
        match self {
            PatternSpec::Single(d) => std::slice::from_ref(d),
            PatternSpec::Alternatives(d) => d,
        }
    }

    pub fn descriptors_mut(&mut self) -> &mut [PatternDescriptor] {
        match self {
            PatternSpec::Single(d) => std::slice::from_mut(d),
            PatternSpec::Alternatives(d) => d,
        }
    }
}

impl From<PatternDescriptor> for PatternSpec {
    fn from(descriptor: PatternDescriptor) -> Self {
        PatternSpec::Single(descriptor)
    }
}

impl From<Regex> for PatternSpec {
    fn from(pattern: Regex) -> Self {
        PatternSpec::Single(PatternDescriptor::new(pattern))
    }
}

impl From<Vec<PatternDescriptor>> for PatternSpec {
    fn from(descriptors: Vec<PatternDescriptor>) -> Self {
        PatternSpec::Alternatives(descriptors)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarValue {
    Patterns(PatternSpec),
    /// A nested grammar, only meaningful for the `rest` entry when tokenizing
    Grammar(GrammarId),
}

impl GrammarValue {
    /// Calls `f` on every grammar id this value points to.
    pub(crate) fn for_each_reference(&self, mut f: impl FnMut(GrammarId)) {
        match self {
            GrammarValue::Patterns(spec) => spec
                .descriptors()
                .iter()
                .filter_map(|d| d.inside)
                .for_each(f),
            GrammarValue::Grammar(id) => f(*id),
        }
    }

    pub(crate) fn map_references(&mut self, mut f: impl FnMut(GrammarId) -> GrammarId) {
        match self {
            GrammarValue::Patterns(spec) => {
                for descriptor in spec.descriptors_mut() {
                    if let Some(inside) = descriptor.inside {
                        descriptor.inside = Some(f(inside));
                    }
                }
            }
            GrammarValue::Grammar(id) => *id = f(*id),
        }
    }
}

impl From<PatternSpec> for GrammarValue {
    fn from(spec: PatternSpec) -> Self {
        GrammarValue::Patterns(spec)
    }
}

impl From<PatternDescriptor> for GrammarValue {
    fn from(descriptor: PatternDescriptor) -> Self {
        GrammarValue::Patterns(descriptor.into())
    }
}

impl From<Regex> for GrammarValue {
    fn from(pattern: Regex) -> Self {
        GrammarValue::Patterns(pattern.into())
    }
}

impl From<Vec<PatternDescriptor>> for GrammarValue {
    fn from(descriptors: Vec<PatternDescriptor>) -> Self {
        GrammarValue::Patterns(descriptors.into())
    }
}

/// An ordered mapping of token type to patterns.
/// The order of the entries is the matching priority.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grammar {
    pub(crate) entries: Vec<(String, GrammarValue)>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder version of [`Grammar::set`]
    pub fn token(mut self, name: impl Into<String>, value: impl Into<GrammarValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets the `rest` entry: its entries are merged in this grammar when tokenizing.
    pub fn rest(self, grammar: GrammarId) -> Self {
        self.token(REST_KEY, GrammarValue::Grammar(grammar))
    }

    /// Replaces the value of an existing entry in place, or appends a new entry
    /// with the lowest priority.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<GrammarValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&GrammarValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut GrammarValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<GrammarValue> {
        let idx = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GrammarValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_position_of_existing_keys() {
        let mut grammar = Grammar::new()
            .token("a", Regex::new("a"))
            .token("b", Regex::new("b"));
        grammar.set("a", Regex::new("x"));
        grammar.set("c", Regex::new("c"));

        assert_eq!(grammar.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(grammar.get("a"), Some(&GrammarValue::from(Regex::new("x"))));
    }

    #[test]
    fn remove_entry() {
        let mut grammar = Grammar::new()
            .token("a", Regex::new("a"))
            .rest(GrammarId(3));
        assert_eq!(grammar.remove(REST_KEY), Some(GrammarValue::Grammar(GrammarId(3))));
        assert_eq!(grammar.remove(REST_KEY), None);
        assert_eq!(grammar.len(), 1);
    }

    #[test]
    fn maps_every_reference() {
        let mut value = GrammarValue::from(vec![
            PatternDescriptor::new(Regex::new("a")).inside(GrammarId(1)),
            PatternDescriptor::new(Regex::new("b")),
            PatternDescriptor::new(Regex::new("c")).inside(GrammarId(2)),
        ]);
        value.map_references(|id| GrammarId(*id + 10));

        let mut seen = Vec::new();
        value.for_each_reference(|id| seen.push(id));
        assert_eq!(seen, [GrammarId(11), GrammarId(12)]);
    }
}
