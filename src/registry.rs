use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{Error, TintedResult};
use crate::grammars::{
    Grammar, GrammarId, GrammarValue, Node, PatternDescriptor, PatternSpec, REST_KEY, RawDescriptor,
    RawGrammar, RawGrammarRef, RawPattern, RawPatternSpec, RawTokens, Regex, deep_clone,
    depth_first_walk,
};
use crate::hooks::{HighlightEnv, HookName, Hooks};
use crate::renderers::html::HtmlRenderer;
use crate::tokenizer::{Fragment, Tokenizer};

/// The grammars shipped with the crate, in loading order
const BUILTIN_GRAMMARS: &[&str] = &[
    include_str!("../grammars/markup.json"),
    include_str!("../grammars/mermaid.json"),
    include_str!("../grammars/nomnoml.json"),
    include_str!("../grammars/plantuml.json"),
    include_str!("../grammars/http.json"),
    include_str!("../grammars/erd.json"),
    include_str!("../grammars/diag.json"),
    include_str!("../grammars/ascii.json"),
    include_str!("../grammars/json.json"),
    include_str!("../grammars/request.json"),
    include_str!("../grammars/sh.json"),
    include_str!("../grammars/clojure.json"),
    include_str!("../grammars/pikchr.json"),
];

/// The default grammar name, where nothing is highlighted
pub const PLAIN_GRAMMAR_NAME: &str = "plain";

/// Options for highlighting by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightOptions<'a> {
    pub(crate) lang: &'a str,
    pub(crate) fallback_to_plain: bool,
}

impl<'a> HighlightOptions<'a> {
    pub fn new(lang: &'a str) -> Self {
        Self {
            lang,
            fallback_to_plain: false,
        }
    }

    /// Whether to fallback to the plain grammar if the requested
    /// grammar is not found.
    pub fn fallback_to_plain(mut self, value: bool) -> Self {
        self.fallback_to_plain = value;
        self
    }
}

/// The main struct in tinted.
///
/// Owns every grammar, the table of language names pointing to them and the hooks.
/// Grammars are addressed by [`GrammarId`]: two languages using the same id share the
/// same grammar, and `inside`/`rest` links can form cycles.
///
/// Tokenizing only needs `&self` so a registry can be shared between threads. To modify
/// grammars while others are reading, clone the registry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub(crate) grammars: Vec<Grammar>,
    // language name or alias -> grammar
    grammar_id_by_name: HashMap<String, GrammarId>,
    // names referenced by a grammar file before being loaded, pointing to an empty grammar
    // that gets filled when the language arrives
    reserved: HashSet<String>,
    hooks: Hooks,
    renderer: HtmlRenderer,
}

impl Registry {
    /// Adds a grammar without giving it a name, to be used with `inside` or `rest`.
    pub fn add_grammar(&mut self, grammar: Grammar) -> GrammarId {
        let id = GrammarId(self.grammars.len() as u32);
        self.grammars.push(grammar);
        id
    }

    /// Points the language `name` at the grammar `id`, replacing whatever it pointed to.
    pub fn set_language(&mut self, name: &str, id: GrammarId) {
        if self.reserved.remove(name)
            && let Some(placeholder) = self.grammar_id_by_name.get(name).copied()
            && placeholder != id
        {
            #[cfg(feature = "debug")]
            log::debug!("[set_language] {name} was referenced before being set, redirecting");
            let all: Vec<_> = (0..self.grammars.len() as u32).map(GrammarId).collect();
            self.replace_references(&all, placeholder, id);
        }
        self.grammar_id_by_name.insert(name.to_string(), id);
    }

    /// Adds a grammar under the name `name`.
    ///
    /// If grammars already loaded reference `name`, they will now use this grammar.
    pub fn add_language(&mut self, name: &str, grammar: Grammar) -> GrammarId {
        if self.reserved.remove(name)
            && let Some(&id) = self.grammar_id_by_name.get(name)
        {
            self.grammars[id] = grammar;
            return id;
        }
        let id = self.add_grammar(grammar);
        self.set_language(name, id);
        id
    }

    /// Adds an alias for the given language
    pub fn add_alias(&mut self, name: &str, alias: &str) {
        if let Some(grammar_id) = self.grammar_id(name) {
            self.set_language(alias, grammar_id);
        }
    }

    pub fn grammar_id(&self, name: &str) -> Option<GrammarId> {
        if self.reserved.contains(name) {
            return None;
        }
        self.grammar_id_by_name.get(name).copied()
    }

    /// Checks whether the given lang is available in the registry with its grammar name
    /// or aliases
    pub fn contains_grammar(&self, name: &str) -> bool {
        self.grammar_id(name).is_some()
    }

    pub fn grammar(&self, id: GrammarId) -> &Grammar {
        &self.grammars[id]
    }

    pub fn grammar_mut(&mut self, id: GrammarId) -> &mut Grammar {
        &mut self.grammars[id]
    }

    /// Every language name and alias, sorted
    pub fn languages(&self) -> Vec<&str> {
        let mut names: Vec<_> = self
            .grammar_id_by_name
            .keys()
            .filter(|name| !self.reserved.contains(*name))
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Languages referenced by loaded grammar files that were never added.
    /// They behave as empty grammars until they are.
    pub fn missing_grammars(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.reserved.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Changes the renderer used by [`Registry::highlight`]
    pub fn set_renderer(&mut self, renderer: HtmlRenderer) {
        self.renderer = renderer;
    }

    /// Compiles a grammar file and adds it under its name and aliases.
    ///
    /// Every pattern is compiled right away so a broken one is reported here rather than
    /// when highlighting. The registry is left untouched on error.
    pub fn add_grammar_from_raw(&mut self, raw_grammar: RawGrammar) -> TintedResult<GrammarId> {
        let arena_len = self.grammars.len();
        let grammar = match self.compile_tokens(raw_grammar.tokens) {
            Ok(grammar) => grammar,
            Err(e) => {
                self.discard_grammars_from(arena_len);
                return Err(e);
            }
        };
        let id = self.add_language(&raw_grammar.name, grammar);
        for alias in &raw_grammar.aliases {
            self.set_language(alias, id);
        }
        Ok(id)
    }

    /// Drops the grammars added since the arena had `len` of them, with the names reserved
    /// for them.
    fn discard_grammars_from(&mut self, len: usize) {
        #[cfg(feature = "debug")]
        log::debug!(
            "[discard_grammars_from] dropping {} grammar(s)",
            self.grammars.len() - len
        );
        self.grammars.truncate(len);
        let reserved = &mut self.reserved;
        self.grammar_id_by_name.retain(|name, id| {
            let keep = id.as_index() < len;
            if !keep {
                reserved.remove(name);
            }
            keep
        });
    }

    /// Reads the file and add it as a grammar.
    pub fn add_grammar_from_path(&mut self, path: impl AsRef<Path>) -> TintedResult<GrammarId> {
        let raw_grammar = RawGrammar::load_from_file(path)?;
        self.add_grammar_from_raw(raw_grammar)
    }

    pub fn add_grammar_from_str(&mut self, content: &str) -> TintedResult<GrammarId> {
        let raw_grammar = RawGrammar::load_from_str(content)?;
        self.add_grammar_from_raw(raw_grammar)
    }

    /// Adds an empty grammar that will not match any token. Useful as a fallback if the grammar is not found.
    ///
    /// It will get the `plain` grammar name.
    pub fn add_plain_grammar(&mut self, aliases: &[&str]) -> GrammarId {
        let id = self.add_language(PLAIN_GRAMMAR_NAME, Grammar::new());
        for alias in aliases {
            self.add_alias(PLAIN_GRAMMAR_NAME, alias);
        }
        id
    }

    /// A registry with the builtin grammars, the plain grammar and the `entity` wrap hook
    /// showing the decoded entity as a title.
    pub fn builtin() -> TintedResult<Self> {
        let mut registry = Self::default();
        for content in BUILTIN_GRAMMARS {
            registry.add_grammar_from_str(content)?;
        }
        registry.add_plain_grammar(&["text", "txt"]);
        registry.hooks.add_wrap(|env| {
            if env.kind == "entity" {
                let title = env.content.replacen("&amp;", "&", 1);
                env.attributes.insert("title".to_string(), title);
            }
        });
        Ok(registry)
    }

    fn compile_tokens(&mut self, tokens: RawTokens) -> TintedResult<Grammar> {
        let mut grammar = Grammar::new();
        for (name, spec) in tokens.entries {
            let spec = match spec {
                RawPatternSpec::Single(pattern) => {
                    PatternSpec::Single(self.compile_pattern(pattern)?)
                }
                RawPatternSpec::Alternatives(patterns) => PatternSpec::Alternatives(
                    patterns
                        .into_iter()
                        .map(|p| self.compile_pattern(p))
                        .collect::<TintedResult<_>>()?,
                ),
            };
            grammar.set(name, spec);
        }
        if let Some(rest) = tokens.rest {
            let rest = self.resolve_grammar_ref(*rest)?;
            grammar.set(REST_KEY, GrammarValue::Grammar(rest));
        }
        Ok(grammar)
    }

    fn compile_pattern(&mut self, pattern: RawPattern) -> TintedResult<PatternDescriptor> {
        let raw = match pattern {
            RawPattern::Source(pattern) => RawDescriptor {
                pattern,
                flags: String::new(),
                lookbehind: false,
                greedy: false,
                alias: Default::default(),
                inside: None,
            },
            RawPattern::Descriptor(raw) => raw,
        };

        let regex = Regex::with_flags(raw.pattern, &raw.flags);
        regex.validate()?;
        let mut descriptor = PatternDescriptor::new(regex)
            .lookbehind(raw.lookbehind)
            .greedy(raw.greedy);
        descriptor.alias = raw.alias.into_vec();
        if let Some(inside) = raw.inside {
            descriptor.inside = Some(self.resolve_grammar_ref(inside)?);
        }
        Ok(descriptor)
    }

    fn resolve_grammar_ref(&mut self, grammar_ref: RawGrammarRef) -> TintedResult<GrammarId> {
        match grammar_ref {
            RawGrammarRef::Inline(tokens) => {
                let grammar = self.compile_tokens(tokens)?;
                Ok(self.add_grammar(grammar))
            }
            RawGrammarRef::Language(name) => {
                if let Some(&id) = self.grammar_id_by_name.get(&name) {
                    return Ok(id);
                }
                #[cfg(feature = "debug")]
                log::debug!("[resolve_grammar_ref] reserving {name} until it is added");
                let id = self.add_grammar(Grammar::new());
                self.grammar_id_by_name.insert(name.clone(), id);
                self.reserved.insert(name);
                Ok(id)
            }
        }
    }

    /// Tokenizes `text` with the grammar `id`.
    pub fn tokenize(&self, text: &str, id: GrammarId) -> TintedResult<Vec<Fragment>> {
        Tokenizer::new(&self.grammars).tokenize(text, id)
    }

    /// Highlights `code` with the language named in the options and renders it to HTML.
    pub fn highlight(&self, code: &str, options: HighlightOptions) -> TintedResult<String> {
        let grammar_id = self
            .grammar_id(options.lang)
            .or_else(|| {
                if options.fallback_to_plain {
                    self.grammar_id(PLAIN_GRAMMAR_NAME)
                } else {
                    None
                }
            })
            .ok_or_else(|| Error::GrammarNotFound(options.lang.to_string()))?;

        self.highlight_with_grammar(code, grammar_id, options.lang)
    }

    /// Highlights `code` with the grammar `id`, `language` only being passed to the hooks.
    ///
    /// Runs the `before-tokenize` hooks, tokenizes, runs the `after-tokenize` hooks and
    /// renders the tokens. The `before-insert` hooks can then rewrite the HTML, which the
    /// `after-highlight` hooks see last.
    pub fn highlight_with_grammar(
        &self,
        code: &str,
        id: GrammarId,
        language: &str,
    ) -> TintedResult<String> {
        let mut env = HighlightEnv {
            code: code.to_string(),
            grammar: Some(id),
            language: language.to_string(),
            ..Default::default()
        };

        self.hooks.run(HookName::BeforeTokenize, &mut env);
        env.tokens = match env.grammar {
            Some(grammar) => self.tokenize(&env.code, grammar)?,
            None if env.code.is_empty() => Vec::new(),
            None => vec![Fragment::Raw(env.code.clone())],
        };
        self.hooks.run(HookName::AfterTokenize, &mut env);

        env.highlighted_code = self.renderer.render(&env.tokens, &env.language, &self.hooks);
        self.hooks.run(HookName::BeforeInsert, &mut env);
        self.hooks.run(HookName::AfterHighlight, &mut env);

        Ok(env.highlighted_code)
    }

    /// Returns a copy of the grammar of `language` with `overrides` set on it: existing
    /// keys are replaced in place and new ones appended.
    ///
    /// Every grammar reachable from the language is copied so changing the result never
    /// affects the original. The copy is not given a name.
    pub fn extend(&mut self, language: &str, overrides: Grammar) -> TintedResult<GrammarId> {
        let id = self
            .grammar_id(language)
            .ok_or_else(|| Error::GrammarNotFound(language.to_string()))?;
        let clone = self.deep_clone(id);
        for (name, value) in overrides.entries {
            self.grammars[clone].set(name, value);
        }
        Ok(clone)
    }

    /// Copies the grammar `id` and every grammar reachable from it.
    pub fn deep_clone(&mut self, id: GrammarId) -> GrammarId {
        deep_clone(&mut self.grammars, id)
    }

    /// Creates a new grammar with the entries of `target`, `insertions` being placed right
    /// before the entry `before`. They are set onto a copy of `target` if there is no
    /// `before` or if `target` has no such entry.
    ///
    /// An insertion sharing its name with an entry placed before `before` replaces that
    /// entry where it is. One sharing its name with `before` or a later entry moves that
    /// entry to the insertion point, which keeps its original value.
    ///
    /// Every language name and every grammar reachable from them that pointed to `target`
    /// points to the new grammar afterwards, including the new grammar itself.
    pub fn insert_before(
        &mut self,
        target: GrammarId,
        before: Option<&str>,
        insertions: Grammar,
    ) -> GrammarId {
        let original = &self.grammars[target];
        let splice_at = before.and_then(|before| original.keys().position(|k| k == before));

        let grammar = match splice_at {
            Some(splice_at) => {
                let mut grammar = Grammar::new();
                for (idx, (name, value)) in original.entries.iter().enumerate() {
                    if idx == splice_at {
                        for (name, value) in &insertions.entries {
                            grammar.set(name.clone(), value.clone());
                        }
                    }
                    grammar.set(name.clone(), value.clone());
                }
                grammar
            }
            None => {
                let mut grammar = original.clone();
                for (name, value) in insertions.entries {
                    grammar.set(name, value);
                }
                grammar
            }
        };

        let mut visited: Vec<_> = self
            .walk_languages(&mut |_: &str, _: Node<'_>, _: &str| {})
            .into_iter()
            .collect();
        let new_id = self.add_grammar(grammar);
        visited.push(new_id);
        self.replace_references(&visited, target, new_id);

        for id in self.grammar_id_by_name.values_mut() {
            if *id == target {
                *id = new_id;
            }
        }
        #[cfg(feature = "debug")]
        log::debug!(
            "[insert_before] replaced grammar {} by {}, {} grammars checked",
            *target,
            *new_id,
            visited.len()
        );

        new_id
    }

    fn replace_references(&mut self, grammars: &[GrammarId], old: GrammarId, new: GrammarId) {
        for &id in grammars {
            for (_, value) in &mut self.grammars[id].entries {
                value.map_references(|r| if r == old { new } else { r });
            }
        }
    }

    fn walk_languages<'a, F>(&'a self, visit: &mut F) -> HashSet<GrammarId>
    where
        F: FnMut(&str, Node<'a>, &str),
    {
        let mut roots: Vec<_> = self
            .grammar_id_by_name
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
            .collect();
        roots.sort_unstable();
        depth_first_walk(&self.grammars, &roots, visit)
    }

    /// Calls `visit(key, node, type_hint)` for everything reachable from the languages,
    /// entering each grammar once even when it is shared or part of a cycle.
    ///
    /// Languages are visited by name order, `type_hint` is the language name for them and
    /// the name of the closest entry below.
    pub fn depth_first_walk<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&str, Node<'a>, &str),
    {
        self.walk_languages(&mut visit);
    }

    /// Same as [`Registry::depth_first_walk`] from a single grammar, which is visited with
    /// an empty key and type hint.
    pub fn walk_grammar<'a, F>(&'a self, id: GrammarId, mut visit: F)
    where
        F: FnMut(&str, Node<'a>, &str),
    {
        depth_first_walk(&self.grammars, &[("", id)], &mut visit);
    }
}
