//! Named extension points run by the highlight pipeline and the HTML renderer.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, TintedResult};
use crate::grammars::GrammarId;
use crate::tokenizer::Fragment;

/// The points of the highlight pipeline callbacks can be attached to.
///
/// [`crate::Registry::highlight`] runs `before-tokenize` and `after-tokenize`. The other
/// names are kept for integrations that drive the remaining steps themselves, through
/// [`Hooks::run`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookName {
    BeforeHighlightAll,
    BeforeSanityCheck,
    BeforeHighlight,
    BeforeTokenize,
    AfterTokenize,
    BeforeInsert,
    AfterHighlight,
    Complete,
}

impl HookName {
    pub const ALL: [HookName; 8] = [
        HookName::BeforeHighlightAll,
        HookName::BeforeSanityCheck,
        HookName::BeforeHighlight,
        HookName::BeforeTokenize,
        HookName::AfterTokenize,
        HookName::BeforeInsert,
        HookName::AfterHighlight,
        HookName::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::BeforeHighlightAll => "before-highlightall",
            HookName::BeforeSanityCheck => "before-sanity-check",
            HookName::BeforeHighlight => "before-highlight",
            HookName::BeforeTokenize => "before-tokenize",
            HookName::AfterTokenize => "after-tokenize",
            HookName::BeforeInsert => "before-insert",
            HookName::AfterHighlight => "after-highlight",
            HookName::Complete => "complete",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownHook(s.to_string()))
    }
}

/// The state shared by the callbacks of one highlight call.
/// Callbacks can rewrite any of it: `code` before tokenizing, `tokens` after.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightEnv {
    pub code: String,
    /// `None` when the language is unknown
    pub grammar: Option<GrammarId>,
    pub language: String,
    pub tokens: Vec<Fragment>,
    /// The rendered HTML, set before the `before-insert` hooks run
    pub highlighted_code: String,
}

/// What a token is about to be rendered as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrapEnv {
    /// The token type
    pub kind: String,
    /// The already rendered and escaped content
    pub content: String,
    /// The source text of the token, unescaped
    pub text: String,
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub language: String,
}

type HighlightHook = Arc<dyn Fn(&mut HighlightEnv) + Send + Sync>;
type WrapHook = Arc<dyn Fn(&mut WrapEnv) + Send + Sync>;

/// Callbacks per hook name, run in registration order.
#[derive(Clone, Default)]
pub struct Hooks {
    highlight: HashMap<HookName, Vec<HighlightHook>>,
    wrap: Vec<WrapHook>,
}

impl Hooks {
    pub fn add<F>(&mut self, name: HookName, callback: F)
    where
        F: Fn(&mut HighlightEnv) + Send + Sync + 'static,
    {
        self.highlight
            .entry(name)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Same as [`Hooks::add`] with the hook given by its name, eg `after-tokenize`.
    pub fn add_named<F>(&mut self, name: &str, callback: F) -> TintedResult<()>
    where
        F: Fn(&mut HighlightEnv) + Send + Sync + 'static,
    {
        self.add(name.parse()?, callback);
        Ok(())
    }

    /// Adds a callback run on every token before it is rendered.
    pub fn add_wrap<F>(&mut self, callback: F)
    where
        F: Fn(&mut WrapEnv) + Send + Sync + 'static,
    {
        self.wrap.push(Arc::new(callback));
    }

    pub fn run(&self, name: HookName, env: &mut HighlightEnv) {
        if let Some(callbacks) = self.highlight.get(&name) {
            for callback in callbacks {
                callback(env);
            }
        }
    }

    pub fn run_wrap(&self, env: &mut WrapEnv) {
        for callback in &self.wrap {
            callback(env);
        }
    }

    pub fn len(&self, name: HookName) -> usize {
        self.highlight.get(&name).map_or(0, Vec::len)
    }

    pub fn wrap_len(&self) -> usize {
        self.wrap.len()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<_, _> = self
            .highlight
            .iter()
            .map(|(name, callbacks)| (name.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("Hooks")
            .field("highlight", &counts)
            .field("wrap", &self.wrap.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_name() {
        for name in HookName::ALL {
            assert_eq!(name.as_str().parse::<HookName>().unwrap(), name);
        }
        assert!(matches!(
            "after-everything".parse::<HookName>(),
            Err(Error::UnknownHook(_))
        ));
    }

    #[test]
    fn runs_callbacks_in_order() {
        let mut hooks = Hooks::default();
        hooks.add(HookName::BeforeTokenize, |env| env.code.push('a'));
        hooks
            .add_named("before-tokenize", |env| env.code.push('b'))
            .unwrap();
        hooks.add(HookName::AfterTokenize, |env| env.code.push('z'));

        let mut env = HighlightEnv::default();
        hooks.run(HookName::BeforeTokenize, &mut env);
        assert_eq!(env.code, "ab");
        hooks.run(HookName::Complete, &mut env);
        assert_eq!(env.code, "ab");
        assert_eq!(hooks.len(HookName::BeforeTokenize), 2);
        assert!(hooks.add_named("nope", |_| {}).is_err());
    }

    #[test]
    fn clones_share_callbacks() {
        let mut hooks = Hooks::default();
        hooks.add_wrap(|env| env.classes.push("extra".to_string()));
        let copy = hooks.clone();
        hooks.add_wrap(|env| env.tag = "b".to_string());

        let mut env = WrapEnv::default();
        copy.run_wrap(&mut env);
        assert_eq!(env.classes, ["extra"]);
        assert_eq!(env.tag, "");
        assert_eq!(hooks.wrap_len(), 2);
        assert_eq!(format!("{copy:?}"), "Hooks { highlight: {}, wrap: 1 }");
    }
}
