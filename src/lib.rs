mod error;
mod grammars;
mod hooks;
mod registry;

mod renderers;
mod tokenizer;

#[cfg(test)]
mod test_utils;

pub use error::Error;
pub use grammars::{
    Flags, Grammar, GrammarId, GrammarValue, Node, PatternDescriptor, PatternSpec, REST_KEY,
    RawAlias, RawDescriptor, RawGrammar, RawGrammarRef, RawPattern, RawPatternSpec, RawTokens,
    Regex,
};
pub use hooks::{HighlightEnv, HookName, Hooks, WrapEnv};
pub use registry::{HighlightOptions, PLAIN_GRAMMAR_NAME, Registry};
pub use renderers::html::HtmlRenderer;
pub use tokenizer::{Fragment, Token, TokenContent, fragments_text};

/// A light stylesheet for the classes written by [`HtmlRenderer`] with its default settings.
pub const TINTED_CSS: &str = r#".token.comment,
.token.prolog,
.token.doctype,
.token.cdata {
  color: slategray;
}
.token.punctuation {
  color: #999;
}
.token.property,
.token.boolean,
.token.number,
.token.null {
  color: #905;
}
.token.attr-name,
.token.string {
  color: #690;
}
.token.entity,
.token.operator {
  color: #9a6e3a;
}
.token.entity {
  cursor: help;
}
.token.attr-value,
.token.keyword {
  color: #07a;
}
.token.namespace {
  opacity: 0.7;
}
"#;
