use std::fmt;

use crate::hooks::{Hooks, WrapEnv};
use crate::tokenizer::{Fragment, Token, TokenContent};

#[derive(Debug, PartialEq, Eq, Clone)]
/// A renderer that will output every token as an HTML element
pub struct HtmlRenderer {
    /// The element wrapping each token
    pub tag: String,
    /// The class every token element gets, before its type and aliases
    pub token_class: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            tag: "span".to_string(),
            token_class: "token".to_string(),
        }
    }
}

impl HtmlRenderer {
    /// Renders the given fragments to an HTML string, escaping raw text.
    ///
    /// Every token goes through the `wrap` hooks before being written, which can change
    /// its tag, its classes and add attributes.
    pub fn render(&self, fragments: &[Fragment], language: &str, hooks: &Hooks) -> String {
        let mut out = String::new();
        self.render_fragments(fragments, language, hooks, &mut out);
        out
    }

    fn render_fragments(
        &self,
        fragments: &[Fragment],
        language: &str,
        hooks: &Hooks,
        out: &mut String,
    ) {
        for fragment in fragments {
            match fragment {
                Fragment::Raw(text) => out.push_str(&HtmlEscaped(text).to_string()),
                Fragment::Token(token) => self.render_token(token, language, hooks, out),
            }
        }
    }

    fn render_token(&self, token: &Token, language: &str, hooks: &Hooks, out: &mut String) {
        let content = match &token.content {
            TokenContent::Text(text) => HtmlEscaped(text).to_string(),
            TokenContent::Nested(inner) => {
                let mut content = String::new();
                self.render_fragments(inner, language, hooks, &mut content);
                content
            }
        };

        let mut classes = Vec::with_capacity(2 + token.alias.len());
        classes.push(self.token_class.clone());
        classes.push(token.kind.clone());
        classes.extend(token.alias.iter().cloned());

        let mut env = WrapEnv {
            kind: token.kind.clone(),
            content,
            text: token.text(),
            tag: self.tag.clone(),
            classes,
            attributes: Default::default(),
            language: language.to_string(),
        };
        hooks.run_wrap(&mut env);

        out.push_str(&format!(r#"<{} class="{}""#, env.tag, env.classes.join(" ")));
        for (name, value) in &env.attributes {
            out.push_str(&format!(r#" {name}="{}""#, AttributeEscaped(value)));
        }
        out.push_str(&format!(">{}</{}>", env.content, env.tag));
    }
}

/// Escapes text content: `&` and `<` become entities and non-breaking spaces become
/// plain spaces.
pub(crate) struct HtmlEscaped<'a>(pub &'a str);
impl fmt::Display for HtmlEscaped<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(s) = *self;
        let mut last = 0;
        for (i, ch) in s.char_indices() {
            let replacement = match ch {
                '&' => "&amp;",
                '<' => "&lt;",
                '\u{a0}' => " ",
                _ => continue,
            };
            fmt.write_str(&s[last..i])?;
            fmt.write_str(replacement)?;
            last = i + ch.len_utf8();
        }

        if last < s.len() {
            fmt.write_str(&s[last..])?;
        }
        Ok(())
    }
}

/// Escapes an attribute value written between double quotes.
pub(crate) struct AttributeEscaped<'a>(pub &'a str);
impl fmt::Display for AttributeEscaped<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(s) = *self;
        for (i, part) in s.split('"').enumerate() {
            if i > 0 {
                fmt.write_str("&quot;")?;
            }
            fmt.write_str(part)?;
        }
        Ok(())
    }
}
