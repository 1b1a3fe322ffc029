use std::fmt;
use std::fs::File;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use super::compiled::REST_KEY;
use crate::error::TintedResult;

/// A full pattern descriptor
///
/// # Examples
/// ```json
/// {
///   "pattern": "(^|[^\\\\])[\"']",
///   "lookbehind": true
/// }
/// ```
///
/// ```json
/// {
///   "pattern": "<\\/?[^\\s>\\/]+",
///   "flags": "i",
///   "greedy": true,
///   "alias": ["tag", "markup"],
///   "inside": { "punctuation": "^<\\/?" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawDescriptor {
    /// The regex source, written like the body of a JS regex literal
    pub pattern: String,
    /// JS regex flags, eg `"i"`
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub lookbehind: bool,
    #[serde(default)]
    pub greedy: bool,
    #[serde(default)]
    pub alias: RawAlias,
    /// Grammar used for the content of the match
    #[serde(default)]
    pub inside: Option<RawGrammarRef>,
}

/// Either a single alias or a list of them
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawAlias {
    One(String),
    Many(Vec<String>),
}

impl Default for RawAlias {
    fn default() -> Self {
        RawAlias::Many(Vec::new())
    }
}

impl RawAlias {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            RawAlias::One(alias) => vec![alias],
            RawAlias::Many(aliases) => aliases,
        }
    }
}

/// A pattern is either a bare regex source or a full descriptor
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawPattern {
    Source(String),
    Descriptor(RawDescriptor),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawPatternSpec {
    Alternatives(Vec<RawPattern>),
    Single(RawPattern),
}

/// Where a nested grammar comes from
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawGrammarRef {
    /// The name of a language in the registry, possibly not loaded yet
    Language(String),
    /// A grammar written in place
    Inline(RawTokens),
}

/// The token map of a grammar, in document order.
///
/// The `rest` key is special: its value is a [`RawGrammarRef`] instead of patterns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTokens {
    pub entries: Vec<(String, RawPatternSpec)>,
    pub rest: Option<Box<RawGrammarRef>>,
}

impl<'de> Deserialize<'de> for RawTokens {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TokensVisitor;

        impl<'de> Visitor<'de> for TokensVisitor {
            type Value = RawTokens;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of token names to patterns")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut tokens = RawTokens::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == REST_KEY {
                        tokens.rest = Some(Box::new(map.next_value()?));
                        continue;
                    }
                    let value: RawPatternSpec = map.next_value()?;
                    match tokens.entries.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, existing)) => *existing = value,
                        None => tokens.entries.push((key, value)),
                    }
                }
                Ok(tokens)
            }
        }

        deserializer.deserialize_map(TokensVisitor)
    }
}

/// Top-level structure of a grammar file
///
/// # Examples
/// ```json
/// {
///   "name": "json",
///   "aliases": ["webmanifest"],
///   "tokens": {
///     "property": { "pattern": "\"(?:\\\\.|[^\\\\\"\\r\\n])*\"(?=\\s*:)", "flags": "i" },
///     "string": { "pattern": "\"(?:\\\\.|[^\\\\\"\\r\\n])*\"(?!\\s*:)", "greedy": true },
///     "punctuation": "[{}[\\]);,]"
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawGrammar {
    /// The language name used to look the grammar up
    pub name: String,
    /// Other names for the same language
    #[serde(default)]
    pub aliases: Vec<String>,
    pub tokens: RawTokens,
}

impl RawGrammar {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> TintedResult<Self> {
        let file = File::open(&path)?;
        let raw_grammar = serde_json::from_reader(&file)?;
        Ok(raw_grammar)
    }

    pub fn load_from_str(content: &str) -> TintedResult<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
