use serde::Serialize;

/// An element of a tokenized text: either text no pattern claimed or a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Fragment {
    Raw(String),
    Token(Token),
}

impl Fragment {
    /// Byte length of the source text this fragment covers
    pub fn len(&self) -> usize {
        match self {
            Fragment::Raw(text) => text.len(),
            Fragment::Token(token) => token.length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Fragment::Token(_))
    }

    pub(crate) fn is_greedy(&self) -> bool {
        matches!(self, Fragment::Token(t) if t.greedy)
    }

    /// Appends the source text of this fragment to `out`
    pub fn write_text(&self, out: &mut String) {
        match self {
            Fragment::Raw(text) => out.push_str(text),
            Fragment::Token(token) => token.content.write_text(out),
        }
    }
}

/// Rebuilds the text a sequence of fragments was produced from.
pub fn fragments_text(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        fragment.write_text(&mut out);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TokenContent {
    /// The matched text, for patterns without an `inside` grammar
    Text(String),
    /// The matched text tokenized with the `inside` grammar
    Nested(Vec<Fragment>),
}

impl TokenContent {
    fn write_text(&self, out: &mut String) {
        match self {
            TokenContent::Text(text) => out.push_str(text),
            TokenContent::Nested(fragments) => {
                for fragment in fragments {
                    fragment.write_text(out);
                }
            }
        }
    }
}

/// A classified span of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// The name of the grammar entry that matched
    #[serde(rename = "type")]
    pub kind: String,
    pub content: TokenContent,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alias: Vec<String>,
    /// Byte length of the matched text
    pub length: usize,
    /// Whether the pattern that produced it was greedy.
    /// Greedy tokens stop a later greedy match from swallowing the text following them.
    #[serde(skip)]
    pub(crate) greedy: bool,
}

impl Token {
    pub fn is_greedy(&self) -> bool {
        self.greedy
    }

    /// The source text of this token
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.length);
        self.content.write_text(&mut out);
        out
    }
}
