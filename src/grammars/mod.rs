mod compiled;
mod raw;
mod regex;
mod traverse;

pub use compiled::*;
pub use raw::{
    RawAlias, RawDescriptor, RawGrammar, RawGrammarRef, RawPattern, RawPatternSpec, RawTokens,
};
pub use regex::{Flags, Regex};
pub(crate) use traverse::{deep_clone, depth_first_walk};
pub use traverse::Node;
