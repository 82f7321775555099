//! Lightweight HTML scanning shared by the resource rewriter and the splitter.

pub mod elements;
pub mod meta;
pub mod tokenizer;

pub use tokenizer::{Attribute, Tag, Token, TokenKind, Tokenizer};
