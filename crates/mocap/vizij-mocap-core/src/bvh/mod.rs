//! BVH text ingestion: tokenizer plus strict hierarchy/motion parser.

pub mod parser;
pub mod tokenizer;

pub use parser::parse_bvh;
pub use tokenizer::{Spanned, Token, Tokenizer};
