//! Text command model and parser.

mod model;
mod parser;

pub use model::Command;
pub use parser::{parse, parse_multiple, tokenize, validate};
