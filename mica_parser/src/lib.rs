//! Textual IL front-end for the Mica workbench
//!
//! Parses IL source into a CFG plus metadata store and prints them
//! back out. The round trip is exact modulo whitespace and comment
//! normalization: `parse(print(cfg, meta))` is structurally identical
//! to `(cfg, meta)`.

pub mod parser;
pub mod printer;

pub use parser::parse;
pub use printer::print;
