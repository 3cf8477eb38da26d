//! CSV import plumbing (spec §4.4, C7): parsing, sanitizing, and member
//! name resolution shared by both CSV import use cases.

pub mod matcher;
pub mod parser;

pub use matcher::{MatchKind, MemberMatcher};
pub use parser::{parse, sanitize_cell, CsvRow, ParsedCsv};
