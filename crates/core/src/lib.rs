#![forbid(unsafe_code)]

pub mod hier;
pub mod matcher;

/// Identifier of a tag row. Absence of a parent is expressed as `None`,
/// never as a sentinel value.
pub type TagId = i64;
