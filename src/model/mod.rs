//! Core data model: MIME parts, the parsed container, and conversion output.

pub mod document;
pub mod output;
pub mod part;
