//! Resource resolution: indexing resource parts, finding references in the
//! HTML and rewriting them to extracted files or `data:` URIs.

pub mod index;
pub mod naming;
pub mod rewrite;
pub mod scan;

pub use index::ResourceIndex;
pub use rewrite::{rewrite, RewriteOutcome};
