//! Persistence of conversion results: HTML chunks, extracted files and the
//! debug report.

pub mod html;
pub mod report;
