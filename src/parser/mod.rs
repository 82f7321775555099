//! MHTML parsing: container splitting, header decoding, transfer decoding,
//! and text decoding of the root document.

pub mod charset;
pub mod header;
pub mod mime;
pub mod transfer;
