//! `mhtconv`: convert MHTML web archives into standalone HTML.
//!
//! This crate provides the conversion core (container parsing, text
//! decoding, resource rewriting and splitting) together with the input and
//! persistence layers used by the command-line tool.

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod html;
pub mod input;
pub mod model;
pub mod parser;
pub mod resource;
pub mod split;
