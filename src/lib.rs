//! djlint-ls: editor integration for the djLint template linter and formatter
//!
//! Every operation runs djLint as a subprocess, feeding the document on
//! stdin. The [`lsp`] module exposes formatting and diagnostics over the
//! Language Server Protocol; the remaining modules are usable on their own.

pub mod args;
pub mod config;
pub mod document;
pub mod errors;
pub mod exit_codes;
pub mod formatter;
pub mod interpreter;
pub mod isolated;
pub mod linter;
pub mod lsp;
pub mod parser;
pub mod runner;
pub mod suppression;

pub use config::Settings;
pub use document::Document;
pub use errors::DjlintError;
pub use runner::{Invocation, Runner};
