//! Sieve Filter Rule Compiler
//!
//! This crate turns filter list text into [`sv_core::Filter`] objects and
//! interns them so that identical lines share one filter.

pub mod elemhide;
pub mod options;
pub mod parser;
pub mod pattern;
pub mod registry;

pub use elemhide::compile_elemhide_filter;
pub use options::OptionPolicy;
pub use parser::{parse_filter_list, ListStats};
pub use pattern::{compile_url_filter, pattern_to_regexp};
pub use registry::{compile_filter, FilterRegistry};
