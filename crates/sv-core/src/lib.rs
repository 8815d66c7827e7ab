//! Sieve Core Library
//!
//! This crate provides the filter types and the matching predicate of the
//! Sieve content filter. Filters are compiled from filter list text by
//! `sv-compiler`; this crate only evaluates and persists them.
//!
//! # Architecture
//!
//! Each filter list line becomes one [`Filter`]: a comment, an invalid
//! line, a blocking or exception filter backed by a regular expression, or
//! an element hiding rule. Filters are shared as `Arc<Filter>` and carry
//! their mutable state (disabled flag, hit counts) in atomics so the same
//! object can be listed by several subscriptions.
//!
//! # Modules
//!
//! - `types`: Content type bits and format constants
//! - `filter`: Filter variants, hit accounting state and the predicate
//! - `domain`: Document-domain restrictions
//! - `record`: Sparse `key=value` persistence records
//! - `matcher`: Linear block/exception decision over a filter set
//! - `cosmetic`: Element hiding selectors per document domain
//! - `psl`: Host suffix walking and registrable-domain heuristic
//! - `url`: Host extraction without allocations
//! - `hash`: xxHash helpers for element hiding keys

pub mod cosmetic;
pub mod domain;
pub mod filter;
pub mod hash;
pub mod matcher;
pub mod psl;
pub mod record;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use cosmetic::ElemHideSet;
pub use domain::DomainRestriction;
pub use filter::{ActiveState, ElemHideFilter, Filter, FilterError, FilterKind, RegexpFilter, RegexpOptions};
pub use matcher::{FilterMatcher, MatchDecision, RequestContext};
pub use record::FilterRecord;
pub use types::{ContentType, RestoreOptions, DEFAULT_CONTENT_MASK, FORMAT_VERSION, SHORTCUT_LENGTH};
