//! Core type definitions for Sieve
//!
//! Content type bits and format constants shared by the compiler, the
//! matching predicate and the persistence record format.

// =============================================================================
// Constants
// =============================================================================

/// Length of the literal substring an external indexer uses for pre-screening.
pub const SHORTCUT_LENGTH: usize = 8;

/// Version of the record layout written by [`crate::record`].
pub const FORMAT_VERSION: u32 = 3;

/// Content type mask of a filter without type options.
pub const DEFAULT_CONTENT_MASK: u32 = 0x7FFF_FFFF;

// =============================================================================
// Content Types (bit mask for type filtering)
// =============================================================================

bitflags::bitflags! {
    /// Resource type bit mask.
    ///
    /// Bit values are part of the persisted record format and must not change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContentType: u32 {
        const OTHER = 1;
        const SCRIPT = 2;
        const IMAGE = 4;
        const STYLESHEET = 8;
        const OBJECT = 16;
        const SUBDOCUMENT = 32;  // iframe/frame
        const DOCUMENT = 64;     // top-level page
        const BACKGROUND = 256;
        const XBL = 512;
        const PING = 1024;
        const XMLHTTPREQUEST = 2048;
        const OBJECT_SUBREQUEST = 4096;
        const DTD = 8192;
        const MEDIA = 16384;
    }
}

impl ContentType {
    /// Parse a request type as reported by the host (case-insensitive, `-` or `_`).
    ///
    /// Unknown names map to `OTHER`. Option names (`SCRIPT`, `OBJECT_SUBREQUEST`)
    /// go through the generated `from_name`.
    pub fn from_request_type(s: &str) -> Self {
        let name = s.trim().to_ascii_uppercase().replace('-', "_");
        match name.as_str() {
            "MAIN_FRAME" => Self::DOCUMENT,
            "SUB_FRAME" => Self::SUBDOCUMENT,
            "XHR" => Self::XMLHTTPREQUEST,
            other => Self::from_name(other).unwrap_or(Self::OTHER),
        }
    }
}

// =============================================================================
// Restore Options
// =============================================================================

/// Supplied by the persistence layer when restoring records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Format version the records were written with.
    pub stored_version: u32,
}

impl RestoreOptions {
    /// Structured fields of regex-based records are only trusted when the
    /// stored layout matches the current one.
    pub fn is_trusted(&self) -> bool {
        self.stored_version == FORMAT_VERSION
    }
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            stored_version: FORMAT_VERSION,
        }
    }
}
