//! Parser options for controlling strict/permissive behaviour.

use crate::error::{Error, Result};

/// Parser options for controlling error handling and recovery behavior.
///
/// Every repair heuristic in the reader consults [`ParserOptions::strict`]: in strict
/// mode the heuristic raises a [`Error::ReadError`], otherwise it logs a warning and
/// carries on with a best-effort value.
///
/// # Example
///
/// ```
/// use pdf_objgraph::parser_config::ParserOptions;
///
/// let strict = ParserOptions::strict();
/// assert!(strict.strict);
///
/// let custom = ParserOptions {
///     max_nesting: 32,
///     ..ParserOptions::lenient()
/// };
/// assert!(!custom.strict);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Raise on every recoverable structural problem instead of repairing it.
    pub strict: bool,

    /// Maximum array/dictionary nesting inside a single value.
    ///
    /// PDF Spec: ISO 32000-1:2008, Section H.1 - Implementation Limits
    pub max_nesting: usize,

    /// Maximum depth of recursive indirect-object resolution.
    pub max_recursion_depth: u32,

    /// Maximum number of `/Prev` links followed when loading cross-reference sections.
    pub max_xref_chain: usize,

    /// Maximum decoded stream size in bytes (0 disables the check).
    pub max_decompressed_size: usize,

    /// Maximum source size in bytes (0 disables the check).
    pub max_file_size: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserOptions {
    /// Strict mode: any structural irregularity is an error.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::lenient()
        }
    }

    /// Permissive mode: repair what can be repaired and log it.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            max_nesting: 100,
            max_recursion_depth: 100,
            max_xref_chain: 100,
            max_decompressed_size: 100 * 1024 * 1024, // 100 MB
            max_file_size: 500 * 1024 * 1024,         // 500 MB
        }
    }

    /// Permissive mode with raised limits, for heavily damaged files.
    pub fn very_lenient() -> Self {
        Self {
            strict: false,
            max_nesting: 200,
            max_recursion_depth: 200,
            max_xref_chain: 1000,
            max_decompressed_size: 200 * 1024 * 1024,
            max_file_size: 0,
        }
    }

    /// Gate for a tolerance branch.
    ///
    /// Returns `Err(ReadError)` in strict mode; otherwise logs `message` as a warning
    /// and returns `Ok(())` so the caller can apply its repair.
    pub(crate) fn tolerate(&self, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        if self.strict {
            Err(Error::ReadError(message.to_string()))
        } else {
            log::warn!("{}", message);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode() {
        let opts = ParserOptions::strict();
        assert!(opts.strict);
        assert_eq!(opts.max_nesting, 100);
    }

    #[test]
    fn test_lenient_mode_is_default() {
        let opts = ParserOptions::default();
        assert!(!opts.strict);
        assert_eq!(opts.max_xref_chain, 100);
    }

    #[test]
    fn test_tolerate() {
        let strict = ParserOptions::strict();
        match strict.tolerate("bad offset") {
            Err(Error::ReadError(msg)) => assert_eq!(msg, "bad offset"),
            other => panic!("expected ReadError, got {:?}", other),
        }

        assert!(ParserOptions::lenient().tolerate("bad offset").is_ok());
        assert!(ParserOptions::very_lenient().tolerate("bad offset").is_ok());
    }
}
