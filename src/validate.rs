#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_SYNTAX: &str = "W-ERR-SYNTAX-001";
pub const ERR_REENTRANT: &str = "W-ERR-REENTRANT-001";
pub const ERR_SERIALIZE: &str = "W-ERR-SERIALIZE-001";
pub const ERR_CONFIG: &str = "W-ERR-CONFIG-001";
pub const ERR_IO: &str = "W-ERR-IO-001";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_SYNTAX => "Only files that parse are rewritten.",
        ERR_REENTRANT => "Every worklet definition is emitted exactly once per pass.",
        ERR_SERIALIZE => {
            "Every emitted worklet carries a valid serialized source and content hash."
        }
        ERR_CONFIG => "Configured globals are plain identifiers available in the target context.",
        ERR_IO => "Batch transforms report unreadable files instead of skipping them.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: error_type(code).to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }

    /// Error anchored at a byte offset of `source`.
    pub fn at_offset(code: &str, message: &str, file: &str, source: &str, offset: u32) -> Self {
        let loc = SourceLocation::from_offset(source, offset);
        Self::new(code, message, file, loc.line, loc.column)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

fn error_type(code: &str) -> &'static str {
    match code {
        ERR_REENTRANT => "COMPILER_INVARIANT_VIOLATION",
        ERR_CONFIG => "CONFIGURATION_ERROR",
        ERR_IO => "IO_ERROR",
        _ => "COMPILATION_ERROR",
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(
                f,
                "[{}] {} at {}({}:{})",
                self.code, self.message, self.file, self.line, self.column
            )
        }
    }
}

impl std::error::Error for CompilerError {}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE LOCATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// 1-based line, 0-based column (in characters), the convention JS tooling
/// uses for diagnostics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn from_offset(source: &str, offset: u32) -> Self {
        let offset = (offset as usize).min(source.len());
        let prefix = source.get(..offset).unwrap_or(source);
        let line_start = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
        SourceLocation {
            line: prefix.matches('\n').count() as u32 + 1,
            column: prefix[line_start..].chars().count() as u32,
        }
    }
}
