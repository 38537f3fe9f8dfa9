//! Per-file entry point.
//!
//! `transform_source` parses one file, classifies its worklets, builds each
//! one's closure, text, hash and flags, then splices the registration
//! wrappers into the source. A file without worklets comes back unchanged.

#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureTrie;
use crate::classify::{WorkletClassifier, WorkletSite};
#[cfg(feature = "napi")]
use crate::codegen::string_hash_64;
use crate::config::{Globals, TransformOptions};
use crate::emit::Emitter;
use crate::validate::{CompilerError, ERR_SYNTAX};

/// Read-only view of the file being transformed, shared by every worklet in it.
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'s> {
    pub source: &'s str,
    pub file_path: &'s str,
    pub source_type: SourceType,
    pub globals: &'s Globals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkletRecord {
    pub name: String,
    pub closure: CaptureTrie,
    /// Object literal attached as `_closure`.
    pub closure_source: String,
    pub source_text: String,
    pub content_hash: u64,
    pub location: String,
    pub optimization_flags: u32,
}

impl From<&WorkletSite> for WorkletRecord {
    fn from(site: &WorkletSite) -> Self {
        let unit = &site.unit;
        WorkletRecord {
            name: unit.name.clone(),
            closure: unit.closure.clone(),
            closure_source: unit.closure.closure_source(),
            source_text: unit.source_text.clone(),
            content_hash: unit.content_hash,
            location: unit.location.clone(),
            optimization_flags: unit.flags.bits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    /// In source order.
    pub worklets: Vec<WorkletRecord>,
}

pub fn source_type_for(file_path: &str) -> SourceType {
    SourceType::from_path(file_path).unwrap_or_else(|_| SourceType::mjs().with_jsx(true))
}

pub fn transform_source(
    source: &str,
    file_path: &str,
    options: &TransformOptions,
) -> Result<TransformOutput, CompilerError> {
    let globals = Globals::from_options(options)?;
    transform_with_globals(source, file_path, &globals, &options.registration_hook)
}

/// Same as [`transform_source`] with configuration already validated, for
/// batch runs that share one [`Globals`] across files.
pub fn transform_with_globals(
    source: &str,
    file_path: &str,
    globals: &Globals,
    registration_hook: &str,
) -> Result<TransformOutput, CompilerError> {
    let source_type = source_type_for(file_path);
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();

    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset() as u32)
            .unwrap_or(0);
        return Err(CompilerError::at_offset(
            ERR_SYNTAX,
            &err.to_string(),
            file_path,
            source,
            offset,
        ));
    }

    let ctx = FileContext {
        source,
        file_path,
        source_type,
        globals,
    };
    let sites = WorkletClassifier::new(&ctx).classify(&ret.program)?;
    if sites.is_empty() {
        tracing::trace!(file = file_path, "no worklets");
        return Ok(TransformOutput {
            code: source.to_string(),
            worklets: vec![],
        });
    }

    let code = Emitter::new(source, file_path, registration_hook, &sites).emit()?;
    let worklets: Vec<WorkletRecord> = sites.iter().map(WorkletRecord::from).collect();
    tracing::debug!(file = file_path, count = worklets.len(), "worklets emitted");

    Ok(TransformOutput { code, worklets })
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Transforms one file. Returns `TransformOutput` as JSON.
#[cfg(feature = "napi")]
#[napi]
pub fn transform_worklets_native(
    source: String,
    file_path: String,
    options_json: Option<String>,
) -> napi::Result<String> {
    let options = TransformOptions::from_json(options_json.as_deref().unwrap_or(""))
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let output = transform_source(&source, &file_path, &options)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_string(&output)
        .map_err(|e| napi::Error::from_reason(format!("Serialize error: {}", e)))
}

/// Content hash of a serialized worklet, as a decimal string.
#[cfg(feature = "napi")]
#[napi]
pub fn worklet_hash_native(text: String) -> String {
    string_hash_64(&text).to_string()
}
