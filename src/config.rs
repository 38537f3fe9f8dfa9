//! Pass configuration.
//!
//! Options arrive once per invocation (usually as JSON over Node-API) and are
//! frozen into a [`Globals`] snapshot before any file is touched.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::tables::{BUILTIN_GLOBALS, DEFAULT_REGISTRATION_HOOK};
use crate::validate::{CompilerError, ERR_CONFIG};

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref HOOK_RE: Regex =
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap();
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Extra bindings available natively in the target context.
    pub globals: Vec<String>,
    /// Expression called with every emitted worklet.
    pub registration_hook: String,
    /// Enables the incremental cache for batch transforms.
    pub cache_dir: Option<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            globals: Vec::new(),
            registration_hook: DEFAULT_REGISTRATION_HOOK.to_string(),
            cache_dir: None,
        }
    }
}

impl TransformOptions {
    /// Parses options JSON. An empty string means defaults.
    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| {
            CompilerError::new(ERR_CONFIG, &format!("Invalid options: {}", e), "", 0, 0)
        })
    }

    pub fn with_globals<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.globals.extend(names.into_iter().map(Into::into));
        self
    }

    /// Stable string covering every option that changes emitted code.
    pub fn fingerprint(&self) -> String {
        let mut globals = self.globals.clone();
        globals.sort();
        globals.dedup();
        format!("{}|{}", self.registration_hook, globals.join(","))
    }
}

/// Immutable allow-list of names never captured: the built-in table plus the
/// globals configured for this run.
#[derive(Debug, Clone)]
pub struct Globals {
    extra: HashSet<String>,
}

impl Globals {
    pub fn builtin() -> Self {
        Globals {
            extra: HashSet::new(),
        }
    }

    pub fn from_options(options: &TransformOptions) -> Result<Self, CompilerError> {
        if !HOOK_RE.is_match(&options.registration_hook) {
            return Err(CompilerError::new(
                ERR_CONFIG,
                &format!(
                    "Registration hook '{}' is not a dotted identifier path.",
                    options.registration_hook
                ),
                "",
                0,
                0,
            ));
        }

        let mut extra = HashSet::new();
        for name in &options.globals {
            if !IDENT_RE.is_match(name) {
                return Err(CompilerError::with_details(
                    ERR_CONFIG,
                    &format!("Global '{}' is not a valid identifier.", name),
                    "",
                    0,
                    0,
                    None,
                    vec!["Globals name bindings, not expressions or member paths.".to_string()],
                ));
            }
            if !BUILTIN_GLOBALS.contains(name.as_str()) {
                extra.insert(name.clone());
            }
        }
        Ok(Globals { extra })
    }

    pub fn contains(&self, name: &str) -> bool {
        BUILTIN_GLOBALS.contains(name) || self.extra.contains(name)
    }
}
