// crates/model-gate-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and placeholder substitution for CLI output.
// Purpose: Centralize user-facing strings so wording stays consistent.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! Every line the `model-gate` binary prints is looked up in a static catalog
//! by key and formatted through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys render as the key itself.
//! - Placeholder substitutions apply in argument order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English message templates.
const CATALOG: &[(&str, &str)] = &[
    ("main.version", "model-gate {version}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config validated successfully."),
    ("config.show.failed", "Failed to render config: {error}"),
    ("service.init_failed", "Failed to initialize verification service: {error}"),
    ("verify.path.invalid", "Artifact path must name a file: {path}"),
    ("verify.inspect_failed", "Failed to inspect artifact {path}: {error}"),
    ("verify.render_failed", "Failed to render verification outcome: {error}"),
    ("verify.text.header", "{model_id}: {status} ({elapsed} ms)"),
    ("verify.text.passed", "  PASS {name}"),
    ("verify.text.failed", "  FAIL {name}: {message}"),
    ("verify.text.warning", "  WARN {name}: {message}"),
    ("event.read_failed", "Failed to read event file {path}: {error}"),
    ("event.too_large", "Event file {path} exceeds size limit ({size} > {limit} bytes)"),
    ("event.not_utf8", "Event file {path} is not valid UTF-8"),
    ("registry.not_sqlite", "Registry queries require [registry] type = \"sqlite\" with a path"),
    ("registry.open_failed", "Failed to open registry: {error}"),
    ("registry.get.failed", "Failed to read registry record: {error}"),
    ("registry.get.not_found", "No registry record for model {model_id}"),
    ("registry.render_failed", "Failed to render registry record: {error}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
];

/// Returns the message catalog.
pub(crate) fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Renders `key` from the catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
