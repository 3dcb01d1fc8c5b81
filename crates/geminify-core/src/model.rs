//! Model selection.
//!
//! A command may bind its own model, defer to the global choice with the
//! `"default"` sentinel, or leave the model unset entirely.

use crate::config::Preferences;

/// Per-command model value meaning "use whatever is configured globally".
pub const DEFAULT_MODEL_SENTINEL: &str = "default";

/// The high-latency reasoning variant whose thinking budget can be switched off.
pub const THINKING_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Resolves the model for one request.
///
/// Precedence: the per-call model unless absent or `"default"`, then the
/// global custom model when non-empty after trimming, then the global default.
pub fn resolve_model(per_call: Option<&str>, global_custom: Option<&str>, global_default: &str) -> String {
    if let Some(model) = per_call {
        if model != DEFAULT_MODEL_SENTINEL {
            return model.to_string();
        }
    }

    match global_custom {
        Some(custom) if !custom.trim().is_empty() => custom.to_string(),
        _ => global_default.to_string(),
    }
}

/// Same as [`resolve_model`], reading the global values from preferences.
pub fn resolve_with_preferences(per_call: Option<&str>, prefs: &Preferences) -> String {
    resolve_model(per_call, prefs.custom_model.as_deref(), &prefs.model)
}

/// Whether a request must carry a zero thinking budget.
pub fn needs_zero_thinking_budget(disable_thinking: bool, resolved_model: &str) -> bool {
    disable_thinking && resolved_model == THINKING_MODEL
}
