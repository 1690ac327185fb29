//! The sanitize pipeline: prompt, guarded completion, recovery.

use tracing::info;
use veil_common::{prompt, recovery, SanitizeResult};

use crate::error::SanitizeError;
use crate::guard;
use crate::server::AppState;

/// Sanitize `text` end to end.
///
/// Malformed model output is never an error here; only an unavailable backend,
/// a failed completion, or a timeout are.
pub async fn sanitize(state: &AppState, text: &str) -> Result<SanitizeResult, SanitizeError> {
    if state.config.ollama.auto_start && !state.supervisor.ensure_running().await {
        return Err(SanitizeError::BackendUnavailable);
    }

    let prompt = prompt::compose(text);
    let backend = state.backend.clone();

    let raw = guard::with_timeout(move || backend.complete(&prompt), state.sanitize_timeout).await?;
    info!("  Completion received ({} bytes)", raw.len());

    Ok(recovery::recover(&raw))
}
