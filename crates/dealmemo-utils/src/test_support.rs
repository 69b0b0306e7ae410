//! Helpers shared by tests across the workspace.

use std::sync::{Mutex, MutexGuard, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serialize tests that mutate process environment variables.
///
/// Poisoned locks are recovered; a panicking test must not wedge the rest.
pub fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Check whether real LLM integration tests should run.
///
/// `DEALMEMO_SKIP_LLM_TESTS=1` always disables real LLM tests.
/// `DEALMEMO_REAL_LLM_TESTS=1` enables real LLM tests.
#[must_use]
pub fn llm_tests_enabled() -> bool {
    let flag = |name: &str| {
        std::env::var(name)
            .ok()
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
    if flag("DEALMEMO_SKIP_LLM_TESTS") {
        return false;
    }
    flag("DEALMEMO_REAL_LLM_TESTS")
}

/// A long fake credential that redaction must always mask.
#[must_use]
pub fn fake_api_key() -> String {
    let alphabet = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut out = String::from("sk-test-");
    let mut idx = 3;
    for _ in 0..40 {
        out.push(alphabet[idx] as char);
        idx = (idx + 7) % alphabet.len();
    }
    out
}
