/// Shared Test Helpers for Cross-Crate Use
///
/// This module provides centralized test utilities that can be used by
/// `common` itself and by the `typology` crate's test suites.
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Global counter for truly unique test identifiers across parallel tests
static GLOBAL_TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

static TEST_TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
});

/// Generate globally unique test identifiers that won't conflict across parallel tests
///
/// # Arguments
/// * `prefix` - A string prefix to identify the test type (e.g., "MSG", "TX")
///
/// # Returns
/// A unique string in the format: "{prefix}-{timestamp}-{counter}"
pub fn generate_unique_id(prefix: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", prefix, timestamp, counter)
}

/// Installs a test-writer tracing subscriber once per test binary.
///
/// Log output is captured by the test harness, so `cargo test -- --nocapture`
/// shows the processor's tracing events next to assertion failures.
pub fn init_test_tracing() {
    Lazy::force(&TEST_TRACING);
}

/// Creates a fresh, uniquely named directory under the system temp directory.
pub fn create_temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(generate_unique_id("typology-test"));
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

/// Writes `contents` to `dir/name`.
pub fn write_temp_file_in(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("failed to write temp file");
    path
}

/// Writes `contents` to `name` inside a fresh temp directory.
pub fn write_temp_file(name: &str, contents: &str) -> PathBuf {
    write_temp_file_in(&create_temp_dir(), name, contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_ids_do_not_repeat() {
        let a = generate_unique_id("MSG");
        let b = generate_unique_id("MSG");
        assert_ne!(a, b);
        assert!(a.starts_with("MSG-"));
    }
}
