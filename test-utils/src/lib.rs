//! Shared test utilities for the cangen workspace.
//!
//! This crate provides common helpers for loading IR fixtures, comparing
//! generated code, and other test utilities shared across multiple crates.

use std::fs;
use std::path::PathBuf;

/// Returns the path to the workspace-level testdata directory.
///
/// This resolves the path relative to the workspace root, not the individual
/// crate.
pub fn testdata_dir() -> PathBuf {
    // CARGO_MANIFEST_DIR points to the crate using this library,
    // so we need to find the workspace root by looking for testdata/
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let candidates = [
        manifest_dir.join("../testdata"),
        manifest_dir.join("../../testdata"),
        manifest_dir.join("testdata"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return candidate.canonicalize().unwrap_or_else(|_| candidate.clone());
        }
    }

    manifest_dir.join("../testdata")
}

/// Returns the path to a fixture file.
///
/// # Arguments
///
/// * `category` - "valid" or "invalid"
/// * `filename` - Name of the IR file (e.g., "single_bit.ir.yaml")
pub fn fixture_path(category: &str, filename: &str) -> PathBuf {
    testdata_dir().join(category).join(filename)
}

/// Loads an IR fixture file from the testdata directory.
///
/// # Arguments
///
/// * `category` - "valid" or "invalid"
/// * `filename` - Name of the IR file (e.g., "single_bit.ir.yaml")
///
/// # Panics
///
/// Panics if the file cannot be read.
pub fn load_fixture(category: &str, filename: &str) -> String {
    let path = fixture_path(category, filename);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

/// Asserts that generated code contains all expected fragments.
///
/// # Arguments
///
/// * `generated` - The generated code string
/// * `expected_fragments` - Slice of strings that must all appear in the generated code
///
/// # Panics
///
/// Panics with a descriptive message if any fragment is missing.
pub fn assert_code_contains(generated: &str, expected_fragments: &[&str]) {
    for fragment in expected_fragments {
        assert!(
            generated.contains(fragment),
            "Generated code missing fragment: '{}'\n\nGenerated code (first 1000 chars):\n{}",
            fragment,
            &generated.chars().take(1000).collect::<String>()
        );
    }
}

/// Asserts that generated code does NOT contain any of the given fragments.
///
/// # Arguments
///
/// * `generated` - The generated code string
/// * `forbidden_fragments` - Slice of strings that must NOT appear in the generated code
///
/// # Panics
///
/// Panics with a descriptive message if any fragment is found.
pub fn assert_code_not_contains(generated: &str, forbidden_fragments: &[&str]) {
    for fragment in forbidden_fragments {
        assert!(
            !generated.contains(fragment),
            "Generated code contains forbidden fragment: '{}'",
            fragment
        );
    }
}

/// Returns the workspace root directory.
fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    // test-utils is directly under workspace root
    manifest_dir.parent().unwrap().to_path_buf()
}

/// Creates a temporary test file and returns its path.
///
/// Files are created in the workspace's `target/test_temp/` directory.
///
/// # Arguments
///
/// * `content` - Content to write to the file
/// * `extension` - File extension (e.g., "yaml", "c")
pub fn create_temp_file(content: &str, extension: &str) -> PathBuf {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let temp_dir = workspace_root().join("target").join("test_temp");
    fs::create_dir_all(&temp_dir).expect("Failed to create temp dir");

    // Combination of process ID, timestamp, thread ID hash and counter for
    // uniqueness across parallel test threads.
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

    let thread_id = std::thread::current().id();
    let mut hasher = DefaultHasher::new();
    thread_id.hash(&mut hasher);
    let thread_hash = hasher.finish();

    let filename = format!(
        "test_{}_{}_{:x}_{}.{}",
        std::process::id(),
        counter,
        thread_hash,
        timestamp,
        extension
    );
    let path = temp_dir.join(filename);

    let mut file = fs::File::create(&path).expect("Failed to create temp file");
    file.write_all(content.as_bytes()).expect("Failed to write temp file");

    path
}

/// Creates a unique empty directory under `target/test_temp/` and returns it.
pub fn create_temp_dir() -> PathBuf {
    let marker = create_temp_file("", "dir");
    let dir = marker.with_extension("d");
    fs::remove_file(&marker).ok();
    fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}
