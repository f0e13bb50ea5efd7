use std::fs;
use std::path::{Path, PathBuf};

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn load_fixture(relative: &str) -> String {
    fs::read_to_string(fixture_path(relative))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", relative))
}

/// Copy a fixture into `dir`, keeping its file name.
pub fn copy_fixture(relative: &str, dir: &Path) -> PathBuf {
    let target = dir.join(relative);
    fs::copy(fixture_path(relative), &target)
        .unwrap_or_else(|_| panic!("Failed to copy fixture: {}", relative));
    target
}

/// Cleaned CSV lines, without the BOM.
pub fn read_clean_csv(path: &Path) -> Vec<String> {
    let bytes = fs::read(path).unwrap_or_else(|_| panic!("Missing output: {}", path.display()));
    assert!(
        bytes.starts_with(b"\xEF\xBB\xBF"),
        "output should start with a UTF-8 BOM: {}",
        path.display()
    );
    String::from_utf8_lossy(&bytes[3..])
        .lines()
        .map(str::to_string)
        .collect()
}
