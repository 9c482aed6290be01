use std::path::{Path, PathBuf};

use globwalk::{FileType, GlobWalkerBuilder};

/// Directory holding this test crate's fixtures.
pub fn tests_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests")
}

/// Calls `f` for each file under `base` matching `pattern`, in a stable order.
pub fn glob_exec<F: FnMut(&Path)>(base: &Path, pattern: &str, mut f: F) -> usize {
    let walker = GlobWalkerBuilder::new(base, pattern)
        .case_insensitive(true)
        .file_type(FileType::FILE)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .build()
        .unwrap();

    let mut count = 0;
    for file in walker {
        let file = file.unwrap();
        f(file.path());
        count += 1;
    }
    count
}
