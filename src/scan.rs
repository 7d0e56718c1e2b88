use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Every `*.jar` file at any depth under `base_path`, in no particular order.
///
/// A symlink counts when its target is a file. Directory symlinks are not
/// followed.
pub fn scan_jars(base_path: &Path) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(
        base_path.is_dir(),
        "Jar directory does not exist: {}",
        base_path.display()
    );

    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let is_file = match entry.file_type() {
                        Some(t) if t.is_symlink() => path.is_file(),
                        Some(t) => t.is_file(),
                        None => false,
                    };
                    if is_file && path.extension().is_some_and(|e| e == "jar") {
                        let _ = tx.send(path.to_path_buf());
                    }
                }
                Err(err) => tracing::warn!(error = %err, "skipping unreadable path in jar directory"),
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    Ok(rx.iter().collect())
}

/// The dedup key of a jar: its base name, regardless of subdirectory.
pub fn jar_file_name(jar_path: &Path) -> Option<String> {
    jar_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
}
