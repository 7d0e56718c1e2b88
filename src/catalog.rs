use ignore::{Walk, WalkBuilder};
use std::path::{Path, PathBuf};

const CLASS_SUFFIX: &str = ".class";

/// Lazily yields the fully-qualified name of every `.class` file under an
/// extracted jar. Inner and synthetic classes are reported like any other.
pub struct ClassNames {
    root: PathBuf,
    walk: Walk,
}

pub fn catalog(root: &Path) -> ClassNames {
    let walk = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build();
    ClassNames {
        root: root.to_path_buf(),
        walk,
    }
}

impl Iterator for ClassNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for entry in self.walk.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(root = %self.root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if let Some(fqn) = class_name_from_path(&self.root, entry.path()) {
                return Some(fqn);
            }
        }
        None
    }
}

/// `root/com/example/Widget.class` -> `com.example.Widget`.
pub fn class_name_from_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let dotted = parts.join(".");
    let fqn = dotted.strip_suffix(CLASS_SUFFIX)?;
    if fqn.is_empty() {
        return None;
    }
    Some(fqn.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn touch(root: &Path, rel: &str) -> Result<()> {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"")?;
        Ok(())
    }

    #[test]
    fn derives_dotted_name_from_relative_path() {
        let root = Path::new("/tmp/x");
        assert_eq!(
            class_name_from_path(root, &root.join("com/example/Widget.class")),
            Some("com.example.Widget".to_string())
        );
        assert_eq!(
            class_name_from_path(root, &root.join("Top.class")),
            Some("Top".to_string())
        );
        assert_eq!(class_name_from_path(root, &root.join("com/example/readme.txt")), None);
        assert_eq!(class_name_from_path(root, &root.join(".class")), None);
    }

    #[test]
    fn catalog_lists_classes_including_inner_ones() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "com/example/Widget.class")?;
        touch(dir.path(), "com/example/Widget$Inner.class")?;
        touch(dir.path(), "com/example/package-info.java")?;
        touch(dir.path(), "META-INF/MANIFEST.MF")?;
        touch(dir.path(), ".hidden/Secret.class")?;

        let mut classes: Vec<String> = catalog(dir.path()).collect();
        classes.sort();
        assert_eq!(
            classes,
            vec![
                ".hidden.Secret".to_string(),
                "com.example.Widget".to_string(),
                "com.example.Widget$Inner".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn gitignore_files_inside_jar_are_not_honoured() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "org/A.class")?;
        std::fs::write(dir.path().join(".gitignore"), "*.class\n")?;
        std::fs::write(dir.path().join(".ignore"), "org/\n")?;

        let classes: Vec<String> = catalog(dir.path()).collect();
        assert_eq!(classes, vec!["org.A".to_string()]);
        Ok(())
    }

    #[test]
    fn empty_tree_yields_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(catalog(dir.path()).count(), 0);
        Ok(())
    }
}
