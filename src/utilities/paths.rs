// Path Utilities
// Lexical path cleanup for the paths given on the command line

use std::io;
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Never climb above the root or a drive prefix
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Resolve a path relative to a base directory
pub fn resolve_path(base: &Path, relative: &str) -> PathBuf {
    if Path::new(relative).is_absolute() {
        normalize_path(Path::new(relative))
    } else {
        normalize_path(&base.join(relative))
    }
}

/// Absolute form of a user-supplied path, relative to the working directory
pub fn absolutize(path: &str) -> io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(resolve_path(&cwd, path))
}
