//! Lexical path helpers.

use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against `base` and strip `.`/`..` components.
///
/// This never touches the filesystem, so paths that do not exist (yet) still
/// compare equal to the allowlist and ledger entries they were written as.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays at the root
                if normalized.parent().is_some() {
                    normalized.pop();
                }
            }
            Component::Prefix(prefix) => {
                normalized = PathBuf::from(prefix.as_os_str());
            }
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}
