use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Normalized filesystem lifecycle event for a single path.
///
/// Heterogeneous native notifications (and the initial scan's synthetic
/// events) all collapse into this one tagged value; the synchronizer is a
/// single dispatch over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileEvent {
    Created { path: PathBuf },
    Deleted { path: PathBuf },
    Moved { from: PathBuf, to: PathBuf },
    Modified { path: PathBuf },
}

impl FileEvent {
    /// The path that determines which serialization unit handles this
    /// event. A move routes by its old path: that is the record being
    /// mutated in the store.
    pub fn routing_path(&self) -> &Path {
        match self {
            FileEvent::Created { path }
            | FileEvent::Deleted { path }
            | FileEvent::Modified { path } => path,
            FileEvent::Moved { from, .. } => from,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FileEvent::Created { .. } => "created",
            FileEvent::Deleted { .. } => "deleted",
            FileEvent::Moved { .. } => "moved",
            FileEvent::Modified { .. } => "modified",
        }
    }
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileEvent::Moved { from, to } => {
                write!(f, "moved {} -> {}", from.display(), to.display())
            }
            other => write!(f, "{} {}", other.kind(), other.routing_path().display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moved_routes_by_old_path() {
        let event = FileEvent::Moved {
            from: PathBuf::from("/nas/a.pdf"),
            to: PathBuf::from("/nas/b.pdf"),
        };
        assert_eq!(event.routing_path(), Path::new("/nas/a.pdf"));
    }
}
