//! Working-directory confinement for tool operations.
//!
//! Every path a tool touches goes through [`Workspace::resolve`], which
//! rejects anything that does not land inside the workspace root.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while resolving or listing workspace paths.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Access to path '{path}' is not allowed. Only paths within the current working directory are permitted.")]
    AccessDenied { path: String },

    #[error("Path not found: {path}")]
    NotFound { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Cannot resolve path {path}: {source}")]
    Resolve {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Error listing files in {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A directory tree the agent is allowed to operate in.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at `root`. The root must exist.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = fs::canonicalize(root.as_ref())?;
        debug!("Workspace root: {}", root.display());
        Ok(Self { root })
    }

    /// Workspace rooted at the process's current directory.
    pub fn current() -> io::Result<Self> {
        Self::new(std::env::current_dir()?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a user-supplied path to an absolute path inside the workspace.
    ///
    /// Relative paths are taken from the root. Components are walked one by
    /// one: symlinks are followed even when their target is missing, and `..`
    /// pops the path resolved so far. The target itself does not need to
    /// exist.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, WorkspaceError> {
        let candidate = Path::new(raw);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let resolved = resolve_symlinks(&joined).map_err(|source| WorkspaceError::Resolve {
            path: raw.to_string(),
            source,
        })?;

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            debug!("Rejected path outside workspace: {}", resolved.display());
            Err(WorkspaceError::AccessDenied {
                path: raw.to_string(),
            })
        }
    }

    /// List a directory's entries, sorted, with a trailing `/` on subdirectories.
    pub fn list_directory(&self, raw: &str) -> Result<Vec<String>, WorkspaceError> {
        let dir_path = self.resolve(raw)?;

        if !dir_path.exists() {
            return Err(WorkspaceError::NotFound {
                path: raw.to_string(),
            });
        }

        if !dir_path.is_dir() {
            return Err(WorkspaceError::NotADirectory {
                path: raw.to_string(),
            });
        }

        let io_err = |source| WorkspaceError::Io {
            path: raw.to_string(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir_path).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let name = entry.file_name().to_string_lossy().to_string();
            let suffix = if entry.path().is_dir() { "/" } else { "" };
            entries.push(format!("{}{}", name, suffix));
        }

        entries.sort();
        Ok(entries)
    }
}

/// Symlink hops allowed while resolving one path.
const MAX_SYMLINK_HOPS: usize = 40;

/// Resolve every symlink along `path`, including dangling ones.
fn resolve_symlinks(path: &Path) -> io::Result<PathBuf> {
    let mut pending: Vec<PathBuf> = components_of(path);
    let mut resolved = PathBuf::new();
    let mut hops = 0;

    while let Some(component) = pending.pop() {
        match component.components().next() {
            Some(Component::CurDir) | None => {}
            Some(Component::ParentDir) => {
                resolved.pop();
            }
            Some(Component::Normal(name)) => {
                let next = resolved.join(name);
                let is_symlink = fs::symlink_metadata(&next)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);

                if !is_symlink {
                    resolved = next;
                    continue;
                }

                hops += 1;
                if hops > MAX_SYMLINK_HOPS {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        "too many levels of symbolic links",
                    ));
                }

                // Absolute targets replace `resolved` when their root is pushed.
                let target = fs::read_link(&next)?;
                pending.extend(components_of(&target));
            }
            Some(other) => resolved.push(other.as_os_str()),
        }
    }

    Ok(resolved)
}

/// Components of `path` in reverse order, ready to be popped front-first.
fn components_of(path: &Path) -> Vec<PathBuf> {
    path.components()
        .rev()
        .map(|c| PathBuf::from(c.as_os_str()))
        .collect()
}
