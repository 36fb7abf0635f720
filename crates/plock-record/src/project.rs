//! Project file enumeration.
//!
//! Leaf order is part of the Merkle commitment, so listers must return
//! files in a stable order. [`DirectoryLister`] sorts by `/`-separated
//! relative path, which gives the same order on every platform.

use crate::merkle::MerkleTree;
use crate::models::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Directories never included in a project commitment.
const SKIPPED_DIRS: &[&str] = &[".git"];

/// A file belonging to a project, with its contents loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    /// Path relative to the project root, `/`-separated.
    pub relative_path: String,

    /// Raw file contents.
    pub contents: Vec<u8>,
}

/// Enumerates the files that make up a project.
pub trait FileLister {
    /// Lists the project's files in commitment order.
    fn list_project_files(&self, root: &Path) -> Result<Vec<ProjectFile>>;
}

/// Recursive directory walker.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryLister;

impl DirectoryLister {
    fn walk(&self, root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                let skipped = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name));
                if !skipped {
                    self.walk(root, &path, out)?;
                }
            } else if file_type.is_file() || (file_type.is_symlink() && links_to_file(&path)) {
                out.push(path);
            }
        }
        Ok(())
    }
}

/// True if `path` resolves to a regular file. Dangling links and links to
/// directories are not followed.
fn links_to_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

impl FileLister for DirectoryLister {
    fn list_project_files(&self, root: &Path) -> Result<Vec<ProjectFile>> {
        let mut paths = Vec::new();
        self.walk(root, root, &mut paths)?;

        let mut files = paths
            .into_iter()
            .map(|path| {
                let relative_path = relative_slash_path(root, &path);
                let contents = fs::read(&path)?;
                Ok(ProjectFile {
                    relative_path,
                    contents,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        tracing::debug!(root = %root.display(), files = files.len(), "listed project files");
        Ok(files)
    }
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Lists `root` with `lister` and computes the Merkle root of the result.
///
/// Returns the root together with the files it commits to.
///
/// # Errors
///
/// Returns `RecordError::Io` if listing fails and
/// `RecordError::EmptyInput` if the project has no files.
pub fn project_root(lister: &dyn FileLister, root: &Path) -> Result<(String, Vec<ProjectFile>)> {
    let files = lister.list_project_files(root)?;
    let mut tree = MerkleTree::new();
    for file in &files {
        tree.push_content(&file.contents);
    }
    Ok((tree.root()?, files))
}
