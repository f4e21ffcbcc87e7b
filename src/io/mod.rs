pub mod backend;
pub mod json_io;
pub mod memory;
pub mod object_storage;
pub mod records;

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

pub use backend::{Backend, BackendError, Collection, Filter, Order, Record};
pub use json_io::JsonFileBackend;
pub use memory::MemoryBackend;
pub use object_storage::{DirectoryStorage, ObjectStorage};

/// Writes `content` next to `path` in a temp file, syncs it, then renames it
/// over `path`.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.as_file().sync_all()?;

    match temp_file.persist(path) {
        Ok(_) => Ok(()),
        Err(err) => {
            if err.error.kind() == io::ErrorKind::AlreadyExists {
                std::fs::remove_file(path)?;
                err.file.persist(path).map(|_| ()).map_err(|e| e.error)
            } else {
                Err(err.error)
            }
        }
    }
}

pub(crate) fn atomic_write_string(path: &Path, content: &str) -> io::Result<()> {
    atomic_write(path, content.as_bytes())
}
