use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Flat-file blob store for uploaded originals and synthesized audio.
///
/// Files live under a single root, grouped by purpose ("uploads", "audio").
/// Database rows hold the absolute paths returned by [`BlobStore::store`].
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores content under `relative_directory` as `filename.extension`.
    /// Name collisions get a numeric suffix instead of overwriting.
    pub fn store(
        &self,
        content: &[u8],
        relative_directory: &str,
        filename: &str,
        extension: &str,
    ) -> Result<PathBuf, StorageError> {
        let dir_path = self.root.join(relative_directory);
        self.ensure_directory(&dir_path)?;

        let full_filename = format!("{}.{}", filename, extension);
        self.store_with_atomic_creation(&dir_path, &full_filename, content)
    }

    /// Stores content using atomic file creation to avoid race conditions
    /// when two writers pick the same name.
    fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        use std::io::Write;

        let (base, ext) = if let Some(dot_pos) = filename.rfind('.') {
            (&filename[..dot_pos], Some(&filename[dot_pos..]))
        } else {
            (filename, None)
        };

        // Try original filename first, then numbered variants
        for counter in 1..=1000 {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };

            let try_path = dir_path.join(&try_filename);

            // Use OpenOptions with create_new for atomic creation (O_CREAT | O_EXCL)
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    // File exists, try next number
                    continue;
                }
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        // Exhausted all attempts
        Err(StorageError::FileExists(dir_path.join(filename)))
    }

    /// Reads a stored blob back.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>, StorageError> {
        let path = path.as_ref();
        std::fs::read(path).map_err(|e| StorageError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Removes a stored blob. A missing file is not an error; the row it
    /// backed may already be gone from a previous cleanup.
    pub fn remove<P: AsRef<Path>>(&self, path: P) -> Result<(), StorageError> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Blob already removed: {}", path.display());
                Ok(())
            }
            Err(e) => Err(StorageError::RemoveFile {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}
