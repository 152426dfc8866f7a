// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Besides plain storage, it can simulate the transient locks the retrying
/// operator exists to absorb: [`MockFileSystem::lock_for`] makes the next N
/// mutating operations on a path fail as if another process held it.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    locks: Arc<Mutex<HashMap<PathBuf, u32>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.files.lock().unwrap();
        self.insert_file(&mut files, path, content.into());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        self.ensure_dir_entry(&mut files, path.as_ref());
    }

    /// Fail the next `attempts` mutating operations on `path` with a
    /// locked-file error.
    pub fn lock_for(&self, path: impl AsRef<Path>, attempts: u32) {
        let mut locks = self.locks.lock().unwrap();
        locks.insert(path.as_ref().to_path_buf(), attempts);
    }

    fn check_lock(&self, path: &Path) -> Result<()> {
        let mut locks = self.locks.lock().unwrap();
        if let Some(remaining) = locks.get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(anyhow!(
                    "simulated lock: {:?} is in use by another process",
                    path
                ));
            }
        }
        Ok(())
    }

    fn insert_file(
        &self,
        files: &mut HashMap<PathBuf, MockEntry>,
        path: PathBuf,
        content: Vec<u8>,
    ) {
        files.insert(path.clone(), MockEntry::File(content));

        // Ensure parent directories exist implicitly for simplicity in this mock
        if let Some(parent) = path.parent() {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };

            self.ensure_dir_entry(files, parent);
            // Add this file to parent's children
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if !children.contains(&name.to_string()) {
                        children.push(name.to_string());
                    }
                }
            }
        }
    }

    fn ensure_dir_entry(&self, files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if !files.contains_key(path) {
            files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
            if let Some(parent) = path.parent() {
                let parent = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };

                if parent != path {
                    // Avoid infinite loop at root
                    self.ensure_dir_entry(files, parent);
                    // Add this dir to parent's children
                    if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                            if !children.contains(&name.to_string()) {
                                children.push(name.to_string());
                            }
                        }
                    }
                }
            }
        }
    }

    fn detach_from_parent(&self, files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if let Some(parent) = path.parent() {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    children.retain(|c| c != name);
                }
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let content = self.read(path)?;
        String::from_utf8(content).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.check_lock(path)?;
        self.add_file(path, contents);
        Ok(())
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        let content = self.read(src)?;
        self.check_lock(dst)?;
        self.add_file(dst, content);
        Ok(())
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        let content = self.read(src)?;
        self.check_lock(src)?;
        self.check_lock(dst)?;
        let mut files = self.files.lock().unwrap();
        files.remove(src);
        self.detach_from_parent(&mut files, src);
        self.insert_file(&mut files, dst.to_path_buf(), content);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.check_lock(path)?;
        let mut files = self.files.lock().unwrap();
        match files.remove(path) {
            Some(MockEntry::File(_)) => {
                self.detach_from_parent(&mut files, path);
                Ok(())
            }
            Some(entry) => {
                // Put it back; only files may be removed here.
                files.insert(path.to_path_buf(), entry);
                Err(anyhow!("Is a directory: {:?}", path))
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.check_lock(path)?;
        let mut files = self.files.lock().unwrap();
        if !matches!(files.get(path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        files.retain(|p, _| !p.starts_with(path));
        self.detach_from_parent(&mut files, path);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
