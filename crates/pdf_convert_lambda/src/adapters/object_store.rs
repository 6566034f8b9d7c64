use std::fs;
use std::path::{Path, PathBuf};

/// Object storage seen by the dispatcher. Collaborator failures stay opaque.
pub trait ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String>;
    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        (**self).get_object(bucket, key)
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        (**self).put_object(bucket, key, body)
    }
}

/// Directory-backed store: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, String> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(format!("invalid bucket name '{bucket}'"));
        }

        let mut path = self.root.join(bucket);
        let mut has_segment = false;
        for segment in key.split('/').filter(|segment| !segment.is_empty()) {
            if segment == "." || segment == ".." || segment.contains('\\') {
                return Err(format!("object key '{key}' escapes its bucket"));
            }
            path.push(segment);
            has_segment = true;
        }
        if !has_segment {
            return Err(format!("object key '{key}' is empty"));
        }
        Ok(path)
    }
}

impl ObjectStore for FsObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|error| format!("failed to read '{}': {error}", path.display()))
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                format!("failed to create directory '{}': {error}", parent.display())
            })?;
        }
        fs::write(&path, body)
            .map_err(|error| format!("failed to write '{}': {error}", path.display()))
    }
}
