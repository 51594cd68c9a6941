//! One JSON file per key under a root directory, replaced atomically.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fcommon::BoxFuture;

use crate::backend::KeyValueStore;
use crate::error::MemoryError;

#[derive(Debug)]
pub struct FilesystemKeyValueStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FilesystemKeyValueStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|error| {
            MemoryError::storage(format!("failed to create filesystem backend root: {error}"))
        })?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", hex_encode(key.as_bytes())))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, MemoryError> {
        self.lock
            .lock()
            .map_err(|_| MemoryError::storage("filesystem backend lock poisoned"))
    }
}

impl KeyValueStore for FilesystemKeyValueStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, MemoryError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            match fs::read_to_string(self.key_path(key)) {
                Ok(value) => Ok(Some(value)),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
                Err(error) => Err(MemoryError::storage(format!(
                    "failed to read value for '{key}': {error}"
                ))),
            }
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            write_atomic(&self.key_path(key), value.as_bytes())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            match fs::remove_file(self.key_path(key)) {
                Ok(()) => Ok(()),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
                Err(error) => Err(MemoryError::storage(format!(
                    "failed to remove value for '{key}': {error}"
                ))),
            }
        })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MemoryError> {
    let Some(parent) = path.parent() else {
        return Err(MemoryError::storage("value file missing parent directory"));
    };
    fs::create_dir_all(parent).map_err(|error| {
        MemoryError::storage(format!("failed to create parent directory: {error}"))
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|error| {
        MemoryError::storage(format!("failed to write temporary value file: {error}"))
    })?;

    fs::rename(&tmp, path)
        .map_err(|error| MemoryError::storage(format!("failed to finalize value file: {error}")))
}

// Keys become file names; hex keeps arbitrary keys filesystem-safe.
fn hex_encode(input: &[u8]) -> String {
    let mut output = String::with_capacity(input.len() * 2);
    for byte in input {
        output.push(nibble_to_hex(byte >> 4));
        output.push(nibble_to_hex(byte & 0x0f));
    }
    output
}

fn nibble_to_hex(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        _ => (b'a' + nibble - 10) as char,
    }
}
