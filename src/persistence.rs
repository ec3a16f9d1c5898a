use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::block::DEFAULT_BLOCK;
use crate::config::{CHUNK_HEIGHT, CHUNK_SIZE, SAVE_FORMAT_VERSION, SAVE_STORAGE_KEY};
use crate::world::World;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid save format: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// One ledger entry. `type_id: None` is a cell that was explicitly emptied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedBlock {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub type_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub version: u32,
    pub chunk_size: usize,
    pub chunk_height: usize,
    pub seed: Option<u32>,
    pub modified_blocks: Vec<ModifiedBlock>,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            version: SAVE_FORMAT_VERSION,
            chunk_size: CHUNK_SIZE,
            chunk_height: CHUNK_HEIGHT,
            seed: None,
            modified_blocks: Vec::new(),
        }
    }
}

/// Accepts integral JSON numbers, including whole floats, that fit in `i32`.
pub(crate) fn coordinate(value: Option<&Value>) -> Option<i32> {
    let value = value?;
    if let Some(int) = value.as_i64() {
        return i32::try_from(int).ok();
    }
    let float = value.as_f64()?;
    if float.fract() != 0.0 || float < i32::MIN as f64 || float > i32::MAX as f64 {
        return None;
    }
    Some(float as i32)
}

/// Seeds wrap into 32 bits the way an unsigned shift would.
pub(crate) fn parse_seed(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    if let Some(int) = value.as_u64() {
        return Some(int as u32);
    }
    if let Some(int) = value.as_i64() {
        return Some(int as u32);
    }
    let float = value.as_f64()?;
    if !float.is_finite() || float.fract() != 0.0 {
        return None;
    }
    Some(float as i64 as u32)
}

fn parse_entry(entry: &Value, missing_type: Option<&str>) -> Option<ModifiedBlock> {
    let x = coordinate(entry.get("x"))?;
    let y = coordinate(entry.get("y"))?;
    let z = coordinate(entry.get("z"))?;
    let type_id = match entry.get("typeId") {
        None | Some(Value::Null) => missing_type.map(str::to_string),
        Some(Value::String(id)) => Some(id.clone()),
        Some(_) => return None,
    };
    Some(ModifiedBlock { x, y, z, type_id })
}

fn parse_entries(entries: &[Value], missing_type: Option<&str>) -> Vec<ModifiedBlock> {
    let mut parsed = Vec::with_capacity(entries.len());
    for entry in entries {
        match parse_entry(entry, missing_type) {
            Some(block) => parsed.push(block),
            None => warn!("skipping malformed save entry: {entry}"),
        }
    }
    parsed
}

impl SaveData {
    /// Tolerant decoding: anything unreadable is skipped or defaulted, never
    /// fatal.
    pub fn from_json_value(value: &Value) -> SaveData {
        let mut data = SaveData::default();
        let Some(object) = value.as_object() else {
            warn!("save payload is not an object, ignoring it");
            return data;
        };

        if let Some(version) = object.get("version").and_then(Value::as_u64) {
            data.version = version as u32;
        }
        if let Some(size) = object.get("chunkSize").and_then(Value::as_u64) {
            data.chunk_size = size as usize;
        }
        if let Some(height) = object.get("chunkHeight").and_then(Value::as_u64) {
            data.chunk_height = height as usize;
        }
        data.seed = parse_seed(object.get("seed"));

        match (object.get("modifiedBlocks"), object.get("blocks")) {
            (Some(Value::Array(entries)), _) => {
                data.modified_blocks = parse_entries(entries, None);
            }
            (_, Some(Value::Array(entries))) => {
                debug!("reading legacy block list ({} entries)", entries.len());
                data.modified_blocks = parse_entries(entries, Some(DEFAULT_BLOCK.id()));
            }
            (Some(other), _) => warn!("modifiedBlocks is not a list: {other}"),
            (None, _) => {}
        }

        if data.chunk_size != CHUNK_SIZE || data.chunk_height != CHUNK_HEIGHT {
            warn!(
                "save was written with {}x{} chunks, loading into {}x{}",
                data.chunk_size, data.chunk_height, CHUNK_SIZE, CHUNK_HEIGHT
            );
        }
        data
    }

    pub fn from_json_str(text: &str) -> Result<SaveData, PersistenceError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json_value(&value))
    }

    pub fn to_json_string(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Opaque string storage keyed by name.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        if key.is_empty() || key.contains(|c: char| c == '/' || c == '\\') || key.starts_with('.') {
            return Err(PersistenceError::Unavailable(format!("invalid key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::write(self.path_for(key)?, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)?) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

pub fn save_world(store: &mut dyn BlobStore, world: &World) -> Result<(), PersistenceError> {
    let data = world.serialize();
    store.set(SAVE_STORAGE_KEY, &data.to_json_string()?)?;
    info!("saved world ({} modified cells)", data.modified_blocks.len());
    Ok(())
}

/// Reads the stored save. Missing, unreadable, or corrupt saves all yield `None`.
pub fn load_saved(store: &dyn BlobStore) -> Option<SaveData> {
    let raw = match store.get(SAVE_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!("failed to read world save: {err}");
            return None;
        }
    };
    match SaveData::from_json_str(&raw) {
        Ok(data) => Some(data),
        Err(err) => {
            warn!("failed to parse world save: {err}");
            None
        }
    }
}

pub fn clear_saved(store: &mut dyn BlobStore) -> Result<(), PersistenceError> {
    store.remove(SAVE_STORAGE_KEY)
}
