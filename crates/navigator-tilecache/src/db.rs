//! Tile cache database.
//!
//! Every record lives in its own file named after a crc32 of the agent bounds
//! and the serialized tile geometry. The full geometry is stored next to the
//! payload and compared on read, so a hash collision is only a miss.

use crate::compressor::{Lz4Compressor, TileCompressor};
use log::{debug, warn};
use navigator_builder::TilePayload;
use navigator_common::{AgentBounds, Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Magic number of a cache record: 'NVTC'
pub const TILE_CACHE_MAGIC: u32 = 0x4E56_5443;
pub const TILE_CACHE_VERSION: u32 = 1;

const RECORD_EXTENSION: &str = "tile";

/// Content key of a cached tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCacheKey {
    pub checksum: u32,
    pub input_len: usize,
}

impl TileCacheKey {
    pub fn new(agent: &AgentBounds, input: &[u8]) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&agent.to_bytes());
        hasher.update(input);
        Self {
            checksum: hasher.finalize(),
            input_len: input.len(),
        }
    }

    fn file_name(&self) -> String {
        format!("{:08x}-{}.{}", self.checksum, self.input_len, RECORD_EXTENSION)
    }
}

pub struct TileCacheDb {
    dir: PathBuf,
    compressor: Box<dyn TileCompressor>,
}

impl TileCacheDb {
    /// Open the cache stored in `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_compressor(dir, Box::new(Lz4Compressor))
    }

    pub fn with_compressor(dir: impl AsRef<Path>, compressor: Box<dyn TileCompressor>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("Opened tile cache at {}", dir.display());
        Ok(Self { dir, compressor })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up the payload built for exactly this agent and tile input
    pub fn get(&self, agent: &AgentBounds, input: &[u8]) -> Result<Option<TilePayload>> {
        let key = TileCacheKey::new(agent, input);
        let path = self.dir.join(key.file_name());
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let body = self.decode_record(&data)?;
        let (stored_agent, rest) = split_chunk(&body)?;
        let (stored_input, payload) = split_chunk(rest)?;
        if stored_agent != agent.to_bytes() || stored_input != input {
            debug!("Tile cache collision on {}", path.display());
            return Ok(None);
        }

        let payload = serde_json::from_slice(payload)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Some(payload))
    }

    /// Store a payload, replacing any previous record with the same key
    pub fn put(&self, agent: &AgentBounds, input: &[u8], payload: &TilePayload) -> Result<()> {
        let key = TileCacheKey::new(agent, input);
        let payload = serde_json::to_vec(payload).map_err(|e| Error::Serialization(e.to_string()))?;

        let agent_bytes = agent.to_bytes();
        let mut body = Vec::with_capacity(8 + agent_bytes.len() + input.len() + payload.len());
        push_chunk(&mut body, &agent_bytes);
        push_chunk(&mut body, input);
        body.extend_from_slice(&payload);

        let compressed = self.compressor.compress(&body);

        // concurrent writers of the same key race on the rename only
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(&TILE_CACHE_MAGIC.to_le_bytes())?;
        file.write_all(&TILE_CACHE_VERSION.to_le_bytes())?;
        file.write_all(&compressed)?;
        file.persist(self.dir.join(key.file_name()))
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Number of records currently stored
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every record
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
        Ok(())
    }

    fn decode_record(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < 8 {
            return Err(Error::TileCache("truncated record".to_string()));
        }
        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != TILE_CACHE_MAGIC {
            return Err(Error::TileCache("invalid record magic".to_string()));
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != TILE_CACHE_VERSION {
            return Err(Error::TileCache(format!("unsupported record version {}", version)));
        }
        self.compressor.decompress(&data[8..])
    }
}

fn push_chunk(out: &mut Vec<u8>, chunk: &[u8]) {
    out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(chunk);
}

fn split_chunk(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let truncated = || Error::TileCache("truncated record body".to_string());
    let len_bytes: [u8; 4] = data.get(..4).ok_or_else(truncated)?.try_into().map_err(|_| truncated())?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let rest = &data[4..];
    if rest.len() < len {
        return Err(truncated());
    }
    Ok(rest.split_at(len))
}
