//! Codecs for the body of a cache record

use navigator_common::{Error, Result};

/// Largest body a record may claim to expand to
pub const MAX_RECORD_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Codec applied to the body of every cache record
pub trait TileCompressor: Send + Sync {
    fn compress(&self, body: &[u8]) -> Vec<u8>;

    /// Fails with [`Error::TileCache`] on corrupt or oversized input
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// LZ4 block compression, the body size is stored in front
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Compressor;

impl TileCompressor for Lz4Compressor {
    fn compress(&self, body: &[u8]) -> Vec<u8> {
        lz4_flex::compress_prepend_size(body)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        check_body_size(declared_size(data)?)?;
        lz4_flex::decompress_size_prepended(data)
            .map_err(|e| Error::TileCache(format!("corrupt record body: {}", e)))
    }
}

/// Stores bodies as they are
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl TileCompressor for NoCompression {
    fn compress(&self, body: &[u8]) -> Vec<u8> {
        body.to_vec()
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        check_body_size(data.len())?;
        Ok(data.to_vec())
    }
}

fn declared_size(data: &[u8]) -> Result<usize> {
    let bytes: [u8; 4] = data
        .get(..4)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| Error::TileCache("truncated record body".to_string()))?;
    Ok(u32::from_le_bytes(bytes) as usize)
}

fn check_body_size(size: usize) -> Result<()> {
    if size > MAX_RECORD_BODY_SIZE {
        return Err(Error::TileCache(format!("record body of {} bytes is too large", size)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lz4_body() {
        let compressed = Lz4Compressor.compress(&[7u8; 256]);
        assert!(compressed.len() < 256);
        assert_eq!(Lz4Compressor.decompress(&compressed).unwrap(), vec![7u8; 256]);

        assert!(matches!(Lz4Compressor.decompress(&compressed[..6]), Err(Error::TileCache(_))));
        assert!(matches!(Lz4Compressor.decompress(&[1, 0]), Err(Error::TileCache(_))));
    }

    #[test]
    fn test_oversized_body_is_rejected() {
        let mut data = u32::MAX.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; 16]);
        assert!(matches!(Lz4Compressor.decompress(&data), Err(Error::TileCache(_))));
    }
}
