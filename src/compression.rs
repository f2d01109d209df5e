//! Payload compression for worker updates and model snapshots
//!
//! zlib streams in both directions. Decompression is bounded so one
//! oversized update cannot exhaust coordinator memory.

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{FedlinkError, Result};

/// Compression level (0-9)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// zlib default
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slower)
    pub const BEST: Self = Self(9);

    /// Build a level, rejecting values outside 0-9
    pub fn new(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(FedlinkError::Config {
                reason: format!("compression level must be 0-9, got {}", level),
            });
        }
        Ok(Self(level))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Compression configuration
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Level used for outbound payloads
    pub level: CompressionLevel,
    /// Upper bound on a decompressed payload
    pub max_decompressed_bytes: usize,
}

/// 512 MiB
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: usize = 512 * 1024 * 1024;

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: CompressionLevel::DEFAULT,
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
        }
    }
}

/// Compress data into a zlib stream
pub fn compress(data: &[u8], config: &CompressionConfig) -> Result<Bytes> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2 + 16),
        Compression::new(config.level.value()),
    );
    encoder
        .write_all(data)
        .map_err(|e| FedlinkError::Compression { message: e.to_string() })?;
    let out = encoder
        .finish()
        .map_err(|e| FedlinkError::Compression { message: e.to_string() })?;
    Ok(Bytes::from(out))
}

/// Decompress a zlib stream, failing if the output exceeds the configured bound
pub fn decompress(data: &[u8], config: &CompressionConfig) -> Result<Bytes> {
    // A zlib stream always carries at least a header and checksum
    if data.is_empty() {
        return Err(FedlinkError::Decompression {
            message: "empty payload".into(),
        });
    }

    let limit = config.max_decompressed_bytes;
    let mut decoder = ZlibDecoder::new(data).take(limit as u64 + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| FedlinkError::Decompression { message: e.to_string() })?;

    if out.len() > limit {
        return Err(FedlinkError::Decompression {
            message: format!("payload exceeds {} bytes once decompressed", limit),
        });
    }

    Ok(Bytes::from(out))
}

/// Calculate compression ratio
pub fn compression_ratio(original: usize, compressed: usize) -> f64 {
    if compressed == 0 {
        return 0.0;
    }
    original as f64 / compressed as f64
}
