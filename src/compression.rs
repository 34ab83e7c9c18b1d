// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Compression interface consumed by the transport.
//!
//! This is explicitly a thin collaborator: wire-level compression plumbing
//! is out of scope for the producer core, which never calls
//! `compress`/`decompress` itself -- it only hands the configured
//! [`Compressor`] to the caller alongside the uncompressed Arrow IPC bytes
//! the external writer produces.

/// Errors a [`Compressor`] implementation can raise.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// The zstd codec reported an error.
    #[error("zstd error: {0}")]
    Zstd(#[from] std::io::Error),
    /// The lz4 codec reported an error.
    #[error("lz4 error: {0}")]
    Lz4(#[from] lz4_flex::block::DecompressError),
}

/// Result type for compression operations.
pub type Result<T> = std::result::Result<T, CompressionError>;

/// Which compression codec a [`crate::config::ProducerConfig`] selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum CompressionKind {
    /// No compression.
    #[default]
    None,
    /// LZ4 block-mode compression.
    Lz4,
    /// Zstandard streaming compression.
    Zstd,
}

impl CompressionKind {
    /// Builds the [`Compressor`] this kind names.
    #[must_use]
    pub fn compressor(self) -> Box<dyn Compressor> {
        match self {
            CompressionKind::None => Box::new(NoneCompressor),
            CompressionKind::Lz4 => Box::new(Lz4Compressor),
            CompressionKind::Zstd => Box::new(ZstdCompressor::default()),
        }
    }
}

/// A named, swappable byte-level compression codec.
pub trait Compressor: Send + Sync {
    /// A short, stable name identifying the codec on the wire.
    fn name(&self) -> &'static str;
    /// Compresses `bytes`, returning the compressed representation.
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>>;
    /// Decompresses a buffer previously produced by [`Compressor::compress`].
    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Identity codec: returns the input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn name(&self) -> &'static str {
        "none"
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// LZ4 block-mode codec.
///
/// The output buffer is sized equal to the input; if the
/// underlying LZ4 call reports the data was incompressible, the input is
/// returned verbatim rather than treated as an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let compressed = lz4_flex::block::compress_prepend_size(bytes);
        if compressed.len() >= bytes.len() {
            // Incompressible: fall back to the verbatim input, still
            // prefixed with its own length so decompress() is uniform.
            let mut verbatim = (bytes.len() as u32).to_le_bytes().to_vec();
            verbatim.extend_from_slice(bytes);
            return Ok(verbatim);
        }
        Ok(compressed)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::block::decompress_size_prepended(bytes)?)
    }
}

/// Zstandard streaming codec at the default ("speed default") level.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCompressor {
    level: i32,
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        // zstd's "SpeedDefault" level.
        ZstdCompressor { level: 3 }
    }
}

impl ZstdCompressor {
    /// Builds a compressor at an explicit zstd level.
    #[must_use]
    pub fn with_level(level: i32) -> Self {
        ZstdCompressor { level }
    }
}

impl Compressor for ZstdCompressor {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(zstd::stream::encode_all(bytes, self.level)?)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(zstd::stream::decode_all(bytes)?)
    }
}
