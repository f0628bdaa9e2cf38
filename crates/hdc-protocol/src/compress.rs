//! Per-chunk deflate compression for file transfers
//!
//! Compressed transfers deflate every `FileData` chunk independently, so a
//! receiver can inflate chunks as they arrive without keeping a stream
//! context across frames.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::ProtocolError;
use crate::frame::MAX_PAYLOAD_SIZE;

/// Upper bound on the inflated size of one chunk
pub const MAX_INFLATED_CHUNK: usize = 4 * MAX_PAYLOAD_SIZE;

/// Deflate one chunk
pub fn deflate_chunk(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::fast());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate one chunk produced by [`deflate_chunk`]
pub fn inflate_chunk(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::with_capacity(data.len() * 2);
    DeflateDecoder::new(data)
        .take(MAX_INFLATED_CHUNK as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| ProtocolError::Compression(e.to_string()))?;

    if out.len() > MAX_INFLATED_CHUNK {
        return Err(ProtocolError::Compression(format!(
            "inflated chunk exceeds {} bytes",
            MAX_INFLATED_CHUNK
        )));
    }
    Ok(out)
}
