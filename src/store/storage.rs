//! On-disk layout of a persisted index
//!
//! An index directory holds three artifacts that are always written together:
//! `vectors.bin`, `metadata.jsonl` and `manifest.json`. Writes go to a
//! sibling staging directory which is renamed into place once complete.

use super::manifest::IndexManifest;
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

pub const VECTORS_FILE: &str = "vectors.bin";
pub const METADATA_FILE: &str = "metadata.jsonl";
pub const MANIFEST_FILE: &str = "manifest.json";

pub const FORMAT_VERSION: u32 = 1;
const MAGIC: &[u8; 4] = b"DKTV";
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Encode row-major vectors as `vectors.bin` bytes
pub fn encode_vectors(dimension: usize, vectors: &[f32]) -> Vec<u8> {
    let count = if dimension == 0 {
        0
    } else {
        vectors.len() / dimension
    };
    let mut bytes = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(dimension as u32).to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());
    for value in vectors {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode `vectors.bin` bytes into `(dimension, count, row-major values)`
pub fn decode_vectors(bytes: &[u8]) -> Result<(usize, usize, Vec<f32>)> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(Error::DataValidation(format!(
            "{} is not a docket vector file",
            VECTORS_FILE
        )));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::DataValidation(format!(
            "unsupported vector format version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }

    let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..HEADER_LEN]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    let body = &bytes[HEADER_LEN..];
    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::DataValidation("vector header overflows".to_string()))?;
    if body.len() != expected_len {
        return Err(Error::DataValidation(format!(
            "vector file holds {} bytes of data, header promises {}",
            body.len(),
            expected_len
        )));
    }

    let values = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((dimension, count, values))
}

pub fn checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Names of index artifacts absent from `dir`
pub fn missing_files(dir: &Path) -> Vec<&'static str> {
    [VECTORS_FILE, METADATA_FILE, MANIFEST_FILE]
        .into_iter()
        .filter(|name| !dir.join(name).is_file())
        .collect()
}

pub fn read_manifest(dir: &Path) -> Result<IndexManifest> {
    let content = fs::read_to_string(dir.join(MANIFEST_FILE))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::DataValidation(format!("invalid {}: {}", MANIFEST_FILE, e)))
}

/// Read `vectors.bin`, verifying it against the manifest checksum
pub fn read_vectors(dir: &Path, manifest: &IndexManifest) -> Result<(usize, usize, Vec<f32>)> {
    let bytes = fs::read(dir.join(VECTORS_FILE))?;
    let actual = checksum(&bytes);
    if actual != manifest.vectors_checksum {
        return Err(Error::DataValidation(format!(
            "{} checksum mismatch (manifest {}, file {})",
            VECTORS_FILE, manifest.vectors_checksum, actual
        )));
    }
    decode_vectors(&bytes)
}

pub fn read_chunks(dir: &Path) -> Result<Vec<Chunk>> {
    let file = fs::File::open(dir.join(METADATA_FILE))?;
    let mut chunks = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let chunk = serde_json::from_str(&line).map_err(|e| {
            Error::DataValidation(format!("{} line {}: {}", METADATA_FILE, line_no + 1, e))
        })?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Persist all artifacts, replacing any existing index at `dir` in one swap
pub fn write_index(
    dir: &Path,
    manifest: &IndexManifest,
    vector_bytes: &[u8],
    chunks: &[Chunk],
) -> Result<()> {
    let staging = sibling(dir, "staging");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }

    let result = stage_artifacts(&staging, manifest, vector_bytes, chunks)
        .and_then(|_| swap_into_place(&staging, dir));

    if let Err(e) = result {
        if staging.exists() {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(path = %staging.display(), "Failed to remove staging directory: {}", cleanup);
            }
        }
        return Err(e);
    }

    debug!(path = %dir.display(), "Index artifacts swapped into place");
    Ok(())
}

fn stage_artifacts(
    staging: &Path,
    manifest: &IndexManifest,
    vector_bytes: &[u8],
    chunks: &[Chunk],
) -> Result<()> {
    fs::create_dir_all(staging)?;

    fs::write(staging.join(VECTORS_FILE), vector_bytes)?;

    let mut writer = BufWriter::new(fs::File::create(staging.join(METADATA_FILE))?);
    for chunk in chunks {
        serde_json::to_writer(&mut writer, chunk)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    fs::write(
        staging.join(MANIFEST_FILE),
        serde_json::to_vec_pretty(manifest)?,
    )?;
    Ok(())
}

fn swap_into_place(staging: &Path, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(fs::rename(staging, dir)?);
    }

    let previous = sibling(dir, "previous");
    if previous.exists() {
        fs::remove_dir_all(&previous)?;
    }
    fs::rename(dir, &previous)?;

    if let Err(e) = fs::rename(staging, dir) {
        // Put the old index back so readers still find a complete one.
        if let Err(restore) = fs::rename(&previous, dir) {
            error!(
                path = %dir.display(),
                previous = %previous.display(),
                "Failed to restore previous index, no index remains in place: {}",
                restore
            );
        }
        return Err(e.into());
    }

    if let Err(e) = fs::remove_dir_all(&previous) {
        warn!(path = %previous.display(), "Failed to remove previous index: {}", e);
    }
    Ok(())
}

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    dir.with_file_name(format!(".{}.{}", name, suffix))
}
