//! Archive bundle packing and unpacking.
//!
//! A bundle is a zip holding `manifest.json` plus, when the original
//! content is still in the blob store, a `content` entry with the raw
//! bytes. The record checksum is SHA-256 over the manifest bytes.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const MANIFEST_ENTRY: &str = "manifest.json";
pub const CONTENT_ENTRY: &str = "content";

/// Hex-encoded SHA-256 of the manifest bytes.
pub fn manifest_checksum(manifest_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(manifest_bytes);
    format!("{:x}", hasher.finalize())
}

/// Writes a bundle to `path`. The caller removes the file on failure.
pub fn write_bundle(
    path: &Path,
    manifest_bytes: &[u8],
    content: Option<&[u8]>,
) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("create bundle: {}", e))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    writer
        .start_file(MANIFEST_ENTRY, options)
        .map_err(|e| format!("start manifest entry: {}", e))?;
    writer
        .write_all(manifest_bytes)
        .map_err(|e| format!("write manifest entry: {}", e))?;

    if let Some(bytes) = content {
        writer
            .start_file(CONTENT_ENTRY, options)
            .map_err(|e| format!("start content entry: {}", e))?;
        writer
            .write_all(bytes)
            .map_err(|e| format!("write content entry: {}", e))?;
    }

    writer.finish().map_err(|e| format!("finish bundle: {}", e))?;
    Ok(())
}

/// Reads the manifest bytes back out of a bundle.
pub fn read_manifest(path: &Path) -> Result<Vec<u8>, String> {
    let file = File::open(path).map_err(|e| format!("open bundle: {}", e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| format!("read bundle: {}", e))?;
    let mut entry = archive
        .by_name(MANIFEST_ENTRY)
        .map_err(|e| format!("missing manifest entry: {}", e))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| format!("read manifest entry: {}", e))?;
    Ok(bytes)
}

/// Reads the content entry, if the bundle carries one.
pub fn read_content(path: &Path) -> Result<Option<Vec<u8>>, String> {
    let file = File::open(path).map_err(|e| format!("open bundle: {}", e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| format!("read bundle: {}", e))?;
    let mut entry = match archive.by_name(CONTENT_ENTRY) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(format!("read content entry: {}", e)),
    };
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| format!("read content entry: {}", e))?;
    Ok(Some(bytes))
}
