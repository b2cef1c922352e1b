// ---------------------------------------------------------------------------
// Snapshot persistence — gzipped JSON + base64 embeddings
// ---------------------------------------------------------------------------
//
// One file per store: gzipped JSON `{ "version": 1, tags, events, profiles }`
// with embeddings encoded as base64 of Float32 little-endian bytes. Load
// also accepts a plain (non-gzipped) JSON file.
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::types::{Event, ProfileTag};

pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PersistenceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Corruption: {0}")]
	Corruption(String),
	#[error("Serialization: {0}")]
	Serialization(String),
}

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedTag {
	pub name: String,
	/// Base64 of Float32 LE bytes.
	pub embedding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedProfile {
	pub id: String,
	pub tags: Vec<ProfileTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
	pub version: u32,
	pub tags: Vec<PersistedTag>,
	pub events: Vec<Event>,
	pub profiles: Vec<PersistedProfile>,
}

// ---------------------------------------------------------------------------
// Embedding encode / decode
// ---------------------------------------------------------------------------

/// Encode an f32 slice as base64 of Float32 little-endian bytes.
pub fn encode_embedding(embedding: &[f32]) -> String {
	let bytes: Vec<u8> = embedding.iter().flat_map(|f| f.to_le_bytes()).collect();
	STANDARD.encode(&bytes)
}

/// Decode a base64-encoded Float32 LE byte string back to `Vec<f32>`.
pub fn decode_embedding(encoded: &str) -> Result<Vec<f32>, PersistenceError> {
	let bytes = STANDARD
		.decode(encoded)
		.map_err(|e| PersistenceError::Corruption(format!("Invalid base64: {}", e)))?;
	if bytes.len() % 4 != 0 {
		return Err(PersistenceError::Corruption(
			"Invalid embedding length".into(),
		));
	}
	let mut result = Vec::with_capacity(bytes.len() / 4);
	for chunk in bytes.chunks_exact(4) {
		result.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
	}
	Ok(result)
}

// ---------------------------------------------------------------------------
// Gzip compress / decompress
// ---------------------------------------------------------------------------

/// Gzip-compress a byte slice (level 6).
pub fn compress(data: &[u8]) -> Result<Vec<u8>, PersistenceError> {
	let mut encoder = GzEncoder::new(data, Compression::new(6));
	let mut compressed = Vec::new();
	encoder
		.read_to_end(&mut compressed)
		.map_err(PersistenceError::Io)?;
	Ok(compressed)
}

/// Gunzip-decompress a byte slice.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, PersistenceError> {
	let mut decoder = GzDecoder::new(data);
	let mut decompressed = Vec::new();
	decoder
		.read_to_end(&mut decompressed)
		.map_err(PersistenceError::Io)?;
	Ok(decompressed)
}

/// Check if data starts with gzip magic bytes (0x1f, 0x8b).
pub fn is_gzipped(data: &[u8]) -> bool {
	data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

/// Write a snapshot to `path` as gzipped JSON.
pub fn save_to_path(path: &str, snapshot: &StoreSnapshot) -> Result<(), PersistenceError> {
	let json = serde_json::to_vec(snapshot)
		.map_err(|e| PersistenceError::Serialization(e.to_string()))?;
	let compressed = compress(&json)?;
	if let Some(parent) = Path::new(path).parent() {
		if !parent.as_os_str().is_empty() {
			std::fs::create_dir_all(parent)?;
		}
	}
	std::fs::write(path, compressed)?;
	Ok(())
}

/// Load a snapshot from `path`. Returns `None` when the file does not exist.
pub fn load_from_path(path: &str) -> Result<Option<StoreSnapshot>, PersistenceError> {
	let raw = match std::fs::read(path) {
		Ok(data) => data,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(PersistenceError::Io(e)),
	};

	let json = if is_gzipped(&raw) {
		decompress(&raw)?
	} else {
		raw
	};

	let snapshot: StoreSnapshot = serde_json::from_slice(&json)
		.map_err(|e| PersistenceError::Corruption(format!("Invalid snapshot JSON: {}", e)))?;
	if snapshot.version != SNAPSHOT_VERSION {
		return Err(PersistenceError::Corruption(format!(
			"Unsupported snapshot version: {}",
			snapshot.version
		)));
	}
	Ok(Some(snapshot))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Event;

	fn sample_snapshot() -> StoreSnapshot {
		StoreSnapshot {
			version: SNAPSHOT_VERSION,
			tags: vec![PersistedTag {
				name: "music".into(),
				embedding: encode_embedding(&[1.0, 0.0, 0.5]),
			}],
			events: vec![Event {
				id: "e1".into(),
				name: "Jazz Night".into(),
				tags: vec!["jazz".into()],
			}],
			profiles: vec![PersistedProfile {
				id: "p1".into(),
				tags: vec![ProfileTag::with_weight("music", 1.2)],
			}],
		}
	}

	#[test]
	fn embedding_round_trip() {
		let original = vec![1.0f32, -0.5, 0.0, 3.14159];
		let decoded = decode_embedding(&encode_embedding(&original)).unwrap();
		assert_eq!(original, decoded);
	}

	#[test]
	fn decode_rejects_invalid_base64() {
		assert!(decode_embedding("not-valid-base64!!!").is_err());
	}

	#[test]
	fn decode_rejects_bad_length() {
		let encoded = STANDARD.encode([1u8, 2, 3]);
		assert!(decode_embedding(&encoded).is_err());
	}

	#[test]
	fn compress_round_trip() {
		let data = b"hello snapshot".to_vec();
		let compressed = compress(&data).unwrap();
		assert!(is_gzipped(&compressed));
		assert_eq!(decompress(&compressed).unwrap(), data);
	}

	#[test]
	fn save_load_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("store.evrec").to_string_lossy().to_string();

		let snapshot = sample_snapshot();
		save_to_path(&path, &snapshot).unwrap();

		let loaded = load_from_path(&path).unwrap().unwrap();
		assert_eq!(loaded.version, SNAPSHOT_VERSION);
		assert_eq!(loaded.tags[0].name, "music");
		assert_eq!(loaded.events[0].id, "e1");
		assert_eq!(loaded.profiles[0].tags[0].weight, 1.2);
	}

	#[test]
	fn load_missing_file_returns_none() {
		assert!(load_from_path("/nonexistent/store.evrec").unwrap().is_none());
	}

	#[test]
	fn load_accepts_plain_json() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("plain.json").to_string_lossy().to_string();
		let json = serde_json::to_vec(&sample_snapshot()).unwrap();
		std::fs::write(&path, json).unwrap();

		let loaded = load_from_path(&path).unwrap().unwrap();
		assert_eq!(loaded.tags.len(), 1);
	}

	#[test]
	fn load_rejects_garbage() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bad.evrec").to_string_lossy().to_string();
		std::fs::write(&path, b"{not json").unwrap();
		assert!(matches!(
			load_from_path(&path),
			Err(PersistenceError::Corruption(_))
		));
	}

	#[test]
	fn load_rejects_unknown_version() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("v9.evrec").to_string_lossy().to_string();
		let mut snapshot = sample_snapshot();
		snapshot.version = 9;
		let json = serde_json::to_vec(&snapshot).unwrap();
		std::fs::write(&path, json).unwrap();
		assert!(matches!(
			load_from_path(&path),
			Err(PersistenceError::Corruption(_))
		));
	}
}
