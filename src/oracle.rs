// ---------------------------------------------------------------------------
// Tag Similarity Oracle
// ---------------------------------------------------------------------------
//
// Wraps externally supplied tag embeddings and exposes cosine similarity
// between tag strings, in scalar and batch (matrix) form. The batch form is
// numerically equivalent to calling the scalar form pairwise; it only avoids
// redundant lookups and magnitude computations for distinct texts repeated
// within one call.
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use crate::error::RecError;

// ---------------------------------------------------------------------------
// Cosine similarity
// ---------------------------------------------------------------------------

/// L2 norm of an embedding.
pub fn magnitude(embedding: &[f32]) -> f64 {
	embedding
		.iter()
		.map(|&v| {
			let v = v as f64;
			v * v
		})
		.sum::<f64>()
		.sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
	a.iter()
		.zip(b.iter())
		.map(|(&x, &y)| x as f64 * y as f64)
		.sum()
}

/// Cosine similarity between two embeddings, clamped to [-1, 1].
///
/// Returns 0.0 for zero-magnitude vectors, empty vectors, or dimension
/// mismatches rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
	cosine_with_magnitudes(a, b, magnitude(a), magnitude(b))
}

/// Cosine similarity with precomputed magnitudes. Same guards and clamping
/// as [`cosine_similarity`]; used by the batch path to share magnitudes
/// across a matrix.
pub fn cosine_with_magnitudes(a: &[f32], b: &[f32], mag_a: f64, mag_b: f64) -> f64 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}
	let denom = mag_a * mag_b;
	if denom == 0.0 {
		return 0.0;
	}
	let result = dot(a, b) / denom;
	if !result.is_finite() {
		return 0.0;
	}
	result.clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// TagSimilarity trait
// ---------------------------------------------------------------------------

/// Similarity oracle over tag strings.
///
/// Handed to the scorer and the adapter explicitly so tests can substitute
/// a deterministic stub. Implementations may fail (e.g. a tag the provider
/// cannot embed); callers surface that per request, never as a crash.
pub trait TagSimilarity {
	/// Similarity between two tag strings, in [-1, 1].
	fn similarity(&self, a: &str, b: &str) -> Result<f64, RecError>;

	/// Full similarity matrix: `matrix[i][j] == similarity(rows[i], cols[j])`.
	/// Batching is a performance optimization only, never a semantic change.
	fn similarity_matrix(
		&self,
		rows: &[String],
		cols: &[String],
	) -> Result<Vec<Vec<f64>>, RecError> {
		let mut matrix = Vec::with_capacity(rows.len());
		for row in rows {
			let mut out = Vec::with_capacity(cols.len());
			for col in cols {
				out.push(self.similarity(row, col)?);
			}
			matrix.push(out);
		}
		Ok(matrix)
	}
}

// ---------------------------------------------------------------------------
// EmbeddingOracle
// ---------------------------------------------------------------------------

/// Oracle backed by the store's registered tag embeddings.
///
/// Borrows the snapshot for one request; nothing is cached across calls.
/// A tag without a registered embedding is an oracle failure — the analogue
/// of the embedding provider failing to encode a text.
pub struct EmbeddingOracle<'a> {
	embeddings: &'a HashMap<String, Vec<f32>>,
}

impl<'a> EmbeddingOracle<'a> {
	pub fn new(embeddings: &'a HashMap<String, Vec<f32>>) -> Self {
		Self { embeddings }
	}

	fn lookup(&self, tag: &str) -> Result<&'a [f32], RecError> {
		self.embeddings
			.get(tag)
			.map(|e| e.as_slice())
			.ok_or_else(|| RecError::Oracle(format!("no embedding registered for tag '{tag}'")))
	}
}

impl TagSimilarity for EmbeddingOracle<'_> {
	fn similarity(&self, a: &str, b: &str) -> Result<f64, RecError> {
		let ea = self.lookup(a)?;
		let eb = self.lookup(b)?;
		Ok(cosine_similarity(ea, eb))
	}

	fn similarity_matrix(
		&self,
		rows: &[String],
		cols: &[String],
	) -> Result<Vec<Vec<f64>>, RecError> {
		// Resolve each distinct text once per call.
		let mut resolved: HashMap<&str, (&[f32], f64)> = HashMap::new();
		for tag in rows.iter().chain(cols.iter()) {
			if !resolved.contains_key(tag.as_str()) {
				let embedding = self.lookup(tag)?;
				resolved.insert(tag.as_str(), (embedding, magnitude(embedding)));
			}
		}

		let mut matrix = Vec::with_capacity(rows.len());
		for row in rows {
			let (ea, mag_a) = resolved[row.as_str()];
			let mut out = Vec::with_capacity(cols.len());
			for col in cols {
				let (eb, mag_b) = resolved[col.as_str()];
				out.push(cosine_with_magnitudes(ea, eb, mag_a, mag_b));
			}
			matrix.push(out);
		}
		Ok(matrix)
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	fn embeddings(pairs: &[(&str, Vec<f32>)]) -> HashMap<String, Vec<f32>> {
		pairs
			.iter()
			.map(|(name, emb)| (name.to_string(), emb.clone()))
			.collect()
	}

	fn names(tags: &[&str]) -> Vec<String> {
		tags.iter().map(|s| s.to_string()).collect()
	}

	// -- cosine tests ---------------------------------------------------------

	#[test]
	fn cosine_identical() {
		let v = vec![1.0f32, 2.0, 3.0];
		assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-10);
	}

	#[test]
	fn cosine_orthogonal() {
		assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-10);
	}

	#[test]
	fn cosine_opposite() {
		assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-10);
	}

	#[test]
	fn cosine_zero_magnitude_guarded() {
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
	}

	#[test]
	fn cosine_empty_and_mismatched() {
		assert_eq!(cosine_similarity(&[], &[]), 0.0);
		assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
	}

	#[test]
	fn magnitude_basic() {
		assert!((magnitude(&[3.0, 4.0]) - 5.0).abs() < 1e-10);
	}

	// -- oracle tests ---------------------------------------------------------

	#[test]
	fn oracle_scalar_similarity() {
		let embs = embeddings(&[("music", vec![1.0, 0.0]), ("jazz", vec![0.6, 0.8])]);
		let oracle = EmbeddingOracle::new(&embs);
		let sim = oracle.similarity("music", "jazz").unwrap();
		assert!((sim - 0.6).abs() < 1e-6);
	}

	#[test]
	fn oracle_unknown_tag_is_failure() {
		let embs = embeddings(&[("music", vec![1.0, 0.0])]);
		let oracle = EmbeddingOracle::new(&embs);
		let err = oracle.similarity("music", "opera").unwrap_err();
		assert!(matches!(err, RecError::Oracle(_)));
	}

	#[test]
	fn oracle_zero_vector_is_not_failure() {
		let embs = embeddings(&[("music", vec![1.0, 0.0]), ("void", vec![0.0, 0.0])]);
		let oracle = EmbeddingOracle::new(&embs);
		assert_eq!(oracle.similarity("music", "void").unwrap(), 0.0);
	}

	#[test]
	fn matrix_matches_scalar_pairwise() {
		let embs = embeddings(&[
			("music", vec![1.0, 0.0, 0.0]),
			("jazz", vec![0.6, 0.8, 0.0]),
			("finance", vec![0.0, 0.0, 1.0]),
		]);
		let oracle = EmbeddingOracle::new(&embs);
		let rows = names(&["music", "jazz"]);
		let cols = names(&["music", "jazz", "finance"]);
		let matrix = oracle.similarity_matrix(&rows, &cols).unwrap();
		for (i, row) in rows.iter().enumerate() {
			for (j, col) in cols.iter().enumerate() {
				let scalar = oracle.similarity(row, col).unwrap();
				assert_eq!(matrix[i][j], scalar, "mismatch at ({row}, {col})");
			}
		}
	}

	#[test]
	fn matrix_handles_repeated_texts() {
		let embs = embeddings(&[("music", vec![1.0, 0.0])]);
		let oracle = EmbeddingOracle::new(&embs);
		let rows = names(&["music", "music"]);
		let cols = names(&["music"]);
		let matrix = oracle.similarity_matrix(&rows, &cols).unwrap();
		assert_eq!(matrix.len(), 2);
		assert!((matrix[0][0] - 1.0).abs() < 1e-10);
		assert!((matrix[1][0] - 1.0).abs() < 1e-10);
	}

	#[test]
	fn matrix_propagates_unknown_tag() {
		let embs = embeddings(&[("music", vec![1.0, 0.0])]);
		let oracle = EmbeddingOracle::new(&embs);
		let result = oracle.similarity_matrix(&names(&["music"]), &names(&["opera"]));
		assert!(result.is_err());
	}

	#[test]
	fn oracle_is_symmetric() {
		let embs = embeddings(&[("music", vec![0.3, 0.7]), ("jazz", vec![0.9, 0.1])]);
		let oracle = EmbeddingOracle::new(&embs);
		let ab = oracle.similarity("music", "jazz").unwrap();
		let ba = oracle.similarity("jazz", "music").unwrap();
		assert_eq!(ab, ba);
	}
}
