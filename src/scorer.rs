// ---------------------------------------------------------------------------
// Recommendation Scorer
// ---------------------------------------------------------------------------
//
// Ranks events against a profile's tag set. One similarity matrix is
// computed between the profile tags and the distinct event-tag vocabulary,
// then shared across all events: O(P x V) oracle work for the whole catalog
// instead of per-event recomputation. Pure function, no side effects.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use crate::error::RecError;
use crate::oracle::TagSimilarity;
use crate::types::{Event, ProfileTag, Recommendation};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the scorer. A profile tag counts toward an event when its
/// best similarity against the event's tags reaches `match_threshold`.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
	pub match_threshold: f64,
	pub max_results: usize,
}

impl Default for ScorerConfig {
	fn default() -> Self {
		Self {
			match_threshold: 0.4,
			max_results: 10,
		}
	}
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Rank `events` for a profile.
///
/// An event's score is the average of the best per-profile-tag similarities,
/// taken over only the profile tags whose best similarity reaches the match
/// threshold. Events with no tags, or with no matching profile tag, are
/// excluded entirely. Results are sorted by score descending, stable with
/// respect to catalog order, and capped at `max_results`.
///
/// An empty profile tag set and an empty event-tag vocabulary are defined
/// empty-result cases, not errors.
pub fn recommend(
	profile_tags: &[ProfileTag],
	events: &[Event],
	oracle: &dyn TagSimilarity,
	config: &ScorerConfig,
) -> Result<Vec<Recommendation>, RecError> {
	if profile_tags.is_empty() {
		return Ok(Vec::new());
	}

	// Distinct event-tag vocabulary across the whole candidate set,
	// in first-seen order.
	let mut vocabulary: Vec<String> = Vec::new();
	let mut seen: HashSet<&str> = HashSet::new();
	for event in events {
		for tag in &event.tags {
			if seen.insert(tag.as_str()) {
				vocabulary.push(tag.clone());
			}
		}
	}
	if vocabulary.is_empty() {
		return Ok(Vec::new());
	}

	let profile_names: Vec<String> = profile_tags.iter().map(|t| t.name.clone()).collect();
	let matrix = oracle.similarity_matrix(&profile_names, &vocabulary)?;
	let vocab_index: HashMap<&str, usize> = vocabulary
		.iter()
		.enumerate()
		.map(|(i, tag)| (tag.as_str(), i))
		.collect();

	let mut scored: Vec<Recommendation> = Vec::new();
	for event in events {
		// Events with no tags can never match.
		if event.tags.is_empty() {
			continue;
		}

		let mut total = 0.0;
		let mut matches = 0usize;
		for row in &matrix {
			let best = event
				.tags
				.iter()
				.filter_map(|tag| vocab_index.get(tag.as_str()).map(|&j| row[j]))
				.fold(f64::NEG_INFINITY, f64::max);
			if best >= config.match_threshold {
				total += best;
				matches += 1;
			}
		}

		if matches > 0 {
			scored.push(Recommendation {
				event: event.clone(),
				score: total / matches as f64,
			});
		}
	}

	// sort_by is stable: ties keep catalog order.
	scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
	scored.truncate(config.max_results);
	Ok(scored)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
