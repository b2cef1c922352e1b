// ---------------------------------------------------------------------------
// Weight Adapter
// ---------------------------------------------------------------------------
//
// Recomputes a profile's tag weights after the user registers for an event.
// Registration is a positive signal for profile tags resembling the event's
// tags and a negative one for the rest: each tag's similarities to the event
// tags are walked in descending order, boosting with diminishing returns on
// strong matches and decaying with compounding penalty on weak ones.
//
// Pure function — the caller persists the returned weights.
// ---------------------------------------------------------------------------

use crate::error::RecError;
use crate::oracle::TagSimilarity;
use crate::types::ProfileTag;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for weight adaptation. Weights stay inside
/// `[min_weight, max_weight]` after every step.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
	/// Minimum similarity for a step to count as a boost rather than a decay.
	pub sim_threshold: f64,
	/// Additive boost per strong match, scaled by the similarity.
	pub boost: f64,
	/// Additive decay per weak match, scaled by the dissimilarity.
	pub decay: f64,
	/// Multiplier applied to the boost after each strong match (< 1).
	pub boost_falloff: f64,
	/// Multiplier applied to the decay after each weak match (> 1).
	pub decay_growth: f64,
	pub min_weight: f64,
	pub max_weight: f64,
}

impl Default for AdapterConfig {
	fn default() -> Self {
		Self {
			sim_threshold: 0.5,
			boost: 0.15,
			decay: 0.05,
			boost_falloff: 0.9,
			decay_growth: 1.1,
			min_weight: 0.1,
			max_weight: 3.0,
		}
	}
}

// ---------------------------------------------------------------------------
// Adaptation
// ---------------------------------------------------------------------------

/// Fold one tag's weight over its similarities to the event tags.
///
/// `sims` must already be sorted descending — the order is load-bearing:
/// best matches are counted first while the boost is still at full
/// strength, and each subsequent weak match erodes more.
fn fold_weight(start: f64, sims: &[f64], config: &AdapterConfig) -> f64 {
	let mut weight = start;
	let mut boost = config.boost;
	let mut decay = config.decay;
	for &s in sims {
		if s >= config.sim_threshold {
			weight = (weight + boost * s).clamp(config.min_weight, config.max_weight);
			boost *= config.boost_falloff;
		} else {
			weight = (weight - decay * (1.0 - s)).clamp(config.min_weight, config.max_weight);
			decay *= config.decay_growth;
		}
	}
	weight
}

/// Compute updated weights for `profile_tags` given the tags of the event
/// just registered for. Returns the same tags, same order, with new
/// weights; the caller commits them to the store.
///
/// A no-op (input returned unchanged) when either side is empty.
pub fn adapt_weights(
	profile_tags: &[ProfileTag],
	event_tags: &[String],
	oracle: &dyn TagSimilarity,
	config: &AdapterConfig,
) -> Result<Vec<ProfileTag>, RecError> {
	if profile_tags.is_empty() || event_tags.is_empty() {
		return Ok(profile_tags.to_vec());
	}

	let profile_names: Vec<String> = profile_tags.iter().map(|t| t.name.clone()).collect();
	let matrix = oracle.similarity_matrix(&profile_names, event_tags)?;

	let mut updated = Vec::with_capacity(profile_tags.len());
	for (tag, row) in profile_tags.iter().zip(matrix.into_iter()) {
		let mut sims = row;
		sims.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
		updated.push(ProfileTag {
			name: tag.name.clone(),
			weight: fold_weight(tag.weight, &sims, config),
		});
	}
	Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	struct StubOracle {
		pairs: HashMap<(String, String), f64>,
	}

	impl StubOracle {
		fn new(pairs: &[(&str, &str, f64)]) -> Self {
			let mut table = HashMap::new();
			for (a, b, sim) in pairs {
				table.insert((a.to_string(), b.to_string()), *sim);
				table.insert((b.to_string(), a.to_string()), *sim);
			}
			Self { pairs: table }
		}
	}

	impl TagSimilarity for StubOracle {
		fn similarity(&self, a: &str, b: &str) -> Result<f64, RecError> {
			if a == b {
				return Ok(1.0);
			}
			Ok(self
				.pairs
				.get(&(a.to_string(), b.to_string()))
				.copied()
				.unwrap_or(0.0))
		}
	}

	fn tags(entries: &[(&str, f64)]) -> Vec<ProfileTag> {
		entries
			.iter()
			.map(|(name, weight)| ProfileTag::with_weight(*name, *weight))
			.collect()
	}

	fn names(entries: &[&str]) -> Vec<String> {
		entries.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn noop_when_profile_empty() {
		let oracle = StubOracle::new(&[]);
		let result =
			adapt_weights(&[], &names(&["music"]), &oracle, &AdapterConfig::default()).unwrap();
		assert!(result.is_empty());
	}

	#[test]
	fn noop_when_event_empty() {
		let oracle = StubOracle::new(&[]);
		let input = tags(&[("music", 1.3)]);
		let result = adapt_weights(&input, &[], &oracle, &AdapterConfig::default()).unwrap();
		assert_eq!(result, input);
	}

	#[test]
	fn exact_match_boosts() {
		// similarity(music, music) = 1.0 -> 1.0 + 0.15 * 1.0 = 1.15
		let oracle = StubOracle::new(&[]);
		let input = tags(&[("music", 1.0)]);
		let result =
			adapt_weights(&input, &names(&["music"]), &oracle, &AdapterConfig::default()).unwrap();
		assert!((result[0].weight - 1.15).abs() < 1e-10);
	}

	#[test]
	fn weak_match_decays() {
		// similarity 0.1 < 0.5 -> 1.0 - 0.05 * (1 - 0.1) = 0.955
		let oracle = StubOracle::new(&[("music", "finance", 0.1)]);
		let input = tags(&[("music", 1.0)]);
		let result =
			adapt_weights(&input, &names(&["finance"]), &oracle, &AdapterConfig::default())
				.unwrap();
		assert!((result[0].weight - 0.955).abs() < 1e-10);
	}

	#[test]
	fn boost_diminishes_across_strong_matches() {
		// Two strong matches walked best-first: 0.9 then 0.8.
		// 1.0 + 0.15*0.9 = 1.135, then + 0.15*0.9 falloff -> + 0.135*0.8 = 1.243
		let oracle = StubOracle::new(&[("music", "jazz", 0.9), ("music", "blues", 0.8)]);
		let input = tags(&[("music", 1.0)]);
		let result = adapt_weights(
			&input,
			&names(&["blues", "jazz"]),
			&oracle,
			&AdapterConfig::default(),
		)
		.unwrap();
		let expected = 1.0 + 0.15 * 0.9 + 0.15 * 0.9 * 0.8;
		assert!((result[0].weight - expected).abs() < 1e-10);
	}

	#[test]
	fn decay_compounds_across_weak_matches() {
		let oracle = StubOracle::new(&[("music", "tax", 0.2), ("music", "law", 0.1)]);
		let input = tags(&[("music", 1.0)]);
		let result = adapt_weights(
			&input,
			&names(&["tax", "law"]),
			&oracle,
			&AdapterConfig::default(),
		)
		.unwrap();
		// Sorted descending: 0.2 first, then 0.1 with grown decay.
		let expected = 1.0 - 0.05 * (1.0 - 0.2) - 0.05 * 1.1 * (1.0 - 0.1);
		assert!((result[0].weight - expected).abs() < 1e-10);
	}

	#[test]
	fn weight_never_exceeds_max() {
		let oracle = StubOracle::new(&[]);
		let input = tags(&[("music", 2.95)]);
		let result =
			adapt_weights(&input, &names(&["music"]), &oracle, &AdapterConfig::default()).unwrap();
		assert_eq!(result[0].weight, 3.0);
	}

	#[test]
	fn weight_never_drops_below_min() {
		let oracle = StubOracle::new(&[("music", "finance", 0.0)]);
		let input = tags(&[("music", 0.11)]);
		let result =
			adapt_weights(&input, &names(&["finance"]), &oracle, &AdapterConfig::default())
				.unwrap();
		assert_eq!(result[0].weight, 0.1);
	}

	#[test]
	fn out_of_range_start_is_clamped() {
		let oracle = StubOracle::new(&[]);
		let high = tags(&[("music", 10.0)]);
		let result =
			adapt_weights(&high, &names(&["music"]), &oracle, &AdapterConfig::default()).unwrap();
		assert_eq!(result[0].weight, 3.0);

		let oracle = StubOracle::new(&[("music", "finance", 0.0)]);
		let low = tags(&[("music", 0.01)]);
		let result =
			adapt_weights(&low, &names(&["finance"]), &oracle, &AdapterConfig::default()).unwrap();
		assert_eq!(result[0].weight, 0.1);
	}

	#[test]
	fn order_and_names_preserved() {
		let oracle = StubOracle::new(&[("a", "x", 0.9), ("b", "x", 0.1)]);
		let input = tags(&[("a", 1.0), ("b", 1.0)]);
		let result =
			adapt_weights(&input, &names(&["x"]), &oracle, &AdapterConfig::default()).unwrap();
		assert_eq!(result[0].name, "a");
		assert_eq!(result[1].name, "b");
		assert!(result[0].weight > 1.0);
		assert!(result[1].weight < 1.0);
	}

	#[test]
	fn mixed_strong_and_weak_matches() {
		// Strong 0.7 boosts first, weak 0.3 then decays.
		let oracle = StubOracle::new(&[("music", "jazz", 0.7), ("music", "golf", 0.3)]);
		let input = tags(&[("music", 1.0)]);
		let result = adapt_weights(
			&input,
			&names(&["golf", "jazz"]),
			&oracle,
			&AdapterConfig::default(),
		)
		.unwrap();
		let expected = 1.0 + 0.15 * 0.7 - 0.05 * (1.0 - 0.3);
		assert!((result[0].weight - expected).abs() < 1e-10);
	}
}
