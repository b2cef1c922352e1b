use serde::{Deserialize, Serialize};

fn default_weight() -> f64 {
	1.0
}

/// A profile's interest tag with its affinity weight.
///
/// Weight is a positive multiplier on influence. New tags start at 1.0;
/// the adapter keeps updated weights inside the configured bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTag {
	pub name: String,
	#[serde(default = "default_weight")]
	pub weight: f64,
}

impl ProfileTag {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			weight: default_weight(),
		}
	}

	pub fn with_weight(name: impl Into<String>, weight: f64) -> Self {
		Self {
			name: name.into(),
			weight,
		}
	}
}

/// An event in the catalog: id, display name, and its (unweighted) tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub id: String,
	pub name: String,
	pub tags: Vec<String>,
}

/// One recommended event with its match score.
///
/// Serializes flat (`{id, name, tags, score}`) so clients see the event
/// fields alongside the score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
	#[serde(flatten)]
	pub event: Event,
	pub score: f64,
}

/// The full recommendation response: a ranked, capped list of events,
/// plus an explanatory message for the defined empty cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommended {
	pub events: Vec<Recommendation>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl Recommended {
	pub fn empty(message: impl Into<String>) -> Self {
		Self {
			events: Vec::new(),
			message: Some(message.into()),
		}
	}
}

/// Outcome of a registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationStatus {
	/// Either the profile or the event had no tags; nothing changed.
	NoOp,
	/// Weights were recomputed and written back.
	Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResult {
	pub status: RegistrationStatus,
	pub weights: Vec<ProfileTag>,
}
