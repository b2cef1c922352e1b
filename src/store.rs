// ---------------------------------------------------------------------------
// TagStore — core state manager
// ---------------------------------------------------------------------------
//
// Holds the tag embeddings, the event catalog, and the weighted profile tag
// sets, and wires them into the scorer and the adapter. The scorer and
// adapter stay pure: each request builds an oracle over the current
// embedding snapshot, computes derived values, and only `register` writes
// anything back (the updated weights).
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use uuid::Uuid;

use crate::adapter::{adapt_weights, AdapterConfig};
use crate::error::RecError;
use crate::oracle::EmbeddingOracle;
use crate::persistence::{self, PersistedProfile, PersistedTag, StoreSnapshot, SNAPSHOT_VERSION};
use crate::scorer::{recommend, ScorerConfig};
use crate::types::{Event, ProfileTag, Recommended, RegistrationResult, RegistrationStatus};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a `TagStore`.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
	pub storage_path: Option<String>,
	pub scorer: ScorerConfig,
	pub adapter: AdapterConfig,
}

// ---------------------------------------------------------------------------
// Messages for the defined empty-result cases
// ---------------------------------------------------------------------------

pub const MSG_NO_PROFILE_TAGS: &str = "Profile has no tags.";
pub const MSG_NO_EVENT_TAGS: &str = "No event tags exist.";

// ---------------------------------------------------------------------------
// Macro for ensuring initialization
// ---------------------------------------------------------------------------

macro_rules! ensure_initialized {
	($self:expr) => {
		if !$self.initialized {
			return Err(RecError::NotInitialized);
		}
	};
}

// ---------------------------------------------------------------------------
// TagStore
// ---------------------------------------------------------------------------

/// Central stateful store for tag embeddings, events, and profiles.
pub struct TagStore {
	/// Registered tag embeddings, the oracle's backing data.
	tag_embeddings: HashMap<String, Vec<f32>>,
	/// Event catalog in insertion order — the scorer's tie-break order.
	events: Vec<Event>,
	/// Profile id -> weighted tag set (one entry per distinct tag).
	profiles: HashMap<String, Vec<ProfileTag>>,
	config: StoreConfig,
	initialized: bool,
	dirty: bool,
}

impl TagStore {
	// -- Lifecycle -----------------------------------------------------------

	/// Create a new `TagStore` with empty state. Not yet initialized.
	pub fn new(config: StoreConfig) -> Self {
		Self {
			tag_embeddings: HashMap::new(),
			events: Vec::new(),
			profiles: HashMap::new(),
			config,
			initialized: false,
			dirty: false,
		}
	}

	/// Initialize the store. If a storage path is provided (or was set in
	/// config), load the persisted snapshot from disk.
	pub fn initialize(&mut self, storage_path: Option<&str>) -> Result<(), RecError> {
		let effective_path = storage_path
			.map(|s| s.to_string())
			.or_else(|| self.config.storage_path.clone());

		if let Some(ref path) = effective_path {
			self.config.storage_path = Some(path.clone());
			if let Some(snapshot) = persistence::load_from_path(path).map_err(map_persistence)? {
				self.restore(snapshot)?;
			}
		}

		self.initialized = true;
		self.dirty = false;
		Ok(())
	}

	/// Persist the current state if a storage path is configured.
	pub fn save(&mut self) -> Result<(), RecError> {
		ensure_initialized!(self);
		if let Some(path) = self.config.storage_path.clone() {
			let snapshot = self.snapshot();
			persistence::save_to_path(&path, &snapshot).map_err(map_persistence)?;
			self.dirty = false;
		}
		Ok(())
	}

	/// Save pending changes (when dirty) and mark the store uninitialized.
	pub fn dispose(&mut self) -> Result<(), RecError> {
		ensure_initialized!(self);
		if self.dirty {
			self.save()?;
		}
		self.initialized = false;
		Ok(())
	}

	/// Drop all tags, events, and profiles.
	pub fn clear(&mut self) {
		self.tag_embeddings.clear();
		self.events.clear();
		self.profiles.clear();
		self.dirty = true;
	}

	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	pub fn tag_count(&self) -> usize {
		self.tag_embeddings.len()
	}

	pub fn event_count(&self) -> usize {
		self.events.len()
	}

	pub fn profile_count(&self) -> usize {
		self.profiles.len()
	}

	// -- Tag embeddings ------------------------------------------------------

	/// Register (or replace) the embedding for a tag.
	pub fn upsert_tag(&mut self, name: &str, embedding: Vec<f32>) -> Result<(), RecError> {
		ensure_initialized!(self);
		if name.trim().is_empty() {
			return Err(RecError::EmptyTag);
		}
		if embedding.is_empty() {
			return Err(RecError::EmptyEmbedding(name.to_string()));
		}
		self.tag_embeddings.insert(name.to_string(), embedding);
		self.dirty = true;
		Ok(())
	}

	/// Remove a tag embedding. Returns whether it existed.
	pub fn delete_tag(&mut self, name: &str) -> Result<bool, RecError> {
		ensure_initialized!(self);
		let removed = self.tag_embeddings.remove(name).is_some();
		if removed {
			self.dirty = true;
		}
		Ok(removed)
	}

	/// Names of all registered tags, sorted for stable output.
	pub fn tag_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.tag_embeddings.keys().cloned().collect();
		names.sort();
		names
	}

	// -- Events --------------------------------------------------------------

	/// Add an event to the catalog. Generates an id when none is given.
	pub fn add_event(
		&mut self,
		id: Option<String>,
		name: String,
		tags: Vec<String>,
	) -> Result<String, RecError> {
		ensure_initialized!(self);
		let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
		if let Some(existing) = self.events.iter_mut().find(|e| e.id == id) {
			existing.name = name;
			existing.tags = tags;
		} else {
			self.events.push(Event {
				id: id.clone(),
				name,
				tags,
			});
		}
		self.dirty = true;
		Ok(id)
	}

	/// Remove an event. Returns whether it existed.
	pub fn delete_event(&mut self, id: &str) -> Result<bool, RecError> {
		ensure_initialized!(self);
		let before = self.events.len();
		self.events.retain(|e| e.id != id);
		let removed = self.events.len() != before;
		if removed {
			self.dirty = true;
		}
		Ok(removed)
	}

	pub fn events(&self) -> &[Event] {
		&self.events
	}

	// -- Profiles ------------------------------------------------------------

	/// Replace a profile's tag set. Duplicate tag names are merged before
	/// they reach the core: the first occurrence wins.
	pub fn set_profile_tags(
		&mut self,
		profile_id: &str,
		tags: Vec<ProfileTag>,
	) -> Result<(), RecError> {
		ensure_initialized!(self);
		let mut merged: Vec<ProfileTag> = Vec::with_capacity(tags.len());
		for tag in tags {
			if tag.name.trim().is_empty() {
				return Err(RecError::EmptyTag);
			}
			if merged.iter().any(|t| t.name == tag.name) {
				tracing::warn!(profile = profile_id, tag = %tag.name, "duplicate profile tag merged");
				continue;
			}
			merged.push(tag);
		}
		self.profiles.insert(profile_id.to_string(), merged);
		self.dirty = true;
		Ok(())
	}

	pub fn profile_tags(&self, profile_id: &str) -> Vec<ProfileTag> {
		self.profiles.get(profile_id).cloned().unwrap_or_default()
	}

	// -- Recommendation (read path) ------------------------------------------

	/// Rank the catalog for a profile. Empty tag sets on either side are
	/// defined empty-result cases with a message, not errors; an oracle
	/// failure is returned as `Err` for the caller to surface.
	pub fn recommend_for_profile(&self, profile_id: &str) -> Result<Recommended, RecError> {
		ensure_initialized!(self);

		let profile_tags = self.profile_tags(profile_id);
		if profile_tags.is_empty() {
			return Ok(Recommended::empty(MSG_NO_PROFILE_TAGS));
		}
		if self.events.iter().all(|e| e.tags.is_empty()) {
			return Ok(Recommended::empty(MSG_NO_EVENT_TAGS));
		}

		let oracle = EmbeddingOracle::new(&self.tag_embeddings);
		let events = recommend(&profile_tags, &self.events, &oracle, &self.config.scorer)?;
		tracing::debug!(
			profile = profile_id,
			candidates = self.events.len(),
			recommended = events.len(),
			"recommendation computed"
		);
		Ok(Recommended {
			events,
			message: None,
		})
	}

	// -- Registration (write path) -------------------------------------------

	/// Record that `profile_id` registered for `event_id`: adapt the
	/// profile's weights against the event's tags and commit them.
	pub fn register(
		&mut self,
		event_id: &str,
		profile_id: &str,
	) -> Result<RegistrationResult, RecError> {
		ensure_initialized!(self);

		let event = self
			.events
			.iter()
			.find(|e| e.id == event_id)
			.ok_or_else(|| RecError::EventNotFound(event_id.to_string()))?;
		let event_tags = event.tags.clone();

		let profile_tags = self.profile_tags(profile_id);
		if profile_tags.is_empty() || event_tags.is_empty() {
			return Ok(RegistrationResult {
				status: RegistrationStatus::NoOp,
				weights: profile_tags,
			});
		}

		let oracle = EmbeddingOracle::new(&self.tag_embeddings);
		let updated = adapt_weights(&profile_tags, &event_tags, &oracle, &self.config.adapter)?;

		self.profiles
			.insert(profile_id.to_string(), updated.clone());
		self.dirty = true;
		tracing::debug!(
			profile = profile_id,
			event = event_id,
			tags = updated.len(),
			"weights adapted"
		);

		Ok(RegistrationResult {
			status: RegistrationStatus::Updated,
			weights: updated,
		})
	}

	// -- Snapshot ------------------------------------------------------------

	fn snapshot(&self) -> StoreSnapshot {
		let mut tags: Vec<PersistedTag> = self
			.tag_embeddings
			.iter()
			.map(|(name, embedding)| PersistedTag {
				name: name.clone(),
				embedding: persistence::encode_embedding(embedding),
			})
			.collect();
		tags.sort_by(|a, b| a.name.cmp(&b.name));

		let mut profiles: Vec<PersistedProfile> = self
			.profiles
			.iter()
			.map(|(id, tags)| PersistedProfile {
				id: id.clone(),
				tags: tags.clone(),
			})
			.collect();
		profiles.sort_by(|a, b| a.id.cmp(&b.id));

		StoreSnapshot {
			version: SNAPSHOT_VERSION,
			tags,
			events: self.events.clone(),
			profiles,
		}
	}

	fn restore(&mut self, snapshot: StoreSnapshot) -> Result<(), RecError> {
		self.tag_embeddings.clear();
		for tag in snapshot.tags {
			let embedding =
				persistence::decode_embedding(&tag.embedding).map_err(map_persistence)?;
			self.tag_embeddings.insert(tag.name, embedding);
		}
		self.events = snapshot.events;
		self.profiles = snapshot
			.profiles
			.into_iter()
			.map(|p| (p.id, p.tags))
			.collect();
		Ok(())
	}
}

fn map_persistence(e: persistence::PersistenceError) -> RecError {
	match e {
		persistence::PersistenceError::Io(io) => RecError::Io(io),
		persistence::PersistenceError::Corruption(msg) => RecError::Corruption(msg),
		persistence::PersistenceError::Serialization(msg) => RecError::Serialization(msg),
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
