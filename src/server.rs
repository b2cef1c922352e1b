// ---------------------------------------------------------------------------
// RecServer — JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes incoming JSON-RPC 2.0 requests (NDJSON over stdin) to TagStore
// operations: a main `run()` loop, a `dispatch()` match, `with_store` /
// `with_store_mut` helpers, and free-standing handler functions per method.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};

use serde::Deserialize;

use crate::adapter::AdapterConfig;
use crate::error::RecError;
use crate::protocol::*;
use crate::scorer::ScorerConfig;
use crate::store::{StoreConfig, TagStore};
use crate::transport::NdjsonTransport;
use crate::types::ProfileTag;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// JSON-RPC server that dispatches requests to a [`TagStore`].
pub struct RecServer {
	transport: NdjsonTransport,
	store: Option<TagStore>,
}

impl RecServer {
	/// Create a new server with the given transport. The store is created
	/// lazily when `store/initialize` is called.
	pub fn new(transport: NdjsonTransport) -> Self {
		Self {
			transport,
			store: None,
		}
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), RecError> {
		let stdin = io::stdin();
		let reader = stdin.lock();

		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let result = match req.method.as_str() {
			// -- Lifecycle -----------------------------------------------
			"store/initialize" => self.handle_initialize(req.params),
			"store/save" => self.with_store_mut(|s| {
				s.save()?;
				Ok(serde_json::json!({}))
			}),
			"store/dispose" => self.with_store_mut(|s| {
				s.dispose()?;
				Ok(serde_json::json!({}))
			}),
			"store/clear" => self.with_store_mut(|s| {
				s.clear();
				Ok(serde_json::json!({}))
			}),
			"store/stats" => self.with_store(|s| {
				Ok(serde_json::json!({
					"tags": s.tag_count(),
					"events": s.event_count(),
					"profiles": s.profile_count(),
				}))
			}),
			"store/isDirty" => {
				self.with_store(|s| Ok(serde_json::json!({ "dirty": s.is_dirty() })))
			}

			// -- Tag embeddings ------------------------------------------
			"tags/upsert" => self.with_store_mut(|s| handle_tag_upsert(s, req.params)),
			"tags/upsertBatch" => {
				self.with_store_mut(|s| handle_tag_upsert_batch(s, req.params))
			}
			"tags/delete" => self.with_store_mut(|s| handle_tag_delete(s, req.params)),
			"tags/list" => {
				self.with_store(|s| Ok(serde_json::json!({ "tags": s.tag_names() })))
			}

			// -- Events --------------------------------------------------
			"events/add" => self.with_store_mut(|s| handle_event_add(s, req.params)),
			"events/delete" => self.with_store_mut(|s| handle_event_delete(s, req.params)),
			"events/list" => {
				self.with_store(|s| Ok(serde_json::json!({ "events": s.events() })))
			}

			// -- Profiles ------------------------------------------------
			"profiles/setTags" => {
				self.with_store_mut(|s| handle_profile_set_tags(s, req.params))
			}
			"profiles/get" => self.with_store(|s| handle_profile_get(s, req.params)),

			// -- Recommendation ------------------------------------------
			"events/recommended" => self.with_store(|s| handle_recommended(s, req.params)),

			// -- Registration --------------------------------------------
			"events/register" => self.with_store_mut(|s| handle_register(s, req.params)),

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e) => self.transport.write_error(
				id,
				EVREC_ERROR,
				e.to_string(),
				Some(e.to_json_rpc_error()),
			),
		}
	}

	// ── Store accessors ───────────────────────────────────────────────────

	fn with_store<F>(&self, f: F) -> Result<serde_json::Value, RecError>
	where
		F: FnOnce(&TagStore) -> Result<serde_json::Value, RecError>,
	{
		match &self.store {
			Some(s) => f(s),
			None => Err(RecError::NotInitialized),
		}
	}

	fn with_store_mut<F>(&mut self, f: F) -> Result<serde_json::Value, RecError>
	where
		F: FnOnce(&mut TagStore) -> Result<serde_json::Value, RecError>,
	{
		match &mut self.store {
			Some(s) => f(s),
			None => Err(RecError::NotInitialized),
		}
	}

	// ── Initialize ────────────────────────────────────────────────────────

	fn handle_initialize(
		&mut self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, RecError> {
		let p: InitializeParams = parse_params(params)?;

		let scorer_defaults = ScorerConfig::default();
		let adapter_defaults = AdapterConfig::default();
		let config = StoreConfig {
			storage_path: p.storage_path.clone(),
			scorer: ScorerConfig {
				match_threshold: p.match_threshold.unwrap_or(scorer_defaults.match_threshold),
				max_results: p.max_results.unwrap_or(scorer_defaults.max_results),
			},
			adapter: AdapterConfig {
				sim_threshold: p.sim_threshold.unwrap_or(adapter_defaults.sim_threshold),
				boost: p.boost.unwrap_or(adapter_defaults.boost),
				decay: p.decay.unwrap_or(adapter_defaults.decay),
				min_weight: p.min_weight.unwrap_or(adapter_defaults.min_weight),
				max_weight: p.max_weight.unwrap_or(adapter_defaults.max_weight),
				..adapter_defaults
			},
		};

		let mut store = TagStore::new(config);
		store.initialize(p.storage_path.as_deref())?;
		self.store = Some(store);

		Ok(serde_json::json!({}))
	}
}

// ---------------------------------------------------------------------------
// Param types
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, RecError> {
	serde_json::from_value(params)
		.map_err(|e| RecError::Serialization(format!("Invalid params: {}", e)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
	storage_path: Option<String>,
	match_threshold: Option<f64>,
	max_results: Option<usize>,
	sim_threshold: Option<f64>,
	boost: Option<f64>,
	decay: Option<f64>,
	min_weight: Option<f64>,
	max_weight: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagUpsertParams {
	name: String,
	embedding: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagUpsertBatchParams {
	tags: Vec<TagUpsertParams>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagDeleteParams {
	name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventAddParams {
	id: Option<String>,
	name: String,
	#[serde(default)]
	tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDeleteParams {
	id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSetTagsParams {
	profile_id: String,
	tags: Vec<ProfileTag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileIdParams {
	profile_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterParams {
	event_id: String,
	profile_id: String,
}

// ---------------------------------------------------------------------------
// Free-standing handler functions
// ---------------------------------------------------------------------------

fn handle_tag_upsert(
	store: &mut TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: TagUpsertParams = parse_params(params)?;
	store.upsert_tag(&p.name, p.embedding)?;
	Ok(serde_json::json!({}))
}

fn handle_tag_upsert_batch(
	store: &mut TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: TagUpsertBatchParams = parse_params(params)?;
	let count = p.tags.len();
	for tag in p.tags {
		store.upsert_tag(&tag.name, tag.embedding)?;
	}
	Ok(serde_json::json!({ "count": count }))
}

fn handle_tag_delete(
	store: &mut TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: TagDeleteParams = parse_params(params)?;
	let deleted = store.delete_tag(&p.name)?;
	Ok(serde_json::json!({ "deleted": deleted }))
}

fn handle_event_add(
	store: &mut TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: EventAddParams = parse_params(params)?;
	let id = store.add_event(p.id, p.name, p.tags)?;
	Ok(serde_json::json!({ "id": id }))
}

fn handle_event_delete(
	store: &mut TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: EventDeleteParams = parse_params(params)?;
	let deleted = store.delete_event(&p.id)?;
	Ok(serde_json::json!({ "deleted": deleted }))
}

fn handle_profile_set_tags(
	store: &mut TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: ProfileSetTagsParams = parse_params(params)?;
	store.set_profile_tags(&p.profile_id, p.tags)?;
	Ok(serde_json::json!({}))
}

fn handle_profile_get(
	store: &TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: ProfileIdParams = parse_params(params)?;
	let tags = store.profile_tags(&p.profile_id);
	Ok(serde_json::json!({ "tags": tags }))
}

fn handle_recommended(
	store: &TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: ProfileIdParams = parse_params(params)?;
	match store.recommend_for_profile(&p.profile_id) {
		Ok(recommended) => {
			serde_json::to_value(recommended).map_err(|e| RecError::Serialization(e.to_string()))
		}
		// An oracle failure is a local, recoverable failure at the request
		// boundary: empty result with an error field, not a JSON-RPC error.
		Err(RecError::Oracle(msg)) => {
			tracing::warn!(profile = %p.profile_id, "oracle failure: {}", msg);
			Ok(serde_json::json!({ "events": [], "error": msg }))
		}
		Err(e) => Err(e),
	}
}

fn handle_register(
	store: &mut TagStore,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecError> {
	let p: RegisterParams = parse_params(params)?;
	let result = store.register(&p.event_id, &p.profile_id)?;
	serde_json::to_value(result).map_err(|e| RecError::Serialization(e.to_string()))
}
