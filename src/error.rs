use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecError {
	#[error("Store not initialized: call store/initialize first")]
	NotInitialized,
	#[error("Empty tag name")]
	EmptyTag,
	#[error("Empty embedding for tag '{0}'")]
	EmptyEmbedding(String),
	#[error("Event not found: {0}")]
	EventNotFound(String),
	#[error("Similarity oracle failure: {0}")]
	Oracle(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Storage corruption: {0}")]
	Corruption(String),
}

impl RecError {
	pub fn code(&self) -> &str {
		match self {
			Self::NotInitialized => "EVREC_NOT_INITIALIZED",
			Self::EmptyTag => "EVREC_EMPTY_TAG",
			Self::EmptyEmbedding(_) => "EVREC_EMPTY_EMBEDDING",
			Self::EventNotFound(_) => "EVREC_EVENT_NOT_FOUND",
			Self::Oracle(_) => "EVREC_ORACLE_FAILURE",
			Self::Io(_) => "EVREC_IO",
			Self::Serialization(_) => "EVREC_SERIALIZATION",
			Self::Corruption(_) => "EVREC_CORRUPT",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"evrecCode": self.code(),
			"message": self.to_string(),
		})
	}
}
