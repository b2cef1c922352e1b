// ---------------------------------------------------------------------------
// NDJSON transport — one JSON-RPC 2.0 message per stdout line
// ---------------------------------------------------------------------------

use std::io::Write;

/// Writes JSON-RPC 2.0 responses as newline-delimited JSON on stdout.
/// Logs go to stderr via tracing; stdout carries only protocol frames.
#[derive(Default)]
pub struct NdjsonTransport;

impl NdjsonTransport {
	pub fn new() -> Self {
		Self
	}

	pub fn write_response(&mut self, id: u64, result: serde_json::Value) {
		self.write_line(serde_json::json!({
			"jsonrpc": "2.0",
			"id": id,
			"result": result,
		}));
	}

	pub fn write_error(
		&mut self,
		id: u64,
		code: i32,
		message: String,
		data: Option<serde_json::Value>,
	) {
		let mut error = serde_json::json!({
			"code": code,
			"message": message,
		});
		if let Some(data) = data {
			error["data"] = data;
		}
		self.write_line(serde_json::json!({
			"jsonrpc": "2.0",
			"id": id,
			"error": error,
		}));
	}

	fn write_line(&mut self, value: serde_json::Value) {
		let stdout = std::io::stdout();
		let mut handle = stdout.lock();
		if let Err(e) = writeln!(handle, "{}", value) {
			tracing::error!("Failed to write response: {}", e);
			return;
		}
		if let Err(e) = handle.flush() {
			tracing::error!("Failed to flush stdout: {}", e);
		}
	}
}
