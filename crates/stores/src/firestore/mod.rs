use std::collections::BTreeMap;

use anyhow::Context;
use api_schemes::{ArrayValue, CommitRequest, CommitResponse, DocumentTransform, FieldTransform, MapValue, Value, Write};
use motion::{EventStore, PotholeRecord};
use serde::Deserialize;
use tracing::debug;
mod api_schemes;

const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com";

/// Location of the shared pothole list. Defaults match the `potholes/global` document the map reads.
#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreConfig {
	#[serde(default = "default_base_url")]
	pub base_url: String,
	pub project_id: String,
	#[serde(default = "default_database")]
	pub database: String,
	#[serde(default = "default_collection")]
	pub collection: String,
	#[serde(default = "default_document")]
	pub document: String,
	#[serde(default = "default_field")]
	pub field: String,
	pub api_key: Option<String>,
	pub auth_token: Option<String>,
}

fn default_base_url() -> String {
	String::from(FIRESTORE_API_BASE)
}

fn default_database() -> String {
	String::from("(default)")
}

fn default_collection() -> String {
	String::from("potholes")
}

fn default_document() -> String {
	String::from("global")
}

fn default_field() -> String {
	String::from("potholes")
}

/// Merges reports into an array field with array-union semantics, so identical
/// coordinates from concurrent writers collapse into one element.
pub struct FirestoreStore {
	client: reqwest::Client,
	config: FirestoreConfig,
}

impl FirestoreStore {
	#[must_use]
	pub fn new(config: FirestoreConfig) -> Self {
		Self { client: reqwest::Client::new(), config }
	}

	fn document_name(&self) -> String {
		let FirestoreConfig { project_id, database, collection, document, .. } = &self.config;
		format!("projects/{project_id}/databases/{database}/documents/{collection}/{document}")
	}

	fn commit_url(&self) -> String {
		let FirestoreConfig { base_url, project_id, database, .. } = &self.config;
		format!("{}/v1/projects/{project_id}/databases/{database}/documents:commit", base_url.trim_end_matches('/'))
	}

	fn commit_request(&self, record: &PotholeRecord) -> CommitRequest {
		let fields = BTreeMap::from([
			(String::from("latitude"), Value::DoubleValue(record.latitude)),
			(String::from("longitude"), Value::DoubleValue(record.longitude)),
		]);

		CommitRequest {
			writes: vec![Write {
				transform: DocumentTransform {
					document: self.document_name(),
					field_transforms: vec![FieldTransform {
						field_path: self.config.field.clone(),
						append_missing_elements: ArrayValue { values: vec![Value::MapValue(MapValue { fields })] },
					}],
				},
			}],
		}
	}
}

#[async_trait::async_trait]
impl EventStore for FirestoreStore {
	fn name(&self) -> &'static str {
		"firestore"
	}

	async fn append(&self, record: &PotholeRecord) -> anyhow::Result<()> {
		let mut request = self.client.post(self.commit_url()).json(&self.commit_request(record));

		if let Some(api_key) = &self.config.api_key {
			request = request.query(&[("key", api_key)]);
		}

		if let Some(token) = &self.config.auth_token {
			request = request.bearer_auth(token);
		}

		let document = self.document_name();

		let response = request
			.send()
			.await
			.context(format!("Failed to send pothole commit for {document}"))?
			.error_for_status()
			.context(format!("Firestore rejected pothole commit for {document}"))?;

		let response: CommitResponse =
			response.json().await.context(format!("Failed to parse commit response for {document}"))?;

		debug!(commit_time = %response.commit_time, "Firestore commit accepted");

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use serde_json::json;

	fn config() -> FirestoreConfig {
		serde_json::from_value(json!({ "project_id": "pothole-detective", "base_url": "http://localhost:8080/" })).unwrap()
	}

	fn record() -> PotholeRecord {
		PotholeRecord {
			latitude: 41.994_293,
			longitude: 21.418_497,
			peak_vertical: 31.5,
			detected_at: Utc::now(),
			reported_at: Utc::now(),
		}
	}

	#[test]
	fn defaults_point_at_global_document() {
		let store = FirestoreStore::new(config());

		assert_eq!(store.document_name(), "projects/pothole-detective/databases/(default)/documents/potholes/global");
		assert_eq!(
			store.commit_url(),
			"http://localhost:8080/v1/projects/pothole-detective/databases/(default)/documents:commit"
		);
	}

	#[test]
	fn commit_appends_coordinates_only() {
		let store = FirestoreStore::new(config());
		let body = serde_json::to_value(store.commit_request(&record())).unwrap();

		assert_eq!(
			body,
			json!({
				"writes": [{
					"transform": {
						"document": "projects/pothole-detective/databases/(default)/documents/potholes/global",
						"fieldTransforms": [{
							"fieldPath": "potholes",
							"appendMissingElements": {
								"values": [{
									"mapValue": {
										"fields": {
											"latitude": { "doubleValue": 41.994_293 },
											"longitude": { "doubleValue": 21.418_497 }
										}
									}
								}]
							}
						}]
					}
				}]
			})
		);
	}

	#[tokio::test]
	async fn unreachable_endpoint_names_document() {
		let config = serde_json::from_value(json!({ "project_id": "pothole-detective", "base_url": "http://127.0.0.1:1" }))
			.unwrap();
		let store = FirestoreStore::new(config);

		let error = store.append(&record()).await.unwrap_err();

		assert!(format!("{error:#}").contains("Failed to send pothole commit for projects/pothole-detective"));
	}

	#[test]
	fn parses_commit_response() {
		let response: CommitResponse =
			serde_json::from_str(r#"{"writeResults":[{"updateTime":"2024-01-01T00:00:00Z"}],"commitTime":"2024-01-01T00:00:00Z"}"#)
				.unwrap();

		assert_eq!(response.commit_time, "2024-01-01T00:00:00Z");
	}
}
