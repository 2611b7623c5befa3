use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// https://firebase.google.com/docs/firestore/reference/rest/v1/projects.databases.documents/commit
#[derive(Debug, Serialize)]
pub(crate) struct CommitRequest {
	pub writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Write {
	pub transform: DocumentTransform,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DocumentTransform {
	pub document: String,
	pub field_transforms: Vec<FieldTransform>,
}

// `appendMissingElements` is the REST spelling of arrayUnion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldTransform {
	pub field_path: String,
	pub append_missing_elements: ArrayValue,
}

#[derive(Debug, Serialize)]
pub(crate) struct ArrayValue {
	pub values: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MapValue {
	pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Value {
	DoubleValue(f64),
	MapValue(MapValue),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommitResponse {
	pub commit_time: String,
}
