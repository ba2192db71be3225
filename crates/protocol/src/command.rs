use foundation::ids::LayerId;
use layers::Layer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BackendError, status_checked};

/// Path appended to the API base for natural-language queries.
pub const PROCESS_QUERY_PATH: &str = "/process-gis-query";

/// Fallback message when the command channel fails without an explanation.
pub const COMMAND_FALLBACK_ERROR: &str = "Request failed";

/// What the assistant is told about one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerContext {
    pub name: String,
    pub id: LayerId,
    pub visible: bool,
    /// Geometry type of the first feature, `"Unknown"` for empty layers.
    #[serde(rename = "type")]
    pub geometry_type: String,
}

impl From<&Layer> for LayerContext {
    fn from(layer: &Layer) -> Self {
        Self {
            name: layer.name().to_string(),
            id: layer.id(),
            visible: layer.visible(),
            geometry_type: layer.primary_geometry_type().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContext {
    pub layers: Vec<LayerContext>,
}

/// Body posted to the assistant endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub query: String,
    pub context: CommandContext,
}

impl CommandRequest {
    pub fn new<'a>(query: impl Into<String>, layers: impl IntoIterator<Item = &'a Layer>) -> Self {
        Self {
            query: query.into(),
            context: CommandContext {
                layers: layers.into_iter().map(LayerContext::from).collect(),
            },
        }
    }

    /// Body for the older single-command endpoint, which takes no context.
    pub fn legacy(&self) -> LegacyCommandRequest {
        LegacyCommandRequest {
            command: self.query.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyCommandRequest {
    pub command: String,
}

/// One result to be turned into a layer.
///
/// `geojson` is either a structured collection or a JSON string holding one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(default)]
    pub geojson: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ResultEntry {
    /// Reads one entry as received. Shape problems are reported for this
    /// entry alone so the caller can carry on with its siblings.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut obj) = value else {
            return Err(format!("result entry must be an object, got {value}"));
        };
        let name = match obj.remove("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => return Err(format!("result name must be a string, got {other}")),
        };
        let geojson = obj.remove("geojson").filter(|v| !v.is_null());
        Ok(Self { geojson, name })
    }

    pub fn into_value(self) -> Value {
        let mut obj = Map::new();
        obj.insert("geojson".to_string(), self.geojson.unwrap_or(Value::Null));
        if let Some(name) = self.name {
            obj.insert("name".to_string(), Value::String(name));
        }
        Value::Object(obj)
    }
}

/// Ingest input: a batch of results, or a single legacy result.
///
/// Entries stay raw JSON until ingestion so that one badly shaped entry
/// cannot take its siblings down with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngestPayload {
    Batch(Vec<Value>),
    Single(Value),
}

impl IngestPayload {
    pub fn into_entries(self) -> Vec<Value> {
        match self {
            IngestPayload::Batch(entries) => entries,
            IngestPayload::Single(entry) => vec![entry],
        }
    }
}

impl From<Vec<ResultEntry>> for IngestPayload {
    fn from(entries: Vec<ResultEntry>) -> Self {
        IngestPayload::Batch(entries.into_iter().map(ResultEntry::into_value).collect())
    }
}

impl From<ResultEntry> for IngestPayload {
    fn from(entry: ResultEntry) -> Self {
        IngestPayload::Single(entry.into_value())
    }
}

/// Either reply shape, as received. Every field is optional and untyped so a
/// single struct covers both and no field can fail the whole reply.
#[derive(Debug, Default, Deserialize)]
struct RawReply {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    results: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    geojson: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
}

/// A command reply after normalization.
///
/// Structured replies (`{message, results}`) map field for field. Legacy
/// replies (`{result, error?, geojson?, name?}`) become a message, an optional
/// error and at most one result. `results` holds the entries unparsed; see
/// [`ResultEntry::from_value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandReply {
    pub message: Option<String>,
    pub error: Option<String>,
    pub results: Vec<Value>,
}

/// Text form of a loosely typed field; `null` counts as absent.
fn text_of(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl CommandReply {
    pub fn from_value(value: Value) -> Result<Self, BackendError> {
        let raw: RawReply =
            serde_json::from_value(value).map_err(|e| BackendError::Payload(e.to_string()))?;
        let error = text_of(raw.error);
        if let Some(results) = raw.results {
            let results = match results {
                Value::Array(entries) => entries,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            return Ok(Self {
                message: text_of(raw.message),
                error,
                results,
            });
        }
        let message = text_of(raw.result).or_else(|| text_of(raw.message));
        let results = match raw.geojson {
            Some(Value::Null) | None => Vec::new(),
            Some(geojson) => {
                let mut entry = Map::new();
                entry.insert("geojson".to_string(), geojson);
                if let Some(name) = raw.name {
                    entry.insert("name".to_string(), name);
                }
                vec![Value::Object(entry)]
            }
        };
        Ok(Self {
            message,
            error,
            results,
        })
    }

    pub fn into_payload(self) -> IngestPayload {
        IngestPayload::Batch(self.results)
    }
}

pub fn decode_command_reply(status: u16, body: &str) -> Result<CommandReply, BackendError> {
    let value = status_checked(status, body)?;
    CommandReply::from_value(value)
}
