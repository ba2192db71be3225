use formats::FeatureCollection;
use foundation::ids::LayerId;
use layers::symbology::LayerStyle;
use layers::{LayerRegistry, NewLayer, Provenance};
use protocol::{IngestPayload, ResultEntry};
use serde_json::Value;
use tracing::{debug, warn};

pub const FALLBACK_RESULT_NAME: &str = "Command Result";

#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    /// The entry's GeoJSON could not be decoded.
    Parse(String),
    /// The entry carried no `geojson` at all.
    MissingGeometry,
    /// The entry itself was not a usable result object.
    Malformed(String),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Parse(reason) => write!(f, "{reason}"),
            IngestError::MissingGeometry => write!(f, "result carried no geometry"),
            IngestError::Malformed(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for IngestError {}

/// Result of ingesting one entry; exactly one of the two fields is set.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub layer: Option<LayerId>,
    pub error: Option<IngestError>,
}

impl IngestOutcome {
    fn created(id: LayerId) -> Self {
        Self {
            layer: Some(id),
            error: None,
        }
    }

    fn failed(err: IngestError) -> Self {
        Self {
            layer: None,
            error: Some(err),
        }
    }
}

/// Turns command results into layers.
///
/// Ordering contract:
/// - One outcome per input entry, in input order.
/// - A failing entry never prevents later entries from being processed.
#[derive(Debug, Clone)]
pub struct CommandResultIngestor {
    color: String,
    style: LayerStyle,
}

impl CommandResultIngestor {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            style: LayerStyle::default(),
        }
    }

    pub fn ingest(
        &self,
        registry: &mut LayerRegistry,
        payload: IngestPayload,
    ) -> Vec<IngestOutcome> {
        payload
            .into_entries()
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match self.ingest_one(registry, entry) {
                Ok(id) => IngestOutcome::created(id),
                Err(err) => {
                    warn!("command result {index} rejected: {err}");
                    IngestOutcome::failed(err)
                }
            })
            .collect()
    }

    fn ingest_one(
        &self,
        registry: &mut LayerRegistry,
        entry: Value,
    ) -> Result<LayerId, IngestError> {
        let entry = ResultEntry::from_value(entry).map_err(IngestError::Malformed)?;
        let Some(geojson) = entry.geojson else {
            return Err(IngestError::MissingGeometry);
        };
        let geometry = FeatureCollection::from_json_or_text(geojson)
            .map_err(|e| IngestError::Parse(e.to_string()))?;

        let name = match entry.name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => default_result_name(&geometry, registry.len() + 1),
        };
        let layer = registry.create(NewLayer {
            geometry,
            name: Some(name),
            color: self.color.clone(),
            style: self.style.clone(),
            provenance: Provenance::CommandResult,
        });
        debug!("command result layer {} created: {}", layer.id(), layer.name());
        Ok(layer.id())
    }
}

/// `"<GeometryType> Result <n>"` from the first feature, else the fallback.
pub fn default_result_name(geometry: &FeatureCollection, n: usize) -> String {
    match geometry.first_geometry_type() {
        Some(ty) => format!("{ty} Result {n}"),
        None => FALLBACK_RESULT_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const POINT_FC: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[0,0]}}]}"#;

    fn entry(geojson: Value, name: Option<&str>) -> Value {
        ResultEntry {
            geojson: Some(geojson),
            name: name.map(str::to_string),
        }
        .into_value()
    }

    #[test]
    fn one_bad_entry_does_not_block_siblings() {
        let mut reg = LayerRegistry::new();
        let ing = CommandResultIngestor::new("#FF4500");
        let out = ing.ingest(
            &mut reg,
            IngestPayload::Batch(vec![
                entry(Value::String(POINT_FC.to_string()), None),
                entry(Value::String("{not json".to_string()), None),
                entry(Value::String(POINT_FC.to_string()), Some("Buffered")),
            ]),
        );
        assert_eq!(out.len(), 3);
        assert!(out[0].layer.is_some() && out[0].error.is_none());
        assert!(out[1].layer.is_none());
        assert!(matches!(out[1].error, Some(IngestError::Parse(_))));
        assert!(out[2].layer.is_some());
        assert_eq!(reg.len(), 2);

        let names: Vec<&str> = reg.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["Point Result 1", "Buffered"]);
        assert!(reg.iter().all(|l| l.provenance() == Provenance::CommandResult));
        assert!(reg.iter().all(|l| l.color() == "#FF4500"));
    }

    #[test]
    fn legacy_single_matches_batch_of_one() {
        let ing = CommandResultIngestor::new("#FF4500");
        let e = entry(Value::String(POINT_FC.to_string()), None);

        let mut a = LayerRegistry::new();
        let mut b = LayerRegistry::new();
        let single = ing.ingest(&mut a, IngestPayload::Single(e.clone()));
        let batch = ing.ingest(&mut b, IngestPayload::Batch(vec![e]));
        assert_eq!(single, batch);
        assert_eq!(
            a.iter().map(|l| l.name().to_string()).collect::<Vec<_>>(),
            b.iter().map(|l| l.name().to_string()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_collection_uses_fallback_name() {
        let mut reg = LayerRegistry::new();
        let ing = CommandResultIngestor::new("#FF4500");
        ing.ingest(
            &mut reg,
            IngestPayload::Single(entry(json!({"type":"FeatureCollection","features":[]}), None)),
        );
        assert_eq!(reg.most_recent().map(|l| l.name()), Some(FALLBACK_RESULT_NAME));
    }

    #[test]
    fn missing_geojson_is_reported() {
        let mut reg = LayerRegistry::new();
        let ing = CommandResultIngestor::new("#FF4500");
        let out = ing.ingest(
            &mut reg,
            IngestPayload::Batch(vec![
                ResultEntry::default().into_value(),
                entry(Value::Null, Some("nothing")),
            ]),
        );
        assert_eq!(
            out,
            vec![
                IngestOutcome::failed(IngestError::MissingGeometry),
                IngestOutcome::failed(IngestError::MissingGeometry),
            ]
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn names_count_existing_layers() {
        let mut reg = LayerRegistry::new();
        let ing = CommandResultIngestor::new("#FF4500");
        ing.ingest(&mut reg, IngestPayload::Single(entry(json!(POINT_FC), None)));
        ing.ingest(&mut reg, IngestPayload::Single(entry(json!(POINT_FC), None)));
        assert_eq!(reg.most_recent().map(|l| l.name()), Some("Point Result 2"));
    }

    #[test]
    fn malformed_entries_keep_their_slot() {
        let mut reg = LayerRegistry::new();
        let ing = CommandResultIngestor::new("#FF4500");
        let out = ing.ingest(
            &mut reg,
            IngestPayload::Batch(vec![
                json!("garbage"),
                json!({"geojson": POINT_FC, "name": ["not", "text"]}),
                json!({"geojson": POINT_FC, "name": "Kept"}),
            ]),
        );
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0].error, Some(IngestError::Malformed(_))));
        assert!(matches!(out[1].error, Some(IngestError::Malformed(_))));
        assert!(out[2].layer.is_some());
        assert_eq!(reg.iter().map(|l| l.name()).collect::<Vec<_>>(), vec!["Kept"]);
    }
}
