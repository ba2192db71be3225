use foundation::ids::{FeatureId, LayerId};
use layers::LayerRegistry;
use serde::Deserialize;
use serde_json::{Map, Value};

/// What the rendering surface reports under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureHit {
    pub layer_id: LayerId,
    pub feature_id: FeatureId,
}

impl FeatureHit {
    pub fn new(layer_id: LayerId, feature_id: impl Into<String>) -> Self {
        Self {
            layer_id,
            feature_id: FeatureId::new(feature_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    Feature {
        layer_id: LayerId,
        feature_id: FeatureId,
        properties: Map<String, Value>,
    },
    Background,
}

/// Classifies a map click against the registry.
///
/// Ordering contract:
/// - A hit only counts as a feature click if its layer exists, is visible, and
///   still holds a feature with that id.
/// - Everything else, including no hit at all, is a background click.
///
/// The feature click consumes the interaction: callers must not also run the
/// background handler for it.
pub fn classify_click(registry: &LayerRegistry, hit: Option<&FeatureHit>) -> ClickTarget {
    let Some(hit) = hit else {
        return ClickTarget::Background;
    };
    let Some(layer) = registry.get(hit.layer_id) else {
        return ClickTarget::Background;
    };
    if !layer.visible() {
        return ClickTarget::Background;
    }
    match layer.geometry().feature(&hit.feature_id) {
        Some(feature) => ClickTarget::Feature {
            layer_id: hit.layer_id,
            feature_id: feature.id.clone(),
            properties: feature.properties.clone(),
        },
        None => ClickTarget::Background,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formats::FeatureCollection;
    use layers::{NewLayer, Provenance};
    use layers::symbology::LayerStyle;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry_with_point() -> (LayerRegistry, LayerId) {
        let fc = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","id":"x","properties":{"name":"Alpha"},
                 "geometry":{"type":"Point","coordinates":[1.0,2.0]}}]}"#,
        )
        .expect("fixture");
        let mut reg = LayerRegistry::new();
        let id = reg
            .create(NewLayer {
                geometry: fc,
                name: None,
                color: "#3388ff".to_string(),
                style: LayerStyle::default(),
                provenance: Provenance::Upload,
            })
            .id();
        (reg, id)
    }

    #[test]
    fn visible_known_feature_is_a_feature_click() {
        let (reg, id) = registry_with_point();
        let hit = FeatureHit::new(id, "x");
        match classify_click(&reg, Some(&hit)) {
            ClickTarget::Feature {
                layer_id,
                feature_id,
                properties,
            } => {
                assert_eq!(layer_id, id);
                assert_eq!(feature_id.as_str(), "x");
                assert_eq!(properties.get("name"), Some(&json!("Alpha")));
            }
            other => panic!("expected feature click, got {other:?}"),
        }
    }

    #[test]
    fn no_hit_is_background() {
        let (reg, _) = registry_with_point();
        assert_eq!(classify_click(&reg, None), ClickTarget::Background);
    }

    #[test]
    fn hidden_layer_is_background() {
        let (mut reg, id) = registry_with_point();
        reg.set_visibility(id, false);
        let hit = FeatureHit::new(id, "x");
        assert_eq!(classify_click(&reg, Some(&hit)), ClickTarget::Background);
    }

    #[test]
    fn unknown_layer_or_feature_is_background() {
        let (reg, id) = registry_with_point();
        let stray_layer = FeatureHit::new(LayerId::new(99), "x");
        let stray_feature = FeatureHit::new(id, "nope");
        assert_eq!(classify_click(&reg, Some(&stray_layer)), ClickTarget::Background);
        assert_eq!(classify_click(&reg, Some(&stray_feature)), ClickTarget::Background);
    }
}
