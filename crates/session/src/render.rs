use foundation::bounds::Aabb2;
use foundation::ids::{FeatureId, LayerId};
use formats::GeometryType;
use layers::symbology::{self, MarkerStyle, RenderStyle};
use layers::{Layer, LayerRegistry};
use scene::SelectionController;
use serde::Serialize;
use serde_json::Value;

/// Everything needed to draw one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRender {
    pub feature_id: FeatureId,
    pub geometry: Value,
    pub style: RenderStyle,
    /// Set for point geometries, which are drawn as circle markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRender {
    pub layer_id: LayerId,
    pub name: String,
    pub features: Vec<FeatureRender>,
}

/// Request to frame the map on a newly added layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportFit {
    pub layer_id: LayerId,
    pub bounds: Aabb2,
}

/// Builds the draw list for every visible layer, in insertion order.
///
/// Styles are resolved from scratch against the current selection on every
/// call; hidden layers contribute nothing.
pub fn plan(registry: &LayerRegistry, selection: &SelectionController) -> Vec<LayerRender> {
    registry
        .iter()
        .filter(|l| l.visible())
        .map(|l| plan_layer(l, selection))
        .collect()
}

fn plan_layer(layer: &Layer, selection: &SelectionController) -> LayerRender {
    let features = layer
        .geometry()
        .features
        .iter()
        .map(|f| {
            let active = selection.is_active(layer.id(), &f.id);
            let is_point = f
                .geometry
                .as_ref()
                .is_some_and(|g| matches!(g.kind, GeometryType::Point | GeometryType::MultiPoint));
            FeatureRender {
                feature_id: f.id.clone(),
                geometry: f.geometry.as_ref().map(|g| g.raw.clone()).unwrap_or(Value::Null),
                style: symbology::resolve(layer.style(), layer.color(), active),
                marker: is_point
                    .then(|| symbology::marker_style(layer.style(), layer.color(), active)),
            }
        })
        .collect();
    LayerRender {
        layer_id: layer.id(),
        name: layer.name().to_string(),
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formats::FeatureCollection;
    use layers::symbology::{HIGHLIGHT_COLOR, HIGHLIGHT_WEIGHT, LayerStyle};
    use layers::{NewLayer, Provenance};
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    fn add(reg: &mut LayerRegistry, geojson: &str) -> LayerId {
        reg.create(NewLayer {
            geometry: FeatureCollection::from_geojson_str(geojson).expect("fixture"),
            name: None,
            color: "#3388ff".to_string(),
            style: LayerStyle::default(),
            provenance: Provenance::Upload,
        })
        .id()
    }

    const LINES: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}},
        {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[2,2],[3,3]]}}]}"#;
    const POINTS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[5,5]}}]}"#;

    #[test]
    fn only_the_active_feature_is_highlighted() {
        let mut reg = LayerRegistry::new();
        let id = add(&mut reg, LINES);
        let mut sel = SelectionController::new();
        sel.feature_click(id, FeatureId::new("f1"), Map::new());

        let plan = plan(&reg, &sel);
        let styles: Vec<(String, f64)> = plan[0]
            .features
            .iter()
            .map(|f| (f.style.color.clone(), f.style.weight))
            .collect();
        assert_eq!(
            styles,
            vec![
                ("#3388ff".to_string(), 2.0),
                (HIGHLIGHT_COLOR.to_string(), HIGHLIGHT_WEIGHT),
            ]
        );
    }

    #[test]
    fn hidden_layers_are_skipped() {
        let mut reg = LayerRegistry::new();
        let a = add(&mut reg, LINES);
        let b = add(&mut reg, POINTS);
        reg.set_visibility(a, false);
        let plan = plan(&reg, &SelectionController::new());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].layer_id, b);
    }

    #[test]
    fn points_get_markers() {
        let mut reg = LayerRegistry::new();
        add(&mut reg, POINTS);
        add(&mut reg, LINES);
        let plan = plan(&reg, &SelectionController::new());
        assert!(plan[0].features[0].marker.is_some());
        assert!(plan[1].features.iter().all(|f| f.marker.is_none()));
    }

    #[test]
    fn feature_ids_are_stable_across_plans() {
        let mut reg = LayerRegistry::new();
        add(&mut reg, LINES);
        let sel = SelectionController::new();
        let ids = |p: &Vec<LayerRender>| -> Vec<FeatureId> {
            p[0].features.iter().map(|f| f.feature_id.clone()).collect()
        };
        assert_eq!(ids(&plan(&reg, &sel)), ids(&plan(&reg, &sel)));
    }
}
