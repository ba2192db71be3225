use foundation::ids::{FeatureId, LayerId};
use serde::Serialize;
use serde_json::{Map, Value};

/// One feature within one layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRef {
    pub layer_id: LayerId,
    pub feature_id: FeatureId,
}

impl FeatureRef {
    pub fn new(layer_id: LayerId, feature_id: FeatureId) -> Self {
        Self {
            layer_id,
            feature_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected {
        active: FeatureRef,
        properties: Map<String, Value>,
    },
}

/// Owner of the single, map-wide active feature.
///
/// State machine:
/// - `Idle` --feature click--> `Selected`
/// - `Selected` --feature click--> `Selected` (replaced unconditionally)
/// - any --background click / owning layer hidden / info closed--> `Idle`
///
/// There is only ever one `FeatureRef` stored, so two features can never be
/// active at the same time, whatever the number of layers.
#[derive(Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn active(&self) -> Option<&FeatureRef> {
        match &self.state {
            SelectionState::Idle => None,
            SelectionState::Selected { active, .. } => Some(active),
        }
    }

    /// Attribute snapshot taken when the active feature was clicked.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        match &self.state {
            SelectionState::Idle => None,
            SelectionState::Selected { properties, .. } => Some(properties),
        }
    }

    pub fn is_active(&self, layer_id: LayerId, feature_id: &FeatureId) -> bool {
        self.active()
            .is_some_and(|a| a.layer_id == layer_id && &a.feature_id == feature_id)
    }

    pub fn feature_click(
        &mut self,
        layer_id: LayerId,
        feature_id: FeatureId,
        properties: Map<String, Value>,
    ) {
        self.state = SelectionState::Selected {
            active: FeatureRef::new(layer_id, feature_id),
            properties,
        };
    }

    pub fn background_click(&mut self) {
        self.state = SelectionState::Idle;
    }

    /// Closing the attribute panel drops the selection as well.
    pub fn clear(&mut self) {
        self.state = SelectionState::Idle;
    }

    /// Drops the selection if it belongs to `layer_id`, which is about to stop
    /// being drawn. Returns `true` if a selection was cleared.
    pub fn layer_hidden(&mut self, layer_id: LayerId) -> bool {
        if self.active().is_some_and(|a| a.layer_id == layer_id) {
            self.state = SelectionState::Idle;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    fn fid(s: &str) -> FeatureId {
        FeatureId::new(s)
    }

    #[test]
    fn starts_idle() {
        let sel = SelectionController::new();
        assert_eq!(sel.state(), &SelectionState::Idle);
        assert!(sel.properties().is_none());
    }

    #[test]
    fn click_selects_and_snapshots_properties() {
        let mut sel = SelectionController::new();
        let l1 = LayerId::new(1);
        sel.feature_click(l1, fid("x"), props(json!({"name": "Alpha"})));
        assert!(sel.is_active(l1, &fid("x")));
        assert_eq!(
            sel.properties().and_then(|p| p.get("name")),
            Some(&json!("Alpha"))
        );
    }

    #[test]
    fn selecting_across_layers_keeps_exactly_one_active() {
        let mut sel = SelectionController::new();
        let (l1, l2) = (LayerId::new(1), LayerId::new(2));
        sel.feature_click(l1, fid("x"), Map::new());
        sel.feature_click(l2, fid("y"), Map::new());
        assert!(!sel.is_active(l1, &fid("x")));
        assert!(sel.is_active(l2, &fid("y")));
    }

    #[test]
    fn same_feature_id_in_other_layer_is_not_active() {
        let mut sel = SelectionController::new();
        sel.feature_click(LayerId::new(1), fid("f0"), Map::new());
        assert!(!sel.is_active(LayerId::new(2), &fid("f0")));
    }

    #[test]
    fn background_click_clears() {
        let mut sel = SelectionController::new();
        sel.feature_click(LayerId::new(1), fid("x"), Map::new());
        sel.background_click();
        assert!(sel.active().is_none());
        sel.background_click();
        assert_eq!(sel.state(), &SelectionState::Idle);
    }

    #[test]
    fn hiding_owning_layer_clears_only_that_selection() {
        let mut sel = SelectionController::new();
        sel.feature_click(LayerId::new(1), fid("x"), Map::new());
        assert!(!sel.layer_hidden(LayerId::new(2)));
        assert!(sel.is_active(LayerId::new(1), &fid("x")));
        assert!(sel.layer_hidden(LayerId::new(1)));
        assert!(sel.active().is_none());
    }
}
