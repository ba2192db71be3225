use formats::FeatureCollection;
use foundation::ids::{IdAllocator, LayerId};

use crate::layer::{Layer, Provenance};
use crate::symbology::{LayerStyle, StylePatch};

/// Arguments for [`LayerRegistry::create`].
#[derive(Debug, Clone)]
pub struct NewLayer {
    pub geometry: FeatureCollection,
    /// `None` yields the positional default `Layer N`.
    pub name: Option<String>,
    pub color: String,
    pub style: LayerStyle,
    pub provenance: Provenance,
}

/// Ordered set of overlays for one session.
///
/// Ordering contract:
/// - Iteration yields layers in creation order.
/// - The last layer is the "most recent" one; viewport fitting follows it.
///
/// Layers are never removed, so ids are unique for the session lifetime.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    ids: IdAllocator,
    layers: Vec<Layer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, new: NewLayer) -> &Layer {
        let id = self.ids.next_layer_id();
        let name = new
            .name
            .unwrap_or_else(|| format!("Layer {}", self.layers.len() + 1));
        let idx = self.layers.len();
        self.layers.push(Layer {
            id,
            name,
            color: new.color,
            style: new.style,
            geometry: new.geometry,
            visible: true,
            provenance: new.provenance,
        });
        &self.layers[idx]
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn most_recent(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// Returns `false` if `id` is unknown, in which case nothing changes.
    pub fn set_visibility(&mut self, id: LayerId, visible: bool) -> bool {
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        layer.visible = visible;
        true
    }

    /// Shallow-merges `patch` into the layer's style (and color).
    ///
    /// No range checks happen here; see [`StylePatch::validated`].
    /// Returns `false` if `id` is unknown.
    pub fn set_style(&mut self, id: LayerId, patch: &StylePatch) -> bool {
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        patch.apply_to(&mut layer.style);
        if let Some(color) = &patch.color {
            layer.color = color.clone();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbology::DashPattern;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn new_layer(name: Option<&str>) -> NewLayer {
        NewLayer {
            geometry: FeatureCollection::default(),
            name: name.map(str::to_string),
            color: "#3388ff".to_string(),
            style: LayerStyle::default(),
            provenance: Provenance::Upload,
        }
    }

    #[test]
    fn ids_are_pairwise_distinct() {
        let mut reg = LayerRegistry::new();
        let ids: Vec<LayerId> = (0..50).map(|_| reg.create(new_layer(None)).id()).collect();
        let unique: HashSet<LayerId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn default_names_follow_insertion_order() {
        let mut reg = LayerRegistry::new();
        reg.create(new_layer(None));
        reg.create(new_layer(Some("roads")));
        reg.create(new_layer(None));
        let names: Vec<&str> = reg.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["Layer 1", "roads", "Layer 3"]);
        assert_eq!(reg.most_recent().map(|l| l.name()), Some("Layer 3"));
    }

    #[test]
    fn new_layers_are_visible() {
        let mut reg = LayerRegistry::new();
        let id = reg.create(new_layer(None)).id();
        assert!(reg.get(id).is_some_and(|l| l.visible()));
        assert!(reg.set_visibility(id, false));
        assert!(reg.get(id).is_some_and(|l| !l.visible()));
    }

    #[test]
    fn unknown_ids_are_noops() {
        let mut reg = LayerRegistry::new();
        reg.create(new_layer(None));
        assert!(!reg.set_visibility(LayerId::new(999), false));
        assert!(!reg.set_style(LayerId::new(999), &StylePatch::default()));
        assert!(reg.iter().all(|l| l.visible()));
    }

    #[test]
    fn set_style_merges_only_given_fields() {
        let mut reg = LayerRegistry::new();
        let id = reg.create(new_layer(None)).id();
        let patch = StylePatch {
            weight: Some(7.0),
            dash_pattern: Some(DashPattern::Dashed),
            ..StylePatch::default()
        };
        assert!(reg.set_style(id, &patch));

        let layer = reg.get(id).expect("layer");
        assert_eq!(
            layer.style(),
            &LayerStyle {
                weight: 7.0,
                dash_pattern: DashPattern::Dashed,
                ..LayerStyle::default()
            }
        );
        assert_eq!(layer.color(), "#3388ff");

        let recolor = StylePatch {
            color: Some("#a833ff".to_string()),
            ..StylePatch::default()
        };
        reg.set_style(id, &recolor);
        let layer = reg.get(id).expect("layer");
        assert_eq!(layer.color(), "#a833ff");
        assert_eq!(layer.style().weight, 7.0);
    }

    #[test]
    fn registry_accepts_out_of_range_values() {
        let mut reg = LayerRegistry::new();
        let id = reg.create(new_layer(None)).id();
        reg.set_style(
            id,
            &StylePatch {
                weight: Some(42.0),
                ..StylePatch::default()
            },
        );
        assert_eq!(reg.get(id).map(|l| l.style().weight), Some(42.0));
    }
}
