use formats::FeatureCollection;
use foundation::ids::LayerId;
use serde::{Deserialize, Serialize};

use crate::symbology::LayerStyle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Upload,
    CommandResult,
}

/// One overlay on the map.
///
/// Fields are read-only outside this crate; visibility and style change only
/// through [`crate::registry::LayerRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) name: String,
    pub(crate) color: String,
    pub(crate) style: LayerStyle,
    pub(crate) geometry: FeatureCollection,
    pub(crate) visible: bool,
    pub(crate) provenance: Provenance,
}

impl Layer {
    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn style(&self) -> &LayerStyle {
        &self.style
    }

    pub fn geometry(&self) -> &FeatureCollection {
        &self.geometry
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Geometry type label of the first feature, `"Unknown"` for empty layers.
    pub fn primary_geometry_type(&self) -> &'static str {
        self.geometry
            .first_geometry_type()
            .map(|t| t.as_str())
            .unwrap_or("Unknown")
    }

    pub fn summary(&self) -> LayerSummary {
        LayerSummary {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            visible: self.visible,
            provenance: self.provenance,
            geometry_type: self.primary_geometry_type().to_string(),
            feature_count: self.geometry.len(),
            style: self.style.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    pub id: LayerId,
    pub name: String,
    pub color: String,
    pub visible: bool,
    pub provenance: Provenance,
    pub geometry_type: String,
    pub feature_count: usize,
    pub style: LayerStyle,
}
