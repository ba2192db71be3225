use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Background reference map beneath the overlays.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basemap {
    #[default]
    Osm,
    Satellite,
    Topo,
}

impl Basemap {
    pub const ALL: [Basemap; 3] = [Basemap::Osm, Basemap::Satellite, Basemap::Topo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Basemap::Osm => "osm",
            Basemap::Satellite => "satellite",
            Basemap::Topo => "topo",
        }
    }

    pub fn tile_url(&self) -> &'static str {
        match self {
            Basemap::Osm => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            Basemap::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
            Basemap::Topo => "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            Basemap::Osm => "© OpenStreetMap contributors",
            Basemap::Satellite => "Tiles © Esri, i-cubed, USDA, USGS, AEX, GeoEye, Getmapping, Aerogrid, IGN, IGP, UPR-EGP, and the GIS User Community",
            Basemap::Topo => "Map data: © OpenStreetMap contributors, SRTM | Map style: © OpenTopoMap (CC-BY-SA)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBasemap(pub String);

impl std::fmt::Display for UnknownBasemap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown basemap {:?} (expected osm, satellite or topo)", self.0)
    }
}

impl std::error::Error for UnknownBasemap {}

impl FromStr for Basemap {
    type Err = UnknownBasemap;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Basemap::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownBasemap(s.to_string()))
    }
}
