use std::collections::HashSet;

use foundation::bounds::Aabb2;
use foundation::ids::FeatureId;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(Self::Point),
            "MultiPoint" => Some(Self::MultiPoint),
            "LineString" => Some(Self::LineString),
            "MultiLineString" => Some(Self::MultiLineString),
            "Polygon" => Some(Self::Polygon),
            "MultiPolygon" => Some(Self::MultiPolygon),
            "GeometryCollection" => Some(Self::GeometryCollection),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
        }
    }
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

/// Decoded coordinates of a geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
    Collection(Vec<Geometry>),
}

/// A feature geometry.
///
/// The type is always known. Coordinates are optional: results from the
/// command service sometimes carry a bare `{"type": "Point"}`, which still
/// renders as a layer but contributes nothing to bounds. `raw` is the object as
/// received and is what gets handed back to the rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub kind: GeometryType,
    pub shape: Option<Shape>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoJsonError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(msg) => write!(f, "JSON parse error: {msg}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| GeoJsonError::Json(e.to_string()))?;
        Self::from_geojson_value(value)
    }

    /// Accepts either a structured document or a JSON string holding one.
    ///
    /// Both the upload backend and the command service deliver collections in
    /// either form.
    pub fn from_json_or_text(value: Value) -> Result<Self, GeoJsonError> {
        match value {
            Value::String(text) => Self::from_geojson_str(&text),
            other => Self::from_geojson_value(other),
        }
    }

    pub fn from_geojson_value(value: Value) -> Result<Self, GeoJsonError> {
        let obj = value
            .as_object()
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        // A lone Feature is promoted to a collection of one.
        if ty == "Feature" {
            let mut ids = IdAssigner::default();
            let feature = parse_feature(0, &value, &mut ids)?;
            return Ok(Self {
                features: vec![feature],
            });
        }
        if ty != "FeatureCollection" {
            return Err(GeoJsonError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut ids = IdAssigner::default();
        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            features.push(parse_feature(index, feat_val, &mut ids)?);
        }

        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| &f.id == id)
    }

    /// Geometry type of the first feature, used for naming and layer summaries.
    pub fn first_geometry_type(&self) -> Option<GeometryType> {
        self.features
            .first()
            .and_then(|f| f.geometry.as_ref())
            .map(|g| g.kind)
    }

    /// Lon/lat extent over every decoded coordinate, if there is any.
    pub fn bounds(&self) -> Option<Aabb2> {
        let mut out: Option<Aabb2> = None;
        for feature in &self.features {
            if let Some(shape) = feature.geometry.as_ref().and_then(|g| g.shape.as_ref()) {
                extend_bounds(shape, &mut out);
            }
        }
        out.filter(Aabb2::is_valid)
    }
}

fn parse_feature(
    index: usize,
    feat_val: &Value,
    ids: &mut IdAssigner,
) -> Result<Feature, GeoJsonError> {
    let feat_obj = feat_val
        .as_object()
        .ok_or_else(|| GeoJsonError::InvalidFeature {
            index,
            reason: "feature must be an object".to_string(),
        })?;

    if let Some(feat_type) = feat_obj.get("type")
        && feat_type.as_str() != Some("Feature")
    {
        return Err(GeoJsonError::InvalidFeature {
            index,
            reason: format!("unexpected feature type: {feat_type}"),
        });
    }

    let properties = feat_obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    let explicit = id_text(feat_obj.get("id")).or_else(|| id_text(properties.get("id")));
    let id = ids.assign(index, explicit);

    let geometry = match feat_obj.get("geometry") {
        None | Some(Value::Null) => None,
        Some(geometry_val) => Some(
            parse_geometry(geometry_val)
                .map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?,
        ),
    };

    Ok(Feature {
        id,
        properties,
        geometry,
    })
}

fn id_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Hands out feature ids that are unique within one collection.
#[derive(Default)]
struct IdAssigner {
    taken: HashSet<String>,
}

impl IdAssigner {
    fn assign(&mut self, index: usize, explicit: Option<String>) -> FeatureId {
        let base = explicit.unwrap_or_else(|| format!("f{index}"));
        let mut candidate = base.clone();
        let mut bump = 0usize;
        while self.taken.contains(&candidate) {
            candidate = if bump == 0 {
                format!("{base}#{index}")
            } else {
                format!("{base}#{index}.{bump}")
            };
            bump += 1;
        }
        self.taken.insert(candidate.clone());
        FeatureId::new(candidate)
    }
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;
    let kind =
        GeometryType::parse(ty).ok_or_else(|| format!("unsupported geometry type: {ty}"))?;

    let shape = if kind == GeometryType::GeometryCollection {
        match obj.get("geometries") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let arr = v
                    .as_array()
                    .ok_or("GeometryCollection geometries must be an array".to_string())?;
                let mut members = Vec::with_capacity(arr.len());
                for member in arr {
                    members.push(parse_geometry(member)?);
                }
                Some(Shape::Collection(members))
            }
        }
    } else {
        match obj.get("coordinates") {
            None | Some(Value::Null) => None,
            Some(coords) => Some(parse_shape(kind, coords)?),
        }
    };

    Ok(Geometry {
        kind,
        shape,
        raw: value.clone(),
    })
}

fn parse_shape(kind: GeometryType, coords: &Value) -> Result<Shape, String> {
    match kind {
        GeometryType::Point => Ok(Shape::Point(parse_point(coords)?)),
        GeometryType::MultiPoint => Ok(Shape::MultiPoint(parse_points(coords)?)),
        GeometryType::LineString => Ok(Shape::LineString(parse_points(coords)?)),
        GeometryType::MultiLineString => Ok(Shape::MultiLineString(parse_rings(coords)?)),
        GeometryType::Polygon => Ok(Shape::Polygon(parse_rings(coords)?)),
        GeometryType::MultiPolygon => Ok(Shape::MultiPolygon(parse_multi_polygon(coords)?)),
        GeometryType::GeometryCollection => {
            Err("GeometryCollection has no coordinates".to_string())
        }
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("Point coordinates must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("Point coordinates must have [lon, lat]".to_string());
    }
    let lon = arr[0]
        .as_f64()
        .ok_or("Point lon must be a number".to_string())?;
    let lat = arr[1]
        .as_f64()
        .ok_or("Point lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of point arrays".to_string())?;
    arr.iter().map(parse_points).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Vec<GeoPoint>>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_rings).collect()
}

fn extend_bounds(shape: &Shape, out: &mut Option<Aabb2>) {
    let mut push = |p: &GeoPoint| {
        let xy = [p.lon_deg, p.lat_deg];
        if !(xy[0].is_finite() && xy[1].is_finite()) {
            return;
        }
        *out = Some(match *out {
            Some(mut b) => {
                b.include(xy);
                b
            }
            None => Aabb2::from_point(xy),
        });
    };
    match shape {
        Shape::Point(p) => push(p),
        Shape::MultiPoint(ps) | Shape::LineString(ps) => ps.iter().for_each(push),
        Shape::MultiLineString(lines) | Shape::Polygon(lines) => {
            lines.iter().flatten().for_each(push)
        }
        Shape::MultiPolygon(polys) => polys.iter().flatten().flatten().for_each(push),
        Shape::Collection(members) => {
            for member in members {
                if let Some(s) = &member.shape {
                    extend_bounds(s, out);
                }
            }
        }
    }
}
