pub mod bundle;
pub mod geojson;

pub use bundle::*;
pub use geojson::*;
