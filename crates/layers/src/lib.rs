pub mod basemap;
pub mod layer;
pub mod registry;
pub mod symbology;

pub use basemap::*;
pub use layer::*;
pub use registry::*;
