pub mod history;
pub mod status;

pub use history::*;
pub use status::*;
