use std::time::Duration;

use layers::symbology::{DEFAULT_COMMAND_COLOR, DEFAULT_UPLOAD_COLOR};
use runtime::DEFAULT_STATUS_DELAY;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// How long non-loading status messages stay visible.
    pub status_delay: Duration,
    /// Initial color of the upload picker.
    pub upload_color: String,
    /// Color given to every layer created from a command result.
    pub command_color: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_delay: DEFAULT_STATUS_DELAY,
            upload_color: DEFAULT_UPLOAD_COLOR.to_string(),
            command_color: DEFAULT_COMMAND_COLOR.to_string(),
        }
    }
}
