use foundation::ids::LayerId;
use formats::ShapefileExtension;
use layers::symbology::StyleRangeError;

/// The two request channels; each admits one request at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Upload,
    Command,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Upload => f.write_str("upload"),
            Channel::Command => f.write_str("command"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The selected files do not form a complete bundle.
    Validation { missing: Vec<ShapefileExtension> },
    ChannelBusy(Channel),
    EmptyCommand,
    UnknownLayer(LayerId),
    Style(StyleRangeError),
    ColorNotOffered(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Validation { missing } => {
                let names: Vec<&str> = missing.iter().map(|e| e.dotted()).collect();
                write!(f, "Missing: {}", names.join(", "))
            }
            SessionError::ChannelBusy(channel) => {
                write!(f, "a {channel} request is already in flight")
            }
            SessionError::EmptyCommand => write!(f, "command is empty"),
            SessionError::UnknownLayer(id) => write!(f, "unknown layer {id}"),
            SessionError::Style(err) => write!(f, "{err}"),
            SessionError::ColorNotOffered(color) => {
                write!(f, "color {color} is not offered by the upload picker")
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StyleRangeError> for SessionError {
    fn from(err: StyleRangeError) -> Self {
        SessionError::Style(err)
    }
}
