//! Shapefile bundle validation.
//!
//! A shapefile is split across sibling files that share a base name. Before an
//! upload is allowed the selected files are classified by extension: files
//! with an unrecognized extension are dropped from the working set, and the
//! required extensions that are still absent are reported.
//!
//! Validation is a pure function of its input. Every new selection is
//! re-validated from scratch; nothing is carried over from a previous call.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapefileExtension {
    Shp,
    Shx,
    Dbf,
    Prj,
}

impl ShapefileExtension {
    pub const ALL: [ShapefileExtension; 4] = [Self::Shp, Self::Shx, Self::Dbf, Self::Prj];

    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "shp" => Some(Self::Shp),
            "shx" => Some(Self::Shx),
            "dbf" => Some(Self::Dbf),
            "prj" => Some(Self::Prj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shp => "shp",
            Self::Shx => "shx",
            Self::Dbf => "dbf",
            Self::Prj => "prj",
        }
    }

    /// Display form used in the "Missing: ..." hint.
    pub fn dotted(&self) -> &'static str {
        match self {
            Self::Shp => ".shp",
            Self::Shx => ".shx",
            Self::Dbf => ".dbf",
            Self::Prj => ".prj",
        }
    }
}

/// Extensions a bundle must contain before it may be submitted.
///
/// Fixed policy: geometry, index, attributes and projection. The backend
/// reprojects to WGS84 and cannot do so without the `.prj`.
pub const REQUIRED_EXTENSIONS: [ShapefileExtension; 4] = ShapefileExtension::ALL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size_bytes: u64,
    #[serde(skip)]
    pub location: Option<PathBuf>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            location: None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid file name: {}", path.display()),
                )
            })?
            .to_string();
        Ok(Self {
            name,
            size_bytes: meta.len(),
            location: Some(path.to_path_buf()),
        })
    }

    pub fn extension(&self) -> Option<ShapefileExtension> {
        ShapefileExtension::from_file_name(&self.name)
    }
}

/// The retained working set, keyed by extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBundle {
    pub has_shp: bool,
    pub has_shx: bool,
    pub has_dbf: bool,
    pub has_prj: bool,
}

impl FileBundle {
    pub fn has(&self, ext: ShapefileExtension) -> bool {
        match ext {
            ShapefileExtension::Shp => self.has_shp,
            ShapefileExtension::Shx => self.has_shx,
            ShapefileExtension::Dbf => self.has_dbf,
            ShapefileExtension::Prj => self.has_prj,
        }
    }

    fn mark(&mut self, ext: ShapefileExtension) {
        match ext {
            ShapefileExtension::Shp => self.has_shp = true,
            ShapefileExtension::Shx => self.has_shx = true,
            ShapefileExtension::Dbf => self.has_dbf = true,
            ShapefileExtension::Prj => self.has_prj = true,
        }
    }

    pub fn is_complete(&self) -> bool {
        REQUIRED_EXTENSIONS.iter().all(|ext| self.has(*ext))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleValidation {
    /// Recognized files, in selection order.
    pub accepted: Vec<FileDescriptor>,
    pub bundle: FileBundle,
    pub missing: BTreeSet<ShapefileExtension>,
}

impl BundleValidation {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn missing_display(&self) -> Vec<&'static str> {
        self.missing.iter().map(|ext| ext.dotted()).collect()
    }
}

pub fn validate<'a, I>(files: I) -> BundleValidation
where
    I: IntoIterator<Item = &'a FileDescriptor>,
{
    let mut out = BundleValidation::default();
    for file in files {
        let Some(ext) = file.extension() else {
            continue;
        };
        out.bundle.mark(ext);
        out.accepted.push(file.clone());
    }
    out.missing = REQUIRED_EXTENSIONS
        .iter()
        .copied()
        .filter(|ext| !out.bundle.has(*ext))
        .collect();
    out
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1_048_576 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    }
}
