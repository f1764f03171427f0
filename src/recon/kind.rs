use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    BrowserLog,
    FacePhoto,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::BrowserLog, ArtifactKind::FacePhoto];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BrowserLog => "browser_log",
            Self::FacePhoto => "face_photo",
        }
    }

    /// Directory name used under the archive root.
    pub fn archive_dir(self) -> &'static str {
        match self {
            Self::BrowserLog => "browser_logs",
            Self::FacePhoto => "face_photos",
        }
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            Self::BrowserLog => "json",
            Self::FacePhoto => "jpg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::BrowserLog => "browser inventory",
            Self::FacePhoto => "face photo",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
