//! Source descriptors
//!
//! A `SourceDescriptor` says where the bytes of one WAV clip live. It is
//! immutable and cheap to clone; the engine only ever borrows it to build a
//! `Backend` for the duration of one validation or one playback.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a clip's WAV bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// WAV image linked into the program (e.g. via `include_bytes!`)
    ///
    /// The region is never owned or freed by the player.
    Embedded(&'static [u8]),

    /// WAV file on a mounted filesystem (SPIFFS, SD/MMC, or a host path)
    FilePath(PathBuf),
}

impl SourceDescriptor {
    /// Describe a WAV image that lives for the whole program
    pub fn embedded(data: &'static [u8]) -> Self {
        SourceDescriptor::Embedded(data)
    }

    /// Describe a WAV file by path
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceDescriptor::FilePath(path.into())
    }

    /// Describe a file relative to a filesystem mount point
    ///
    /// ```
    /// use wavplay_ap::audio::SourceDescriptor;
    ///
    /// let src = SourceDescriptor::mounted("/sdcard", "sounds/chime.wav");
    /// assert_eq!(src, SourceDescriptor::file("/sdcard/sounds/chime.wav"));
    /// ```
    pub fn mounted(mount_point: impl AsRef<Path>, relative: impl AsRef<Path>) -> Self {
        SourceDescriptor::FilePath(mount_point.as_ref().join(relative))
    }

    /// Path of a filesystem source
    pub fn path(&self) -> Option<&Path> {
        match self {
            SourceDescriptor::FilePath(path) => Some(path),
            SourceDescriptor::Embedded(_) => None,
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::Embedded(data) => {
                write!(f, "embedded:{:p} ({} bytes)", data.as_ptr(), data.len())
            }
            SourceDescriptor::FilePath(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CLIP: [u8; 4] = *b"RIFF";

    #[test]
    fn test_display() {
        let file = SourceDescriptor::file("/spiffs/beep.wav");
        assert_eq!(file.to_string(), "/spiffs/beep.wav");

        let embedded = SourceDescriptor::embedded(&CLIP);
        let shown = embedded.to_string();
        assert!(shown.starts_with("embedded:"));
        assert!(shown.ends_with("(4 bytes)"));
    }

    #[test]
    fn test_path_accessor() {
        assert!(SourceDescriptor::embedded(&CLIP).path().is_none());
        assert_eq!(
            SourceDescriptor::mounted("/spiffs", "a.wav").path(),
            Some(Path::new("/spiffs/a.wav"))
        );
    }
}
