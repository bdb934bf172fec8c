//! Media path classification
//!
//! Pure functions mapping a relative path and its extension to a coarse
//! media tag and, for uploads without an explicit folder, a default target
//! subfolder. The scanner and the upload handler both classify through this
//! module so that listings and stored files can never disagree about what
//! counts as media.
//!
//! # Examples
//!
//! ```rust
//! use dojo_gateway::media::classify::{self, MediaTag};
//!
//! assert_eq!(classify::classify("home/banner.jpg", ".jpg"), Some(MediaTag::Image));
//! assert_eq!(classify::classify("bacheca/avviso.png", ".png"), Some(MediaTag::Post));
//! assert_eq!(classify::default_folder(".mp3"), Some("audio"));
//! assert_eq!(classify::classify("notes.txt", ".txt"), None);
//! ```

use serde::{Deserialize, Serialize};

/// Audio file extensions (lower-case, including the dot)
pub const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".wav", ".m4a", ".ogg"];

/// Video file extensions (lower-case, including the dot)
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov", ".avi"];

/// Image file extensions (lower-case, including the dot)
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif", ".svg"];

/// Coarse media category derived from extension and path heuristics
///
/// Serializes as the upper-case tag used by the admin media browser
/// (`"IMAGE"`, `"AUDIO"`, `"VIDEO"`, `"POST"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaTag {
    /// Generic site image
    Image,
    /// Audio clip
    Audio,
    /// Video clip
    Video,
    /// Image attached to a blog post or notice board entry
    Post,
}

/// Classifies a relative path into a media tag
///
/// Returns `None` for unrecognized extensions: such files are not media and
/// are silently excluded from listings rather than treated as errors.
///
/// A directory segment named `audio` or `video` (case-insensitive) overrides
/// the extension-derived tag, so an image stored under `audio/covers/` is
/// tagged [`MediaTag::Audio`]. Images under a `post/` or `bacheca/` segment
/// are tagged [`MediaTag::Post`].
#[must_use]
pub fn classify(relative_path: &str, extension: &str) -> Option<MediaTag> {
    let by_extension = if AUDIO_EXTENSIONS.contains(&extension) {
        MediaTag::Audio
    } else if VIDEO_EXTENSIONS.contains(&extension) {
        MediaTag::Video
    } else if IMAGE_EXTENSIONS.contains(&extension) {
        MediaTag::Image
    } else {
        return None;
    };

    if has_directory_segment(relative_path, "audio") {
        return Some(MediaTag::Audio);
    }
    if has_directory_segment(relative_path, "video") {
        return Some(MediaTag::Video);
    }

    if by_extension == MediaTag::Image
        && (has_directory_segment(relative_path, "post")
            || has_directory_segment(relative_path, "bacheca"))
    {
        return Some(MediaTag::Post);
    }

    Some(by_extension)
}

/// Default upload subfolder for a recognized extension
///
/// Used by the upload handler when the caller supplies no folder hint.
/// Unrecognized extensions get no subfolder (the file lands at the
/// destination root directly).
#[must_use]
pub fn default_folder(extension: &str) -> Option<&'static str> {
    if AUDIO_EXTENSIONS.contains(&extension) {
        Some("audio")
    } else if VIDEO_EXTENSIONS.contains(&extension) {
        Some("video")
    } else if IMAGE_EXTENSIONS.contains(&extension) {
        Some("immagini")
    } else {
        None
    }
}

/// Extracts the lower-cased extension (including the dot) from a file name
///
/// Returns `None` for names without an extension.
#[must_use]
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Checks whether any directory segment of the path equals `segment`
///
/// Only directory components count: the trailing file name is never a
/// segment, so `audio.jpg` at the root is not under an `audio/` folder.
fn has_directory_segment(relative_path: &str, segment: &str) -> bool {
    let Some((directories, _file_name)) = relative_path.rsplit_once('/') else {
        return false;
    };
    directories
        .split('/')
        .any(|part| part.eq_ignore_ascii_case(segment))
}
