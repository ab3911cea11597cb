pub mod health;
pub mod stream;
pub mod upload;
pub mod videos;

/// Video container formats accepted for upload, keyed by file extension.
const VIDEO_CONTENT_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("3gp", "video/3gpp"),
];

/// Content type for a filename, or `None` when the extension is not an
/// accepted video format.
pub fn content_type_for(filename: &str) -> Option<&'static str> {
    let extension = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    VIDEO_CONTENT_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(content_type_for("clip.mp4"), Some("video/mp4"));
        assert_eq!(content_type_for("CLIP.MOV"), Some("video/quicktime"));
        assert_eq!(content_type_for("a.b.webm"), Some("video/webm"));
    }

    #[test]
    fn unknown_or_missing_extensions_rejected() {
        assert_eq!(content_type_for("malware.exe"), None);
        assert_eq!(content_type_for("noextension"), None);
        assert_eq!(content_type_for("archive.tar.gz"), None);
    }
}
