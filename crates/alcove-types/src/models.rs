use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broad media family of a stored file, used to pick a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Audio,
    Other,
}

impl FileKind {
    pub fn from_mime(mime: &str) -> Self {
        match mime.split('/').next().unwrap_or_default() {
            "image" => FileKind::Image,
            "video" => FileKind::Video,
            "audio" => FileKind::Audio,
            _ => FileKind::Other,
        }
    }
}

/// One uploaded file inside a room.
///
/// Nothing here is persisted besides the file itself: size and mtime come
/// from `stat`, the MIME type is inferred from the extension on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub mime: String,
}

impl FileMeta {
    pub fn new(name: String, size: u64, modified: DateTime<Utc>) -> Self {
        let mime = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            size,
            modified,
            mime,
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_mime(&self.mime)
    }

    pub fn size_label(&self) -> String {
        human_size(self.size)
    }
}

/// Byte count rendered for humans ("1.5 MB").
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_is_inferred_from_extension() {
        let meta = FileMeta::new("20260101T000000000-abcd1234.png".into(), 10, Utc::now());
        assert_eq!(meta.mime, "image/png");
        assert_eq!(meta.kind(), FileKind::Image);

        let meta = FileMeta::new("clip.webm".into(), 10, Utc::now());
        assert_eq!(meta.kind(), FileKind::Video);

        let meta = FileMeta::new("noext".into(), 10, Utc::now());
        assert_eq!(meta.mime, "application/octet-stream");
        assert_eq!(meta.kind(), FileKind::Other);
    }

    #[test]
    fn size_labels() {
        let at = Utc::now();
        assert_eq!(FileMeta::new("a".into(), 0, at).size_label(), "0 B");
        assert_eq!(FileMeta::new("a".into(), 1023, at).size_label(), "1023 B");
        assert_eq!(FileMeta::new("a".into(), 1024, at).size_label(), "1.0 KB");
        assert_eq!(FileMeta::new("a".into(), 1536 * 1024, at).size_label(), "1.5 MB");
    }
}
