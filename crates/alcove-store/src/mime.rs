/// Extension for a declared upload MIME type, when we recognise it.
///
/// Parameters (`; charset=...`) are ignored. Common types map to their
/// usual extension; anything else takes the first one `mime_guess` knows.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    preferred_extension(&essence).or_else(|| guessed_extension(&essence))
}

fn preferred_extension(essence: &str) -> Option<&'static str> {
    let ext = match essence {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/bmp" => "bmp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/ogg" => "ogg",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        "application/json" => "json",
        "application/zip" => "zip",
        _ => return None,
    };
    Some(ext)
}

fn guessed_extension(essence: &str) -> Option<&'static str> {
    if essence == "application/octet-stream" {
        return None;
    }
    mime_guess::get_mime_extensions_str(essence)?
        .iter()
        .copied()
        .find(|ext| ext.len() <= 10 && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
}

/// Extension of a client-supplied filename, if it is short and alphanumeric.
pub fn extension_from_filename(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 10 {
        return None;
    }
    if !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME table first, then the declared filename, then `bin`.
pub fn pick_extension(declared_mime: Option<&str>, declared_filename: Option<&str>) -> String {
    declared_mime
        .and_then(extension_for_mime)
        .map(str::to_string)
        .or_else(|| declared_filename.and_then(extension_from_filename))
        .unwrap_or_else(|| "bin".to_string())
}
