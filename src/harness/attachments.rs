use crate::models::{AppSettings, IncomingFile};

/// Checks one attachment against the configured size cap and extension
/// allowlist. Returns one message per violation; an empty vec means the
/// file may be uploaded.
pub fn validate_attachment(file: &IncomingFile, settings: &AppSettings) -> Vec<String> {
    let mut errors = Vec::new();

    if file.size > settings.max_upload_bytes() {
        errors.push(format!(
            "{}: File size ({:.1}MB) exceeds {}MB limit",
            file.name,
            file.size as f64 / 1024.0 / 1024.0,
            settings.max_upload_mb
        ));
    }

    let allowed = file_extension(&file.name)
        .map(|extension| {
            settings
                .allowed_file_types
                .iter()
                .any(|candidate| candidate == &extension)
        })
        .unwrap_or(false);
    if !allowed {
        errors.push(format!(
            "{}: File type not supported. Please use PDF, DOCX, TXT, or image files",
            file.name
        ));
    }

    errors
}

pub fn file_extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, extension)| extension.to_lowercase())
        .filter(|extension| !extension.is_empty())
}

/// File name without its final extension; the default document title.
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}
