use std::path::Path;

/// Best-effort content type detection.
///
/// Probes never fail: an unknown or unreadable file yields `None`.
pub trait ContentTypeProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Option<String>;
}

impl<F> ContentTypeProbe for F
where
    F: Fn(&Path) -> Option<String> + Send + Sync,
{
    fn probe(&self, path: &Path) -> Option<String> {
        self(path)
    }
}

/// Maps well-known file extensions to MIME types.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionProbe;

impl ContentTypeProbe for ExtensionProbe {
    fn probe(&self, path: &Path) -> Option<String> {
        detect_content_type(path).map(str::to_string)
    }
}

fn detect_content_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("html" | "htm") => Some("text/html"),
        Some("txt" | "log") => Some("text/plain"),
        Some("csv") => Some("text/csv"),
        Some("css") => Some("text/css"),
        Some("js") => Some("text/javascript"),
        Some("json") => Some("application/json"),
        Some("xml") => Some("application/xml"),
        Some("pdf") => Some("application/pdf"),
        Some("zip") => Some("application/zip"),
        Some("gz" | "tgz") => Some("application/gzip"),
        Some("tar") => Some("application/x-tar"),
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("svg") => Some("image/svg+xml"),
        Some("ico") => Some("image/x-icon"),
        Some("mp3") => Some("audio/mpeg"),
        Some("wav") => Some("audio/wav"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        Some("mkv") => Some("video/x-matroska"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        let probe = ExtensionProbe;
        assert_eq!(probe.probe(Path::new("index.html")).as_deref(), Some("text/html"));
        assert_eq!(probe.probe(Path::new("photo.jpeg")).as_deref(), Some("image/jpeg"));
        assert_eq!(probe.probe(Path::new("/a/b/report.pdf")).as_deref(), Some("application/pdf"));
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(
            ExtensionProbe.probe(Path::new("MOVIE.MP4")).as_deref(),
            Some("video/mp4")
        );
    }

    #[test]
    fn unknown_yields_none() {
        assert_eq!(ExtensionProbe.probe(Path::new("data.bin")), None);
        assert_eq!(ExtensionProbe.probe(Path::new("noext")), None);
        assert_eq!(ExtensionProbe.probe(Path::new("")), None);
    }

    #[test]
    fn closures_are_probes() {
        let probe = |_: &Path| Some("application/x-custom".to_string());
        assert_eq!(
            probe.probe(Path::new("whatever")).as_deref(),
            Some("application/x-custom")
        );
    }
}
