/// Destination chosen for an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    ObjectStore,
    MediaHosting,
}

/// Routes audio/video to the media host and everything else to the object store.
///
/// Some clients report MP4 containers as `application/mp4`, so that type is
/// treated as media as well. Matching is case-sensitive.
pub fn classify(declared_media_type: Option<&str>) -> Backend {
    match declared_media_type {
        Some(mime)
            if mime.starts_with("video/")
                || mime.starts_with("audio/")
                || mime == "application/mp4" =>
        {
            Backend::MediaHosting
        }
        _ => Backend::ObjectStore,
    }
}
