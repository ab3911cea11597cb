use std::sync::Arc;
use vidvault_archive::VideoArchive;

pub struct AppState {
    pub archive: Arc<VideoArchive>,
    /// Upper bound on accepted upload bodies, enforced per field.
    pub max_upload_size: usize,
}
