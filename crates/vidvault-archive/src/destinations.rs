use std::sync::Arc;
use vidvault_storage::BlobStore;

/// The configured destination set: one primary plus zero or more backups,
/// addressable by destination id.
pub struct Destinations {
    primary: Arc<dyn BlobStore>,
    backups: Vec<Arc<dyn BlobStore>>,
}

impl Destinations {
    pub fn new(primary: Arc<dyn BlobStore>, backups: Vec<Arc<dyn BlobStore>>) -> Self {
        Destinations { primary, backups }
    }

    pub fn primary(&self) -> &Arc<dyn BlobStore> {
        &self.primary
    }

    pub fn backups(&self) -> &[Arc<dyn BlobStore>] {
        &self.backups
    }

    pub fn get(&self, destination_id: &str) -> Option<&Arc<dyn BlobStore>> {
        if self.primary.destination_id() == destination_id {
            return Some(&self.primary);
        }
        self.backups
            .iter()
            .find(|b| b.destination_id() == destination_id)
    }
}
