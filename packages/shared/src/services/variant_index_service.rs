use std::sync::Arc;

use tracing::{info, warn};

use crate::models::variant::{IndexEntry, IndexPage, Variant};
use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::index_repository::IndexRepository;

const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Keeps the paginated text index of variant metadata in step with variant
/// creation and deletion. The index is a search convenience: a missing entry
/// must never block the operation it mirrors.
pub struct VariantIndexService {
    index: Arc<dyn IndexRepository + Send + Sync>,
}

impl VariantIndexService {
    pub fn new(index: Arc<dyn IndexRepository + Send + Sync>) -> Self {
        VariantIndexService { index }
    }

    /// Appends the variant's entry to the first page with room, or opens a
    /// new highest-numbered page when none fits.
    pub async fn add_variant(&self, variant: &Variant) -> Result<(), StoreError> {
        let entry = IndexEntry::for_variant(variant);
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let pages = self.index.list_pages().await?;
            let target = pages.iter().find(|p| p.has_room_for(&entry));
            let (mut page, read_version) = match target {
                Some(page) => (page.clone(), page.version),
                None => {
                    let next = pages.last().map(|p| p.page + 1).unwrap_or(0);
                    (IndexPage::new(next), 0)
                }
            };
            page.entries.push(entry.clone());
            page.version += 1;
            match self.index.put_page_versioned(&page, read_version).await {
                Ok(()) => {
                    info!("Indexed variant {} on page {}", variant.id, page.page);
                    return Ok(());
                }
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict)
    }

    /// Removes the variant's entry wherever it is. Not finding it is logged
    /// and tolerated.
    pub async fn remove_variant(&self, variant_id: &str) -> Result<(), StoreError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let pages = self.index.list_pages().await?;
            let Some(page) = pages
                .iter()
                .find(|p| p.entries.iter().any(|e| e.variant_id == variant_id))
            else {
                warn!(
                    "Variant {} has no index entry to remove; continuing",
                    variant_id
                );
                return Ok(());
            };
            let mut page = page.clone();
            let read_version = page.version;
            page.entries.retain(|e| e.variant_id != variant_id);
            page.version += 1;
            match self.index.put_page_versioned(&page, read_version).await {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict)
    }
}
