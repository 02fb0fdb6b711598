use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::models::moderation::{sanitize_reason, ModerationDoc, ReportEntry};
use crate::models::user::PrivateCache;
use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::moderation_repository::ModerationRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::services::errors::rpc_errors::RpcError;

/// Bounded retries for the optimistic read-modify-write cycle on a
/// moderation summary.
const MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    User,
    Variant,
}

/// Report aggregation: appends summary lines and keeps the per-user caches
/// of who reported what. Reports are event-triggered (client writes a report
/// subdocument); discards are moderator RPCs.
pub struct ReportService {
    moderation: Arc<dyn ModerationRepository + Send + Sync>,
    profiles: Arc<dyn ProfileRepository + Send + Sync>,
}

impl ReportService {
    pub fn new(
        moderation: Arc<dyn ModerationRepository + Send + Sync>,
        profiles: Arc<dyn ProfileRepository + Send + Sync>,
    ) -> Self {
        ReportService {
            moderation,
            profiles,
        }
    }

    /// Handles one report subdocument. A block updates only the reporter's
    /// private cache and never touches the target's summary.
    pub async fn submit_report(
        &self,
        reporter_id: &str,
        target_id: &str,
        target: ReportTarget,
        reason: &str,
        block_only: bool,
    ) -> Result<(), StoreError> {
        self.remember_in_cache(reporter_id, target_id, target).await;
        if block_only {
            info!("User {} blocked {}; no summary line", reporter_id, target_id);
            return Ok(());
        }

        let reporter_username = match self.profiles.get_profile(reporter_id).await {
            Ok(profile) => profile.username,
            Err(e) => {
                warn!("No profile for reporter {}: {}", reporter_id, e);
                return Ok(());
            }
        };
        let entry = ReportEntry {
            reporter_id: reporter_id.to_string(),
            reporter_username,
            reason: sanitize_reason(reason),
            time_ms: Utc::now().timestamp_millis(),
        };

        // Optimistic transaction: re-read and retry while concurrent
        // reporters race us.
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut doc = match self.moderation.get_doc(target_id).await {
                Ok(doc) => doc,
                Err(StoreError::NotFound) => ModerationDoc::new(target_id),
                Err(e) => return Err(e),
            };
            let read_version = doc.version;
            doc.reports.push(entry.clone());
            doc.num_reports = doc.reports.len() as u32;
            doc.version += 1;
            match self.moderation.put_doc_versioned(&doc, read_version).await {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict)
    }

    /// Removes exactly the given summary lines. Indexes must be non-negative
    /// and in range; any bad index fails the whole call before any write.
    /// An empty list is a successful no-op.
    pub async fn discard_reports(
        &self,
        target_id: &str,
        indexes: &[i64],
    ) -> Result<(), RpcError> {
        if indexes.is_empty() {
            return Ok(());
        }
        if indexes.iter().any(|&i| i < 0) {
            return Err(RpcError::invalid_argument(
                "Report indexes must be non-negative integers",
            ));
        }
        let wanted: BTreeSet<usize> = indexes.iter().map(|&i| i as usize).collect();

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut doc = self.moderation.get_doc(target_id).await.map_err(|e| match e {
                StoreError::NotFound => RpcError::not_found("No reports for this target"),
                other => other.into(),
            })?;
            if let Some(&max) = wanted.iter().next_back() {
                if max >= doc.reports.len() {
                    return Err(RpcError::invalid_argument(
                        "Report index out of range",
                    ));
                }
            }
            let read_version = doc.version;
            let reports = std::mem::take(&mut doc.reports);
            doc.reports = reports
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !wanted.contains(i))
                .map(|(_, entry)| entry)
                .collect();
            doc.num_reports = doc.reports.len() as u32;
            doc.version += 1;
            match self.moderation.put_doc_versioned(&doc, read_version).await {
                Ok(()) => {
                    info!(
                        "Discarded {} report(s) from {}; {} remain",
                        wanted.len(),
                        target_id,
                        doc.num_reports
                    );
                    return Ok(());
                }
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(RpcError::internal(
            "Report summary kept changing; discard gave up",
        ))
    }

    async fn remember_in_cache(&self, reporter_id: &str, target_id: &str, target: ReportTarget) {
        let mut cache = match self.profiles.get_cache(reporter_id).await {
            Ok(cache) => cache,
            Err(StoreError::NotFound) => PrivateCache::new(reporter_id),
            Err(e) => {
                warn!("Could not read cache for {}: {}", reporter_id, e);
                return;
            }
        };
        let list = match target {
            ReportTarget::User => &mut cache.reported_users,
            ReportTarget::Variant => &mut cache.reported_variants,
        };
        if !list.contains(&target_id.to_string()) {
            list.push(target_id.to_string());
            if let Err(e) = self.profiles.put_cache(&cache).await {
                warn!("Could not update cache for {}: {}", reporter_id, e);
            }
        }
    }
}
