use std::sync::Arc;

use aws_lambda_events::event::dynamodb::{Event, EventRecord};
use lambda_runtime::Error;
use serde_dynamo::aws_sdk_dynamodb_1::from_item;
use tracing::{debug, error, warn};

use shared::models::lobby::LobbySlot;
use shared::models::user::UserProfile;
use shared::models::variant::Variant;
use shared::repositories::variant_repository::VariantRepository;
use shared::services::propagation_service::PropagationService;
use shared::services::report_service::{ReportService, ReportTarget};
use shared::services::upvote_service::UpvoteService;
use shared::services::variant_index_service::VariantIndexService;

use crate::models::{ReportMarker, UpvoteMarker};

/// Popularity weight of one open lobby slot.
const SLOT_POPULARITY: i64 = 3;

/// Fans document events out to the denormalization handlers. Everything here
/// is a best-effort mirror of durably-stored source data: failures are
/// logged with repair context and never bounce the event, which would only
/// retry forever over a cosmetic gap.
pub struct StreamProcessor {
    profiles_table: String,
    variants_table: String,
    lobby_table: String,
    reports_table: String,
    upvotes_table: String,
    propagation: Arc<PropagationService>,
    index: Arc<VariantIndexService>,
    variants: Arc<dyn VariantRepository + Send + Sync>,
    reports: Arc<ReportService>,
    upvotes: Arc<UpvoteService>,
}

impl StreamProcessor {
    pub fn new(
        propagation: Arc<PropagationService>,
        index: Arc<VariantIndexService>,
        variants: Arc<dyn VariantRepository + Send + Sync>,
        reports: Arc<ReportService>,
        upvotes: Arc<UpvoteService>,
    ) -> Self {
        Self {
            profiles_table: std::env::var("PROFILES_TABLE")
                .expect("PROFILES_TABLE environment variable must be set"),
            variants_table: std::env::var("VARIANTS_TABLE")
                .expect("VARIANTS_TABLE environment variable must be set"),
            lobby_table: std::env::var("LOBBY_TABLE")
                .expect("LOBBY_TABLE environment variable must be set"),
            reports_table: std::env::var("REPORTS_TABLE")
                .expect("REPORTS_TABLE environment variable must be set"),
            upvotes_table: std::env::var("UPVOTES_TABLE")
                .expect("UPVOTES_TABLE environment variable must be set"),
            propagation,
            index,
            variants,
            reports,
            upvotes,
        }
    }

    pub async fn process_event(&self, event: Event) -> Result<(), Error> {
        debug!("Stream processor received {} record(s)", event.records.len());
        for record in event.records {
            let Some(table) = table_from_arn(record.event_source_arn.as_deref().unwrap_or(""))
            else {
                warn!("Record without a recognizable source table; skipping");
                continue;
            };
            let table = table.to_string();
            if table == self.profiles_table {
                self.on_profile_event(record).await;
            } else if table == self.variants_table {
                self.on_variant_event(record).await;
            } else if table == self.lobby_table {
                self.on_lobby_event(record).await;
            } else if table == self.reports_table {
                self.on_report_event(record).await;
            } else if table == self.upvotes_table {
                self.on_upvote_event(record).await;
            } else {
                warn!("Unhandled source table: {}", table);
            }
        }
        Ok(())
    }

    async fn on_profile_event(&self, record: EventRecord) {
        if record.event_name.as_str() != "MODIFY" {
            return;
        }
        let old: UserProfile = match from_item(record.change.old_image.into()) {
            Ok(profile) => profile,
            Err(e) => {
                error!("Unreadable old profile image: {}", e);
                return;
            }
        };
        let new: UserProfile = match from_item(record.change.new_image.into()) {
            Ok(profile) => profile,
            Err(e) => {
                error!("Unreadable new profile image: {}", e);
                return;
            }
        };
        if old.name != new.name {
            self.propagation.propagate_rename(&new.id, &new.name).await;
        }
    }

    async fn on_variant_event(&self, record: EventRecord) {
        match record.event_name.as_str() {
            "INSERT" => {
                let variant: Variant = match from_item(record.change.new_image.into()) {
                    Ok(variant) => variant,
                    Err(e) => {
                        error!("Unreadable new variant image: {}", e);
                        return;
                    }
                };
                if let Err(e) = self.index.add_variant(&variant).await {
                    error!("Could not index variant {}: {}", variant.id, e);
                }
            }
            "REMOVE" => {
                let variant: Variant = match from_item(record.change.old_image.into()) {
                    Ok(variant) => variant,
                    Err(e) => {
                        error!("Unreadable old variant image: {}", e);
                        return;
                    }
                };
                if let Err(e) = self.index.remove_variant(&variant.id).await {
                    error!("Could not unindex variant {}: {}", variant.id, e);
                }
            }
            _ => {}
        }
    }

    async fn on_lobby_event(&self, record: EventRecord) {
        let (image, delta) = match record.event_name.as_str() {
            "INSERT" => (record.change.new_image, SLOT_POPULARITY),
            "REMOVE" => (record.change.old_image, -SLOT_POPULARITY),
            _ => return,
        };
        let slot: LobbySlot = match from_item(image.into()) {
            Ok(slot) => slot,
            Err(e) => {
                error!("Unreadable lobby slot image: {}", e);
                return;
            }
        };
        if let Err(e) = self.variants.add_popularity(&slot.variant_id, delta).await {
            warn!(
                "Popularity adjustment ({}) failed for variant {}: {}",
                delta, slot.variant_id, e
            );
        }
    }

    async fn on_report_event(&self, record: EventRecord) {
        if record.event_name.as_str() != "INSERT" {
            return;
        }
        let marker: ReportMarker = match from_item(record.change.new_image.into()) {
            Ok(marker) => marker,
            Err(e) => {
                error!("Unreadable report marker: {}", e);
                return;
            }
        };
        let target = match marker.target_kind.as_str() {
            "user" => ReportTarget::User,
            "variant" => ReportTarget::Variant,
            other => {
                error!("Unknown report target kind: {}", other);
                return;
            }
        };
        if let Err(e) = self
            .reports
            .submit_report(
                &marker.reporter_id,
                &marker.target_id,
                target,
                &marker.reason,
                marker.block,
            )
            .await
        {
            error!(
                "Report by {} on {} was not aggregated: {}",
                marker.reporter_id, marker.target_id, e
            );
        }
    }

    async fn on_upvote_event(&self, record: EventRecord) {
        let (image, added) = match record.event_name.as_str() {
            "INSERT" => (record.change.new_image, true),
            "REMOVE" => (record.change.old_image, false),
            _ => return,
        };
        let marker: UpvoteMarker = match from_item(image.into()) {
            Ok(marker) => marker,
            Err(e) => {
                error!("Unreadable upvote marker: {}", e);
                return;
            }
        };
        let result = if added {
            self.upvotes.upvote(&marker.user_id, &marker.variant_id).await
        } else {
            self.upvotes
                .remove_upvote(&marker.user_id, &marker.variant_id)
                .await
        };
        if let Err(e) = result {
            error!(
                "Upvote aggregation failed for {} on {}: {}",
                marker.user_id, marker.variant_id, e
            );
        }
    }
}

/// "arn:aws:dynamodb:region:account:table/Name/stream/..." -> "Name"
fn table_from_arn(arn: &str) -> Option<&str> {
    arn.split("table/").nth(1)?.split('/').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_from_arn() {
        assert_eq!(
            table_from_arn(
                "arn:aws:dynamodb:eu-west-1:123:table/profiles/stream/2026-01-01T00:00:00.000"
            ),
            Some("profiles")
        );
        assert_eq!(table_from_arn("garbage"), None);
    }
}
