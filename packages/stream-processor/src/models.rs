use serde::Deserialize;

/// Client-written report subdocument. `block` means the reporter only wants
/// the target hidden from themselves; no summary line is appended.
#[derive(Debug, Deserialize)]
pub struct ReportMarker {
    pub reporter_id: String,
    pub target_id: String,
    pub target_kind: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub block: bool,
}

/// Client-written upvote subdocument; its creation and deletion drive the
/// counter and the reporter-side cache.
#[derive(Debug, Deserialize)]
pub struct UpvoteMarker {
    pub user_id: String,
    pub variant_id: String,
}
