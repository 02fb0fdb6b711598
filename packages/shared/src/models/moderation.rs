use serde::{Deserialize, Serialize};

/// Replacement written when a report reason would break the summary format.
pub const REPORT_REASON_PLACEHOLDER: &str = "[invalid reason]";

/// One line of a moderation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub reporter_id: String,
    pub reporter_username: String,
    pub reason: String,
    pub time_ms: i64,
}

/// Per-target (user or variant) report log plus counter. `version` backs the
/// optimistic read-modify-write cycle used by concurrent reporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationDoc {
    pub target_id: String,
    pub num_reports: u32,
    pub reports: Vec<ReportEntry>,
    pub version: u64,
}

impl ModerationDoc {
    pub fn new(target_id: &str) -> Self {
        ModerationDoc {
            target_id: target_id.to_string(),
            num_reports: 0,
            reports: Vec::new(),
            version: 0,
        }
    }
}

/// Reasons pass through unchanged unless they would corrupt the line-oriented
/// summary; tabs and newlines mark a hand-crafted payload, not a reason.
pub fn sanitize_reason(reason: &str) -> String {
    if reason.contains('\t') || reason.contains('\n') {
        REPORT_REASON_PLACEHOLDER.to_string()
    } else {
        reason.to_string()
    }
}

/// Pre-ban snapshot of everything a ban destroys. Exists only between ban
/// and unban/wipe; once deleted, unban is foreclosed forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanBackup {
    pub user_id: String,
    pub name: String,
    pub about: String,
    pub profile_img: Option<String>,
    pub white_game_ids: Vec<String>,
    pub black_game_ids: Vec<String>,
    pub variant_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("spam" => "spam".to_string(); "plain reason untouched")]
    #[test_case("a\tb" => REPORT_REASON_PLACEHOLDER.to_string(); "tab replaced")]
    #[test_case("a\nb" => REPORT_REASON_PLACEHOLDER.to_string(); "newline replaced")]
    #[test_case("" => "".to_string(); "empty reason allowed")]
    fn test_sanitize_reason(reason: &str) -> String {
        sanitize_reason(reason)
    }
}
