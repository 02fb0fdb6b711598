pub mod auth;
pub mod blobs;
pub mod identity;
pub mod models;
pub mod repositories;
pub mod services;

#[cfg(test)]
pub mod test_support;

/// Display name written wherever a deleted or banned user's identity was
/// mirrored. The id next to it is nulled at the same time.
pub const DELETED_USER_DISPLAY_NAME: &str = "[deleted]";
