pub mod game;
pub mod lobby;
pub mod moderation;
pub mod user;
pub mod variant;
