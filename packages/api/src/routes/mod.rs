pub mod games;
pub mod health;
pub mod moderation;
pub mod variants;
