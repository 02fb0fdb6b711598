pub mod bulk_writer;
pub mod errors;
pub mod game_repository;
pub mod index_repository;
pub mod lobby_repository;
pub mod moderation_repository;
pub mod profile_repository;
pub mod variant_repository;
