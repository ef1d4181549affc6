pub mod connection;
pub mod migrations;
pub mod outbox_repo;
pub mod project_repo;
pub mod score_log_repo;
pub mod template_repo;
pub mod user_repo;

pub use connection::*;
