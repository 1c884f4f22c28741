//! `SeaORM` entities for the mailmind server.

pub mod prelude;

pub mod email_summary;
pub mod user_settings;
