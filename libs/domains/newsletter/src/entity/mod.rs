//! Sea-ORM entities backing the Postgres repositories.

pub mod campaign;
pub mod event;
pub mod subscriber;
pub mod template;
