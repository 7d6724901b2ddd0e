pub mod auth;
pub mod health;
pub mod projects;
pub mod suggestions;
pub mod tasks;
