pub mod discovery;
pub mod health;
pub mod likes;
pub mod matches;
pub mod messages;
pub mod notifications;
pub mod photo;
pub mod profile;
pub mod prompt;
