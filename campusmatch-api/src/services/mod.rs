pub mod content;
pub mod discovery;
pub mod push;
