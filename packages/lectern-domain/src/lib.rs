pub mod chat;
pub mod context;
pub mod document;
pub mod intent;
pub mod json;
pub mod language;
pub mod session;
