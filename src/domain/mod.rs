pub mod auth;
pub mod conversation;
pub mod feed;
pub mod message;
