pub mod conversation;
pub mod event;
