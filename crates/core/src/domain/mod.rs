pub mod action;
pub mod analysis;
pub mod message;
