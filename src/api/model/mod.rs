pub mod account;
pub mod common;
pub mod post;
