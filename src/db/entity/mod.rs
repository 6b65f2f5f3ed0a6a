pub mod auth;
pub mod post;
pub mod user;
pub mod user_login_credentials;
