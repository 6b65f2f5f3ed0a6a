pub mod auth_service;
pub mod email;
pub mod google;
pub mod post_service;
pub mod token_service;
pub mod user_service;
