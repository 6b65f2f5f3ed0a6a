pub mod auth_repository;
pub mod post_repository;
pub mod user_login_credentials_repository;
pub mod users_repository;
pub mod verification_repository;
