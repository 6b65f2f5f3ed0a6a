use crate::api::handler::{account_handler, health_handler, post_handler};
use crate::error::error_model::{ApiError, ValidationError};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "5thsocial API",
        version = "0.1.0",
        description = "Accounts, JWT authentication and posts with likes, shares and comments."
    ),
    paths(
        health_handler::health_handler,
        account_handler::register_handler,
        account_handler::verify_email_handler,
        account_handler::resend_verification_handler,
        account_handler::login_handler,
        account_handler::refresh_token_handler,
        account_handler::logout_handler,
        account_handler::google_auth_handler,
        account_handler::get_profile_handler,
        account_handler::update_profile_handler,
        post_handler::list_posts_handler,
        post_handler::create_post_handler,
        post_handler::get_post_handler,
        post_handler::update_post_handler,
        post_handler::patch_post_handler,
        post_handler::delete_post_handler,
        post_handler::like_post_handler,
        post_handler::share_post_handler,
        post_handler::list_comments_handler,
        post_handler::create_comment_handler,
        post_handler::search_posts_handler,
        post_handler::user_posts_handler,
    ),
    components(schemas(ApiError, ValidationError)),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Account", description = "Registration, login, tokens and profile"),
        (name = "Posts", description = "Posts, likes, shares and comments"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/account/login/"))
                        .build(),
                ),
            )
        }
    }
}

impl ApiDoc {
    pub fn openapi_json_path() -> &'static str {
        "/api-docs/openapi.json"
    }
}
