use crate::db::entity::user::{UserProfile, Users};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

pub static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]*$").unwrap());

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::new("blank").with_message("This field may not be blank.".into()))
    } else {
        Ok(())
    }
}

fn validate_uuid(token: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(token)
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid").with_message("Must be a valid UUID.".into()))
}

// Empty clears the image; anything else must look like an http(s) URL.
fn validate_image_url(image: &str) -> Result<(), ValidationError> {
    if image.is_empty() || image.starts_with("http://") || image.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("url").with_message("Enter a valid URL.".into()))
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        regex(
            path = *USERNAME_REGEX,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    #[schema(example = "jdoe")]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "Ensure this field has at least 8 characters."))]
    #[schema(example = "SecretPassword123!")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "Registration successful! Please check your email to verify your account.")]
    pub message: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct VerifyEmailRequest {
    #[validate(custom(function = "validate_uuid"))]
    #[schema(example = "0b8f3f6e-7c1a-4c59-9d4f-2f1c1b0f9a11")]
    pub token: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "Enter a valid email address."))]
    #[schema(example = "jdoe@example.com")]
    pub email: String,
}

/// Login accepts either `email` or `username` as the identifier.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    #[schema(example = "jdoe@example.com")]
    pub email: Option<String>,
    #[schema(example = "jdoe")]
    pub username: Option<String>,
    #[schema(example = "SecretPassword123!")]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(example = "John Doe")]
    pub name: String,
    pub is_email_verified: bool,
}

impl From<&Users> for LoginUser {
    fn from(user: &Users) -> Self {
        LoginUser {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            name: user.display_name(),
            is_email_verified: user.is_email_verified,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: LoginUser,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "This field is required."))]
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct GoogleAuthRequest {
    #[validate(length(min = 1, message = "This field is required."))]
    #[schema(example = "eyJhbGciOiJSUzI1NiIsImtpZCI6...")]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileBody {
    #[schema(example = "https://res.cloudinary.com/demo/image/upload/avatar.png")]
    pub image: Option<String>,
    #[schema(example = "Hello there")]
    pub bio: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub profile: ProfileBody,
}

impl ProfileResponse {
    pub fn new(user: &Users, profile: UserProfile) -> Self {
        ProfileResponse {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            profile: ProfileBody {
                image: profile.image,
                bio: profile.bio,
            },
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateProfileBody {
    #[validate(custom(function = "validate_image_url"))]
    pub image: Option<String>,
    pub bio: Option<String>,
}

/// Fields left out keep their current value.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateProfileRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        regex(
            path = *USERNAME_REGEX,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(nested)]
    pub profile: Option<UpdateProfileBody>,
}
