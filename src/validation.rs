//! Field-level validation for the submitted forms.
//!
//! Each function checks one form and returns every failing field, so callers
//! can render all messages at once. Uniqueness is not checked here; it needs
//! the database and lives in the account service.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::models::{NewAccount, NewPost, ProfileEdit, RegisterRequest, Upload};

pub const USERNAME_MIN: usize = 4;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 6;
pub const BIO_MAX: usize = 200;
pub const POST_MAX: usize = 500;
pub const COMMENT_MAX: usize = 200;
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
}

fn required(errors: &mut Vec<FieldError>, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, REQUIRED));
        return false;
    }
    true
}

fn length_between(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min || len > max {
        errors.push(FieldError::new(
            field,
            format!("Field must be between {min} and {max} characters long."),
        ));
    }
}

fn at_most(errors: &mut Vec<FieldError>, field: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("Field cannot be longer than {max} characters."),
        ));
    }
}

fn username(errors: &mut Vec<FieldError>, value: &str) {
    if required(errors, "username", value) {
        length_between(errors, "username", value, USERNAME_MIN, USERNAME_MAX);
    }
}

fn email(errors: &mut Vec<FieldError>, value: &str) {
    if required(errors, "email", value) && !email_regex().is_match(value) {
        errors.push(FieldError::new("email", "Invalid email address."));
    }
}

/// Extension of an uploaded filename, lowercased, if it is an allowed image type.
pub fn image_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_IMAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

fn image(errors: &mut Vec<FieldError>, field: &'static str, upload: Option<&Upload>) {
    if let Some(upload) = upload {
        if image_extension(&upload.filename).is_none() {
            errors.push(FieldError::new(
                field,
                "File does not have an approved extension: jpg, png, jpeg, gif",
            ));
        }
    }
}

fn password(errors: &mut Vec<FieldError>, value: &str) {
    if required(errors, "password", value) && value.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            format!("Field must be at least {PASSWORD_MIN} characters long."),
        ));
    }
}

pub fn validate_registration(form: &RegisterRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    username(&mut errors, &form.username);
    email(&mut errors, &form.email);
    password(&mut errors, &form.password);
    if required(&mut errors, "password2", &form.password2) && form.password2 != form.password {
        errors.push(FieldError::new("password2", "Field must be equal to password."));
    }
    errors
}

/// The stored fields of a new account, checked again by the account service
/// whatever the caller validated beforehand.
pub fn validate_account(account: &NewAccount) -> Vec<FieldError> {
    let mut errors = Vec::new();
    username(&mut errors, &account.username);
    email(&mut errors, &account.email);
    password(&mut errors, &account.password);
    errors
}

pub fn validate_login(username_value: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    username(&mut errors, username_value);
    required(&mut errors, "password", password);
    errors
}

pub fn validate_profile(edit: &ProfileEdit) -> Vec<FieldError> {
    let mut errors = Vec::new();
    username(&mut errors, &edit.username);
    email(&mut errors, &edit.email);
    if let Some(bio) = &edit.bio {
        at_most(&mut errors, "bio", bio, BIO_MAX);
    }
    image(&mut errors, "avatar", edit.avatar.as_ref());
    errors
}

pub fn validate_post(post: &NewPost) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if required(&mut errors, "content", &post.content) {
        length_between(&mut errors, "content", &post.content, 1, POST_MAX);
    }
    image(&mut errors, "image", post.image.as_ref());
    errors
}

pub fn validate_comment(content: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if required(&mut errors, "content", content) {
        length_between(&mut errors, "content", content, 1, COMMENT_MAX);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, password: &str, password2: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password2: password2.to_string(),
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn valid_registration_has_no_errors() {
        let form = registration("alice", "alice@x.com", "pw123456", "pw123456");
        assert!(validate_registration(&form).is_empty());
    }

    #[test]
    fn registration_reports_every_failing_field() {
        let form = registration("al", "not-an-email", "123", "456");
        let errors = validate_registration(&form);
        assert_eq!(fields(&errors), vec!["username", "email", "password", "password2"]);
        assert_eq!(errors[3].message, "Field must be equal to password.");
    }

    #[test]
    fn account_fields_are_checked_without_confirmation() {
        let account = NewAccount {
            username: "bob".to_string(),
            email: "bob@example".to_string(),
            password: "secret1".to_string(),
        };
        assert_eq!(fields(&validate_account(&account)), vec!["username", "email"]);
    }

    #[test]
    fn username_length_counts_characters_not_bytes() {
        let form = registration("ééééé", "e@x.com", "pw123456", "pw123456");
        assert!(validate_registration(&form).is_empty());

        let long = "a".repeat(USERNAME_MAX + 1);
        let form = registration(&long, "e@x.com", "pw123456", "pw123456");
        assert_eq!(fields(&validate_registration(&form)), vec!["username"]);
    }

    #[test]
    fn post_content_bounds() {
        let empty = NewPost::default();
        assert_eq!(validate_post(&empty)[0].message, REQUIRED);

        let max = NewPost {
            content: "x".repeat(POST_MAX),
            image: None,
        };
        assert!(validate_post(&max).is_empty());

        let too_long = NewPost {
            content: "x".repeat(POST_MAX + 1),
            image: None,
        };
        assert_eq!(fields(&validate_post(&too_long)), vec!["content"]);
    }

    #[test]
    fn comment_content_bounds() {
        assert_eq!(fields(&validate_comment("   ")), vec!["content"]);
        assert!(validate_comment(&"c".repeat(COMMENT_MAX)).is_empty());
        assert_eq!(fields(&validate_comment(&"c".repeat(COMMENT_MAX + 1))), vec!["content"]);
    }

    #[test]
    fn profile_rejects_long_bio_and_bad_avatar() {
        let edit = ProfileEdit {
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            bio: Some("b".repeat(BIO_MAX + 1)),
            avatar: Some(Upload {
                filename: "avatar.bmp".to_string(),
                bytes: Vec::new(),
            }),
        };
        assert_eq!(fields(&validate_profile(&edit)), vec!["bio", "avatar"]);
    }

    #[test]
    fn image_extension_is_case_insensitive() {
        assert_eq!(image_extension("Photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(image_extension("a.b.gif").as_deref(), Some("gif"));
        assert_eq!(image_extension("noext"), None);
        assert_eq!(image_extension("script.php"), None);
    }
}
