//! One-shot notices carried across a redirect in a cookie.

use actix_web::cookie::Cookie;
use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use tera::Context;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: String,
    pub message: String,
}

impl FlashMessage {
    pub fn new(category: &str, message: impl Into<String>) -> Self {
        FlashMessage {
            category: category.to_string(),
            message: message.into(),
        }
    }
}

fn encode(messages: &[FlashMessage]) -> Cookie<'static> {
    let json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    Cookie::build(FLASH_COOKIE, urlencoding::encode(&json).into_owned())
        .path("/")
        .http_only(true)
        .finish()
}

/// Messages waiting in the request's flash cookie.
pub fn pending(req: &HttpRequest) -> Vec<FlashMessage> {
    req.cookie(FLASH_COOKIE)
        .and_then(|cookie| {
            let json = urlencoding::decode(cookie.value()).ok()?;
            serde_json::from_str(&json).ok()
        })
        .unwrap_or_default()
}

/// Cookie carrying `message` plus whatever the request still had pending.
pub fn push(req: &HttpRequest, category: &str, message: impl Into<String>) -> Cookie<'static> {
    let mut messages = pending(req);
    messages.push(FlashMessage::new(category, message));
    encode(&messages)
}

/// Cookie carrying just `message`, for responses built without the request.
pub fn single(category: &str, message: impl Into<String>) -> Cookie<'static> {
    encode(&[FlashMessage::new(category, message)])
}

pub fn cleared() -> Cookie<'static> {
    let mut cookie = Cookie::build(FLASH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Show a notice on the page being rendered right now.
pub fn now(ctx: &mut Context, category: &str, message: impl Into<String>) {
    let mut notices: Vec<FlashMessage> = ctx
        .get("notices")
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_default();
    notices.push(FlashMessage::new(category, message));
    ctx.insert("notices", &notices);
}
