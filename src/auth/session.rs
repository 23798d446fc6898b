use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use chrono::Duration;

use super::jwt::{create_token, Claims};
use crate::config::SessionConfig;

pub const SESSION_COOKIE: &str = "session";

/// Signed session cookie for `user_id`. Without `remember` the cookie dies with
/// the browser session and the token after `lifetime_hours`.
pub fn session_cookie(
    config: &SessionConfig,
    user_id: i64,
    remember: bool,
) -> Result<Cookie<'static>, anyhow::Error> {
    let lifetime = if remember {
        Duration::days(config.remember_me_days)
    } else {
        Duration::hours(config.lifetime_hours)
    };
    let token = create_token(&Claims::new(user_id, lifetime), &config.secret)?;

    let mut cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .finish();
    if remember {
        cookie.set_max_age(CookieDuration::seconds(lifetime.num_seconds()));
    }
    Ok(cookie)
}

pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}
