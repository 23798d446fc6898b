use actix_web::http::{header, Method};
use actix_web::{web, Error, FromRequest, HttpRequest, HttpResponse, ResponseError};
use futures_util::future::LocalBoxFuture;
use sea_orm::EntityTrait;
use std::fmt;

use super::jwt::verify_token;
use super::session::SESSION_COOKIE;
use crate::api::flash;
use crate::config::Config;
use crate::db::DbPool;
use crate::entities::user;

/// The signed-in user, loaded from the session cookie (or a bearer token).
///
/// Routes that require login take `CurrentUser`; anonymous requests are
/// redirected to the login page. Routes with optional login take
/// `Option<CurrentUser>`.
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

impl std::ops::Deref for CurrentUser {
    type Target = user::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for CurrentUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match session_user(&req).await? {
                Some(user) => Ok(CurrentUser(user)),
                None => Err(LoginRequired::for_request(&req).into()),
            }
        })
    }
}

fn request_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn session_user(req: &HttpRequest) -> Result<Option<user::Model>, Error> {
    let Some(token) = request_token(req) else {
        return Ok(None);
    };
    let (Some(config), Some(pool)) = (
        req.app_data::<web::Data<Config>>(),
        req.app_data::<web::Data<DbPool>>(),
    ) else {
        log::error!("CurrentUser extractor used without Config/DbPool app data");
        return Err(actix_web::error::ErrorInternalServerError(
            "application state missing",
        ));
    };

    let claims = match verify_token(&token, &config.session.secret) {
        Ok(claims) => claims,
        Err(e) => {
            log::debug!("Rejected session token: {}", e);
            return Ok(None);
        }
    };
    let Some(user_id) = claims.user_id() else {
        return Ok(None);
    };

    user::Entity::find_by_id(user_id)
        .one(pool.get_ref())
        .await
        .map_err(|e| {
            log::error!("Database error loading session user {}: {:?}", user_id, e);
            actix_web::error::ErrorInternalServerError("Database error")
        })
}

/// Redirect to the login page, remembering where a GET request was headed.
#[derive(Debug)]
pub struct LoginRequired {
    next: Option<String>,
}

impl LoginRequired {
    pub fn for_request(req: &HttpRequest) -> Self {
        let next = (req.method() == Method::GET).then(|| {
            req.uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.path().to_string())
        });
        LoginRequired { next }
    }

    pub fn location(&self) -> String {
        match &self.next {
            Some(next) => format!("/auth/login?next={}", urlencoding::encode(next)),
            None => "/auth/login".to_string(),
        }
    }
}

impl fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Login required")
    }
}

impl ResponseError for LoginRequired {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, self.location()))
            .cookie(flash::single("info", "Please log in to access this page."))
            .finish()
    }
}
