use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use serde_json::json;
use tera::{Context, Tera};

use super::form::FormData;
use super::render::{errors_by_field, page, redirect_with, wants_json};
use crate::auth::CurrentUser;
use crate::config::Config;
use crate::db::DbPool;
use crate::entities::user;
use crate::models::{FollowState, PageQuery, PageRequest, ProfileEdit, ProfileFormView, ProfileStats, UserView};
use crate::services::{accounts, feed, follows, ImageStore, ServiceError};
use crate::validation::FieldError;

fn profile_path(username: &str) -> String {
    format!("/users/{}", urlencoding::encode(username))
}

fn edit_page(
    tera: &Tera,
    req: &HttpRequest,
    user: &user::Model,
    form: ProfileFormView,
    errors: &[FieldError],
) -> ActixResult<HttpResponse> {
    let mut ctx = Context::new();
    ctx.insert("title", "Edit Profile");
    ctx.insert("form", &form);
    ctx.insert("avatar", &user.avatar);
    ctx.insert("errors", &errors_by_field(errors));
    page(tera, req, Some(user), "users/edit_profile.html", ctx)
}

#[utoipa::path(
    get,
    path = "/users/{username}",
    params(
        ("username" = String, Path, description = "Username"),
        ("page" = Option<u64>, Query, description = "Page of the user's posts (default: 1)")
    ),
    responses(
        (status = 200, description = "Profile with counts and the user's posts", body = String, content_type = "text/html"),
        (status = 404, description = "No such user")
    ),
    tag = "users"
)]
pub async fn profile(
    req: HttpRequest,
    viewer: Option<CurrentUser>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    let db = pool.get_ref();
    let user = accounts::find_by_username(db, &path).await?;
    let request = PageRequest::new(query.page, config.pagination.posts_per_page);

    let viewer_id = viewer.as_ref().map(CurrentUser::id);

    let posts = feed::user_posts(db, user.id, viewer_id, request).await?;
    let is_following = match viewer_id {
        Some(viewer_id) => follows::is_following(db, viewer_id, user.id).await?,
        None => false,
    };
    let stats = ProfileStats {
        post_count: posts.total,
        follower_count: follows::follower_count(db, user.id).await?,
        following_count: follows::following_count(db, user.id).await?,
        is_following,
        is_self: viewer_id == Some(user.id),
    };

    let mut ctx = Context::new();
    ctx.insert("title", &user.username);
    ctx.insert("base_url", &format!("{}?", profile_path(&user.username)));
    ctx.insert("user", &UserView::from(user));
    ctx.insert("stats", &stats);
    ctx.insert("posts", &posts);
    page(&tera, &req, viewer.as_deref(), "users/profile.html", ctx)
}

#[utoipa::path(
    get,
    path = "/users/edit_profile",
    responses(
        (status = 200, description = "Profile form filled with current values", body = String, content_type = "text/html"),
        (status = 302, description = "Not signed in; redirected to the login page")
    ),
    security(("session_cookie" = [])),
    tag = "users"
)]
pub async fn edit_profile_form(
    req: HttpRequest,
    user: CurrentUser,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    edit_page(&tera, &req, &user.0, ProfileFormView::from(&user.0), &[])
}

#[utoipa::path(
    post,
    path = "/users/edit_profile",
    request_body(content = String, description = "Fields `username`, `email`, `bio` and an optional `avatar` file", content_type = "multipart/form-data"),
    responses(
        (status = 302, description = "Profile saved; redirected to it"),
        (status = 200, description = "Form re-rendered with field errors", body = String, content_type = "text/html")
    ),
    security(("session_cookie" = [])),
    tag = "users"
)]
pub async fn edit_profile(
    req: HttpRequest,
    user: CurrentUser,
    payload: web::Payload,
    pool: web::Data<DbPool>,
    images: web::Data<ImageStore>,
    config: web::Data<Config>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    let mut form = FormData::read(&req, payload, config.uploads.max_content_length).await?;
    let edit = ProfileEdit {
        username: form.text("username"),
        email: form.text("email"),
        bio: form.optional_text("bio"),
        avatar: form.take_file("avatar"),
    };
    let echo = ProfileFormView::from(&edit);

    match accounts::edit_profile(pool.get_ref(), &images, &user, edit).await {
        Ok(updated) => Ok(redirect_with(
            &req,
            &profile_path(&updated.username),
            "success",
            "Your profile has been updated!",
        )),
        Err(ServiceError::Image(e)) => {
            log::info!("Rejected avatar from user {}: {}", user.id(), e);
            let errors = [FieldError::new("avatar", "The uploaded file is not a readable image.")];
            edit_page(&tera, &req, &user.0, echo, &errors)
        }
        Err(e) => match e.field_errors() {
            Some(errors) => edit_page(&tera, &req, &user.0, echo, &errors),
            None => Err(e.into()),
        },
    }
}

/// Shared body of follow and unfollow: resolve the target, apply `change`,
/// then answer with JSON or a redirect carrying a flash message.
async fn change_follow<F, Fut>(
    req: &HttpRequest,
    actor: &CurrentUser,
    username: &str,
    pool: &DbPool,
    change: F,
) -> ActixResult<HttpResponse>
where
    F: FnOnce(i64) -> Fut,
    Fut: std::future::Future<Output = Result<FollowState, ServiceError>>,
{
    let json = wants_json(req);
    let target = match accounts::find_by_username(pool, username).await {
        Ok(target) => target,
        Err(ServiceError::NotFound(_)) => {
            if json {
                return Ok(HttpResponse::NotFound().json(json!({ "error": "User not found." })));
            }
            return Ok(redirect_with(req, "/", "danger", "User not found."));
        }
        Err(e) => return Err(e.into()),
    };

    match change(target.id).await {
        Ok(state) if json => Ok(HttpResponse::Ok().json(state)),
        Ok(state) => {
            let (category, message) = if state.following {
                ("success", format!("You are now following {}!", target.username))
            } else {
                ("info", format!("You are no longer following {}.", target.username))
            };
            Ok(redirect_with(req, &profile_path(&target.username), category, message))
        }
        Err(e @ (ServiceError::SelfFollow | ServiceError::SelfUnfollow)) => {
            let message = match e {
                ServiceError::SelfFollow => "You cannot follow yourself!",
                _ => "You cannot unfollow yourself!",
            };
            if json {
                return Ok(HttpResponse::BadRequest().json(json!({ "error": message })));
            }
            Ok(redirect_with(req, &profile_path(&target.username), "warning", message))
        }
        Err(e) => {
            log::warn!("Follow change by user {} failed: {}", actor.id(), e);
            Err(e.into())
        }
    }
}

#[utoipa::path(
    post,
    path = "/users/follow/{username}",
    params(("username" = String, Path, description = "User to follow")),
    responses(
        (status = 200, description = "New follow state, for JSON clients", body = FollowState),
        (status = 302, description = "Redirected to the profile for browser clients"),
        (status = 400, description = "Tried to follow yourself (JSON clients)"),
        (status = 404, description = "No such user (JSON clients)")
    ),
    security(("session_cookie" = [])),
    tag = "users"
)]
pub async fn follow(
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> ActixResult<HttpResponse> {
    let db = pool.get_ref();
    change_follow(&req, &user, &path, db, |target| {
        follows::follow(db, user.id(), target)
    })
    .await
}

#[utoipa::path(
    post,
    path = "/users/unfollow/{username}",
    params(("username" = String, Path, description = "User to unfollow")),
    responses(
        (status = 200, description = "New follow state, for JSON clients", body = FollowState),
        (status = 302, description = "Redirected to the profile for browser clients"),
        (status = 400, description = "Tried to unfollow yourself (JSON clients)"),
        (status = 404, description = "No such user (JSON clients)")
    ),
    security(("session_cookie" = [])),
    tag = "users"
)]
pub async fn unfollow(
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> ActixResult<HttpResponse> {
    let db = pool.get_ref();
    change_follow(&req, &user, &path, db, |target| {
        follows::unfollow(db, user.id(), target)
    })
    .await
}
