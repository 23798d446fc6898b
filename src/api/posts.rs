use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use tera::{Context, Tera};

use super::form::FormData;
use super::render::{back_to, errors_by_field, page, redirect_with, wants_json};
use crate::auth::CurrentUser;
use crate::config::Config;
use crate::db::DbPool;
use crate::models::{CommentRequest, LikeState, NewPost};
use crate::services::{engagement, posts, ImageStore, ServiceError};
use crate::validation::FieldError;

fn create_page(
    tera: &Tera,
    req: &HttpRequest,
    user: &CurrentUser,
    content: &str,
    errors: &[FieldError],
) -> ActixResult<HttpResponse> {
    let mut ctx = Context::new();
    ctx.insert("title", "Create Post");
    ctx.insert("content", content);
    ctx.insert("errors", &errors_by_field(errors));
    page(tera, req, Some(&user.0), "posts/create.html", ctx)
}

#[utoipa::path(
    get,
    path = "/posts/create",
    responses(
        (status = 200, description = "New post form", body = String, content_type = "text/html"),
        (status = 302, description = "Not signed in; redirected to the login page")
    ),
    security(("session_cookie" = [])),
    tag = "posts"
)]
pub async fn create_form(
    req: HttpRequest,
    user: CurrentUser,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    create_page(&tera, &req, &user, "", &[])
}

#[utoipa::path(
    post,
    path = "/posts/create",
    request_body(content = String, description = "Fields `content` and an optional `image` file", content_type = "multipart/form-data"),
    responses(
        (status = 302, description = "Post created; redirected home"),
        (status = 200, description = "Form re-rendered with field errors", body = String, content_type = "text/html")
    ),
    security(("session_cookie" = [])),
    tag = "posts"
)]
pub async fn create(
    req: HttpRequest,
    user: CurrentUser,
    payload: web::Payload,
    pool: web::Data<DbPool>,
    images: web::Data<ImageStore>,
    config: web::Data<Config>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    let mut form = FormData::read(&req, payload, config.uploads.max_content_length).await?;
    let new_post = NewPost {
        content: form.text("content"),
        image: form.take_file("image"),
    };
    let content = new_post.content.clone();

    match posts::create_post(pool.get_ref(), &images, user.id(), new_post).await {
        Ok(_) => Ok(redirect_with(&req, "/", "success", "Your post has been created!")),
        Err(ServiceError::Image(e)) => {
            log::info!("Rejected post image from user {}: {}", user.id(), e);
            let errors = [FieldError::new("image", "The uploaded file is not a readable image.")];
            create_page(&tera, &req, &user, &content, &errors)
        }
        Err(e) => match e.field_errors() {
            Some(errors) => create_page(&tera, &req, &user, &content, &errors),
            None => Err(e.into()),
        },
    }
}

#[utoipa::path(
    get,
    path = "/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with its comments, newest first", body = String, content_type = "text/html"),
        (status = 404, description = "No such post")
    ),
    tag = "posts"
)]
pub async fn detail(
    req: HttpRequest,
    user: Option<CurrentUser>,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    let post_id = path.into_inner();
    let viewer = user.as_ref().map(CurrentUser::id);

    let post = posts::post_view(pool.get_ref(), post_id, viewer).await?;
    let comments = engagement::comments_for(pool.get_ref(), post_id).await?;

    let mut ctx = Context::new();
    ctx.insert("title", "Post");
    ctx.insert("post", &post);
    ctx.insert("comments", &comments);
    page(&tera, &req, user.as_deref(), "posts/detail.html", ctx)
}

#[utoipa::path(
    post,
    path = "/posts/{post_id}/comment",
    params(("post_id" = i64, Path, description = "Post id")),
    request_body(content = CommentRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Redirected to the post; the outcome is flashed"),
        (status = 404, description = "No such post")
    ),
    security(("session_cookie" = [])),
    tag = "posts"
)]
pub async fn comment(
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<i64>,
    form: web::Form<CommentRequest>,
    pool: web::Data<DbPool>,
) -> ActixResult<HttpResponse> {
    let post_id = path.into_inner();
    let location = format!("/posts/{}", post_id);

    match engagement::add_comment(pool.get_ref(), user.id(), post_id, &form.content).await {
        Ok(_) => Ok(redirect_with(
            &req,
            &location,
            "success",
            "Your comment has been added!",
        )),
        Err(ServiceError::Validation(errors)) => {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            Ok(redirect_with(
                &req,
                &location,
                "danger",
                format!("Comment not added. {}", message),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/posts/{post_id}/like",
    params(("post_id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "New like state, for JSON clients", body = LikeState),
        (status = 302, description = "Redirected back for browser clients"),
        (status = 404, description = "No such post")
    ),
    security(("session_cookie" = [])),
    tag = "posts"
)]
pub async fn like(
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> ActixResult<HttpResponse> {
    let post_id = path.into_inner();
    let state = engagement::toggle_like(pool.get_ref(), user.id(), post_id).await?;

    if wants_json(&req) {
        return Ok(HttpResponse::Ok().json(state));
    }
    let location = back_to(&req, &format!("/posts/{}", post_id));
    Ok(super::render::redirect(&location))
}

#[utoipa::path(
    post,
    path = "/posts/{post_id}/delete",
    params(("post_id" = i64, Path, description = "Post id")),
    responses(
        (status = 302, description = "Redirected home; the outcome is flashed"),
        (status = 404, description = "No such post")
    ),
    security(("session_cookie" = [])),
    tag = "posts"
)]
pub async fn delete(
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
    images: web::Data<ImageStore>,
) -> ActixResult<HttpResponse> {
    let post_id = path.into_inner();

    match posts::delete_post(pool.get_ref(), &images, user.id(), post_id).await {
        Ok(()) => Ok(redirect_with(&req, "/", "success", "Your post has been deleted!")),
        Err(ServiceError::Authorization) => Ok(redirect_with(
            &req,
            "/",
            "danger",
            "You can only delete your own posts!",
        )),
        Err(e) => Err(e.into()),
    }
}
