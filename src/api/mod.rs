pub mod auth;
pub mod feed;
pub mod flash;
pub mod form;
pub mod media;
pub mod posts;
pub mod render;
pub mod users;

use crate::models::{CommentRequest, FollowState, LikeState, LoginRequest, PageQuery, RegisterRequest};
use actix_web::web;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Feed and search pages
        feed::index,
        feed::explore,
        feed::search_users,
        // Auth endpoints
        auth::register_form,
        auth::register,
        auth::login_form,
        auth::login,
        auth::logout,
        // Post endpoints
        posts::create_form,
        posts::create,
        posts::detail,
        posts::comment,
        posts::like,
        posts::delete,
        // User endpoints
        users::profile,
        users::edit_profile_form,
        users::edit_profile,
        users::follow,
        users::unfollow,
        // Uploaded files
        media::uploaded_image,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        CommentRequest,
        LikeState,
        FollowState,
        PageQuery,
        feed::SearchQuery,
    )),
    tags(
        (name = "feed", description = "Home feed and explore pages"),
        (name = "auth", description = "Registration and session endpoints"),
        (name = "posts", description = "Posts, comments and likes"),
        (name = "users", description = "Profiles, search and the follow graph"),
        (name = "media", description = "Uploaded images"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Cookie(
                        utoipa::openapi::security::ApiKeyValue::new(crate::auth::SESSION_COOKIE),
                    ),
                ),
            )
        }
    }
}

/// Every route of the site. Literal paths are registered before the
/// `{username}` and `{post_id}` captures they would otherwise collide with.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(feed::index))
        .route("/index", web::get().to(feed::index))
        .route("/explore", web::get().to(feed::explore))
        .route("/search", web::get().to(feed::search_users))
        .service(
            web::scope("/auth")
                .route("/register", web::get().to(auth::register_form))
                .route("/register", web::post().to(auth::register))
                .route("/login", web::get().to(auth::login_form))
                .route("/login", web::post().to(auth::login))
                .route("/logout", web::get().to(auth::logout)),
        )
        .service(
            web::scope("/posts")
                .route("/create", web::get().to(posts::create_form))
                .route("/create", web::post().to(posts::create))
                .route("/{post_id}", web::get().to(posts::detail))
                .route("/{post_id}/comment", web::post().to(posts::comment))
                .route("/{post_id}/like", web::post().to(posts::like))
                .route("/{post_id}/delete", web::post().to(posts::delete)),
        )
        .service(
            web::scope("/users")
                .route("/edit_profile", web::get().to(users::edit_profile_form))
                .route("/edit_profile", web::post().to(users::edit_profile))
                .route("/follow/{username}", web::post().to(users::follow))
                .route("/unfollow/{username}", web::post().to(users::unfollow))
                .route("/{username}", web::get().to(users::profile)),
        )
        .route(
            "/static/uploads/{folder}/{filename}",
            web::get().to(media::uploaded_image),
        )
        .route(
            "/api/docs",
            web::get().to(|| async {
                actix_web::HttpResponse::PermanentRedirect()
                    .append_header(("Location", "/api/docs/"))
                    .finish()
            }),
        )
        .service(
            SwaggerUi::new("/api/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
}
