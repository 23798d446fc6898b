use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use serde::Deserialize;
use tera::{Context, Tera};

use super::render::page;
use crate::auth::CurrentUser;
use crate::config::Config;
use crate::db::DbPool;
use crate::models::{lenient_page, Page, PageQuery, PageRequest, UserView};
use crate::services::{feed, search, FeedPolicy};

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct SearchQuery {
    #[schema(example = "ali")]
    #[serde(default)]
    pub query: Option<String>,
    #[schema(value_type = Option<u64>, example = 1)]
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/",
    params(("page" = Option<u64>, Query, description = "Page number (default: 1)")),
    responses(
        (status = 200, description = "Personalized feed when signed in, every post otherwise", body = String, content_type = "text/html")
    ),
    tag = "feed"
)]
pub async fn index(
    req: HttpRequest,
    user: Option<CurrentUser>,
    query: web::Query<PageQuery>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    let request = PageRequest::new(query.page, config.pagination.posts_per_page);

    let (posts, heading) = match &user {
        Some(user) => {
            let policy = FeedPolicy::from(config.feed);
            let posts = feed::personalized_feed(pool.get_ref(), user.id(), policy, request).await?;
            (posts, "Your Feed")
        }
        None => (
            feed::global_feed(pool.get_ref(), None, request).await?,
            "Latest Posts",
        ),
    };

    let mut ctx = Context::new();
    ctx.insert("title", "Home");
    ctx.insert("heading", heading);
    ctx.insert("posts", &posts);
    ctx.insert("base_url", "/?");
    page(&tera, &req, user.as_deref(), "index.html", ctx)
}

#[utoipa::path(
    get,
    path = "/explore",
    params(("page" = Option<u64>, Query, description = "Page number (default: 1)")),
    responses(
        (status = 200, description = "Every post, newest first", body = String, content_type = "text/html")
    ),
    tag = "feed"
)]
pub async fn explore(
    req: HttpRequest,
    user: Option<CurrentUser>,
    query: web::Query<PageQuery>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    let request = PageRequest::new(query.page, config.pagination.posts_per_page);
    let viewer = user.as_ref().map(CurrentUser::id);
    let posts = feed::global_feed(pool.get_ref(), viewer, request).await?;

    let mut ctx = Context::new();
    ctx.insert("title", "Explore");
    ctx.insert("posts", &posts);
    ctx.insert("base_url", "/explore?");
    page(&tera, &req, user.as_deref(), "explore.html", ctx)
}

#[utoipa::path(
    get,
    path = "/search",
    params(
        ("query" = Option<String>, Query, description = "Case-sensitive username substring"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)")
    ),
    responses(
        (status = 200, description = "Matching users", body = String, content_type = "text/html")
    ),
    tag = "users"
)]
pub async fn search_users(
    req: HttpRequest,
    user: Option<CurrentUser>,
    query: web::Query<SearchQuery>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    let request = PageRequest::new(query.page, config.pagination.users_per_page);
    let term = query.query.clone().unwrap_or_default();
    let users: Page<UserView> = search::search_users(pool.get_ref(), &term, request).await?;

    let mut ctx = Context::new();
    ctx.insert("title", "Search");
    ctx.insert("query", &term);
    ctx.insert("users", &users);
    ctx.insert(
        "base_url",
        &format!("/search?query={}&", urlencoding::encode(&term)),
    );
    page(&tera, &req, user.as_deref(), "search.html", ctx)
}
