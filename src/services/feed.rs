//! Feed composition: which posts a viewer sees, in what order, one page at a
//! time. Feeds are computed per request from the follow graph; nothing is
//! materialized.

use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use std::collections::{HashMap, HashSet};

use super::error::ServiceResult;
use super::follows::followed_ids;
use crate::config::FeedConfig;
use crate::db::DbPool;
use crate::entities::{comment, like, post, user};
use crate::models::{AuthorView, Page, PageRequest, PostView};

/// Whether a user's own posts appear in their personalized feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPolicy {
    pub include_own_posts: bool,
}

impl From<FeedConfig> for FeedPolicy {
    fn from(config: FeedConfig) -> Self {
        FeedPolicy {
            include_own_posts: config.include_own_posts,
        }
    }
}

impl Default for FeedPolicy {
    fn default() -> Self {
        FeedPolicy {
            include_own_posts: true,
        }
    }
}

/// Newest first; equal timestamps fall back to insertion order.
fn newest_first(select: Select<post::Entity>) -> Select<post::Entity> {
    select
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
}

async fn paginate(
    db: &DbPool,
    select: Select<post::Entity>,
    request: PageRequest,
) -> ServiceResult<Page<post::Model>> {
    let total = select.clone().count(db).await?;
    if request.offset() >= total {
        return Ok(Page::new(Vec::new(), request, total));
    }
    let items = newest_first(select)
        .offset(request.offset())
        .limit(request.per_page)
        .all(db)
        .await?;
    Ok(Page::new(items, request, total))
}

/// Posts by the authors `viewer` follows (and the viewer's own, per `policy`).
pub async fn personalized_feed(
    db: &DbPool,
    viewer: i64,
    policy: FeedPolicy,
    request: PageRequest,
) -> ServiceResult<Page<PostView>> {
    let mut authors = followed_ids(db, viewer).await?;
    if policy.include_own_posts {
        authors.push(viewer);
    }
    if authors.is_empty() {
        return Ok(Page::empty(request));
    }

    let select = post::Entity::find().filter(post::Column::UserId.is_in(authors));
    let page = paginate(db, select, request).await?;
    decorate(db, page, Some(viewer)).await
}

/// Every post, for anonymous visitors and the explore page.
pub async fn global_feed(
    db: &DbPool,
    viewer: Option<i64>,
    request: PageRequest,
) -> ServiceResult<Page<PostView>> {
    let page = paginate(db, post::Entity::find(), request).await?;
    decorate(db, page, viewer).await
}

/// One author's posts, for their profile page.
pub async fn user_posts(
    db: &DbPool,
    author: i64,
    viewer: Option<i64>,
    request: PageRequest,
) -> ServiceResult<Page<PostView>> {
    let select = post::Entity::find().filter(post::Column::UserId.eq(author));
    let page = paginate(db, select, request).await?;
    decorate(db, page, viewer).await
}

pub async fn post_count(db: &DbPool, author: i64) -> ServiceResult<u64> {
    Ok(post::Entity::find()
        .filter(post::Column::UserId.eq(author))
        .count(db)
        .await?)
}

/// Attach authors, like/comment counts and the viewer's like state to a page
/// of posts, with one query per aggregate.
pub async fn decorate(
    db: &DbPool,
    page: Page<post::Model>,
    viewer: Option<i64>,
) -> ServiceResult<Page<PostView>> {
    let mut authors: HashMap<i64, AuthorView> = HashMap::new();
    let mut like_counts: HashMap<i64, u64> = HashMap::new();
    let mut liked_by_viewer: HashSet<i64> = HashSet::new();
    let mut comment_counts: HashMap<i64, u64> = HashMap::new();

    if !page.is_empty() {
        let post_ids: Vec<i64> = page.items.iter().map(|p| p.id).collect();
        let author_ids: HashSet<i64> = page.items.iter().map(|p| p.user_id).collect();

        for author in user::Entity::find()
            .filter(user::Column::Id.is_in(author_ids))
            .all(db)
            .await?
        {
            authors.insert(author.id, AuthorView::from(&author));
        }

        for l in like::Entity::find()
            .filter(like::Column::PostId.is_in(post_ids.clone()))
            .all(db)
            .await?
        {
            *like_counts.entry(l.post_id).or_default() += 1;
            if Some(l.user_id) == viewer {
                liked_by_viewer.insert(l.post_id);
            }
        }

        let commented: Vec<i64> = comment::Entity::find()
            .select_only()
            .column(comment::Column::PostId)
            .filter(comment::Column::PostId.is_in(post_ids))
            .into_tuple()
            .all(db)
            .await?;
        for post_id in commented {
            *comment_counts.entry(post_id).or_default() += 1;
        }
    }

    Ok(page.map(|post| {
        let author = authors
            .get(&post.user_id)
            .cloned()
            .unwrap_or_else(|| missing_author(post.user_id));
        let mut view = PostView::new(post, author);
        view.like_count = like_counts.get(&view.id).copied().unwrap_or(0);
        view.comment_count = comment_counts.get(&view.id).copied().unwrap_or(0);
        view.liked = liked_by_viewer.contains(&view.id);
        view.is_author = Some(view.author.id) == viewer;
        view
    }))
}

/// Placeholder for a post whose author row is gone; the foreign key makes
/// this unreachable in practice.
pub(crate) fn missing_author(id: i64) -> AuthorView {
    AuthorView {
        id,
        username: "[deleted]".to_string(),
        avatar: user::DEFAULT_AVATAR.to_string(),
    }
}
