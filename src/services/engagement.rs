use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

use super::error::{ServiceError, ServiceResult};
use super::feed::missing_author;
use crate::db::DbPool;
use crate::entities::{comment, like, post, user};
use crate::models::{AuthorView, CommentView, LikeState};
use crate::validation::validate_comment;

async fn ensure_post<C: ConnectionTrait>(db: &C, post_id: i64) -> ServiceResult<()> {
    post::Entity::find_by_id(post_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or(ServiceError::NotFound("post"))
}

async fn count_likes<C: ConnectionTrait>(db: &C, post_id: i64) -> ServiceResult<u64> {
    Ok(like::Entity::find()
        .filter(like::Column::PostId.eq(post_id))
        .count(db)
        .await?)
}

/// Flip `user`'s like on `post` and report the resulting state.
///
/// The delete-or-insert and the count run in one transaction, so the count
/// reflects this toggle. Two concurrent "like" toggles converge on a single
/// row through the UNIQUE (user_id, post_id) constraint.
pub async fn toggle_like(db: &DbPool, user: i64, post_id: i64) -> ServiceResult<LikeState> {
    let txn = db.begin().await?;
    ensure_post(&txn, post_id).await?;

    let removed = like::Entity::delete_many()
        .filter(like::Column::UserId.eq(user))
        .filter(like::Column::PostId.eq(post_id))
        .exec(&txn)
        .await?;

    let liked = if removed.rows_affected > 0 {
        false
    } else {
        let new_like = like::ActiveModel {
            user_id: Set(user),
            post_id: Set(post_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        like::Entity::insert(new_like)
            .on_conflict(
                OnConflict::columns([like::Column::UserId, like::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        true
    };

    let like_count = count_likes(&txn, post_id).await?;
    txn.commit().await?;

    log::debug!(
        "User {} {} post {} ({} likes)",
        user,
        if liked { "liked" } else { "unliked" },
        post_id,
        like_count
    );
    Ok(LikeState { liked, like_count })
}

pub async fn like_count(db: &DbPool, post_id: i64) -> ServiceResult<u64> {
    count_likes(db, post_id).await
}

pub async fn has_liked(db: &DbPool, user: i64, post_id: i64) -> ServiceResult<bool> {
    Ok(like::Entity::find()
        .filter(like::Column::UserId.eq(user))
        .filter(like::Column::PostId.eq(post_id))
        .one(db)
        .await?
        .is_some())
}

/// Append a comment. Comments cannot be edited or deleted afterwards.
pub async fn add_comment(
    db: &DbPool,
    user: i64,
    post_id: i64,
    content: &str,
) -> ServiceResult<comment::Model> {
    let errors = validate_comment(content);
    if !errors.is_empty() {
        return Err(ServiceError::Validation(errors));
    }
    ensure_post(db, post_id).await?;

    let new_comment = comment::ActiveModel {
        content: Set(content.to_string()),
        user_id: Set(user),
        post_id: Set(post_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let comment = new_comment.insert(db).await?;
    log::debug!("User {} commented on post {}", user, post_id);
    Ok(comment)
}

pub async fn comment_count(db: &DbPool, post_id: i64) -> ServiceResult<u64> {
    Ok(comment::Entity::find()
        .filter(comment::Column::PostId.eq(post_id))
        .count(db)
        .await?)
}

/// A post's comments, newest first, with their authors.
pub async fn comments_for(db: &DbPool, post_id: i64) -> ServiceResult<Vec<CommentView>> {
    let comments = comment::Entity::find()
        .filter(comment::Column::PostId.eq(post_id))
        .order_by_desc(comment::Column::CreatedAt)
        .order_by_desc(comment::Column::Id)
        .all(db)
        .await?;
    if comments.is_empty() {
        return Ok(Vec::new());
    }

    let author_ids: HashSet<i64> = comments.iter().map(|c| c.user_id).collect();
    let authors: HashMap<i64, AuthorView> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids))
        .all(db)
        .await?
        .iter()
        .map(|u| (u.id, AuthorView::from(u)))
        .collect();

    Ok(comments
        .into_iter()
        .map(|c| {
            let author = authors
                .get(&c.user_id)
                .cloned()
                .unwrap_or_else(|| missing_author(c.user_id));
            CommentView::new(c, author)
        })
        .collect())
}
