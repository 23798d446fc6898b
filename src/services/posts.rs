use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};

use super::error::{ServiceError, ServiceResult};
use super::feed::decorate;
use super::uploads::{ImageKind, ImageStore};
use crate::db::DbPool;
use crate::entities::{comment, like, post};
use crate::models::{NewPost, Page, PageRequest, PostView};
use crate::validation::validate_post;

pub async fn create_post(
    db: &DbPool,
    images: &ImageStore,
    author: i64,
    new_post: NewPost,
) -> ServiceResult<post::Model> {
    let errors = validate_post(&new_post);
    if !errors.is_empty() {
        return Err(ServiceError::Validation(errors));
    }

    let image = match &new_post.image {
        Some(upload) => Some(images.save(ImageKind::Post, upload)?),
        None => None,
    };

    let model = post::ActiveModel {
        content: Set(new_post.content),
        image: Set(image.clone()),
        user_id: Set(author),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(post) => {
            log::info!("User {} created post {}", author, post.id);
            Ok(post)
        }
        Err(e) => {
            if let Some(image) = &image {
                images.remove(ImageKind::Post, image);
            }
            Err(e.into())
        }
    }
}

pub async fn find_post(db: &DbPool, id: i64) -> ServiceResult<post::Model> {
    post::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("post"))
}

/// A single post decorated for `viewer`, as shown on its detail page.
pub async fn post_view(db: &DbPool, id: i64, viewer: Option<i64>) -> ServiceResult<PostView> {
    let post = find_post(db, id).await?;
    let page = Page::new(vec![post], PageRequest::new(None, 1), 1);
    let mut page = decorate(db, page, viewer).await?;
    page.items.pop().ok_or(ServiceError::NotFound("post"))
}

/// Delete `id` on behalf of `actor`, together with its likes and comments.
/// The image file is removed only after the rows are gone.
pub async fn delete_post(
    db: &DbPool,
    images: &ImageStore,
    actor: i64,
    id: i64,
) -> ServiceResult<()> {
    let post = find_post(db, id).await?;
    if post.user_id != actor {
        log::warn!("User {} tried to delete post {} of user {}", actor, id, post.user_id);
        return Err(ServiceError::Authorization);
    }

    let txn = db.begin().await?;
    like::Entity::delete_many()
        .filter(like::Column::PostId.eq(id))
        .exec(&txn)
        .await?;
    comment::Entity::delete_many()
        .filter(comment::Column::PostId.eq(id))
        .exec(&txn)
        .await?;
    post::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    if let Some(image) = &post.image {
        images.remove(ImageKind::Post, image);
    }

    log::info!("User {} deleted post {}", actor, id);
    Ok(())
}
