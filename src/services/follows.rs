use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set};

use super::error::{ServiceError, ServiceResult};
use crate::db::DbPool;
use crate::entities::follow;
use crate::models::FollowState;

/// Create the edge `actor -> target`. Following someone twice is a no-op;
/// the primary key on (follower_id, followed_id) absorbs concurrent repeats.
pub async fn follow(db: &DbPool, actor: i64, target: i64) -> ServiceResult<FollowState> {
    if actor == target {
        return Err(ServiceError::SelfFollow);
    }

    let edge = follow::ActiveModel {
        follower_id: Set(actor),
        followed_id: Set(target),
        created_at: Set(Utc::now()),
    };
    let inserted = follow::Entity::insert(edge)
        .on_conflict(
            OnConflict::columns([follow::Column::FollowerId, follow::Column::FollowedId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if inserted > 0 {
        log::info!("User {} followed {}", actor, target);
    }

    Ok(FollowState {
        following: true,
        follower_count: follower_count(db, target).await?,
    })
}

/// Remove the edge `actor -> target` if it exists.
pub async fn unfollow(db: &DbPool, actor: i64, target: i64) -> ServiceResult<FollowState> {
    if actor == target {
        return Err(ServiceError::SelfUnfollow);
    }

    let removed = follow::Entity::delete_many()
        .filter(follow::Column::FollowerId.eq(actor))
        .filter(follow::Column::FollowedId.eq(target))
        .exec(db)
        .await?;

    if removed.rows_affected > 0 {
        log::info!("User {} unfollowed {}", actor, target);
    }

    Ok(FollowState {
        following: false,
        follower_count: follower_count(db, target).await?,
    })
}

pub async fn is_following(db: &DbPool, follower: i64, followed: i64) -> ServiceResult<bool> {
    Ok(follow::Entity::find_by_id((follower, followed))
        .one(db)
        .await?
        .is_some())
}

pub async fn follower_count(db: &DbPool, user: i64) -> ServiceResult<u64> {
    Ok(follow::Entity::find()
        .filter(follow::Column::FollowedId.eq(user))
        .count(db)
        .await?)
}

pub async fn following_count(db: &DbPool, user: i64) -> ServiceResult<u64> {
    Ok(follow::Entity::find()
        .filter(follow::Column::FollowerId.eq(user))
        .count(db)
        .await?)
}

/// Ids of every user `user` follows.
pub async fn followed_ids(db: &DbPool, user: i64) -> ServiceResult<Vec<i64>> {
    Ok(follow::Entity::find()
        .select_only()
        .column(follow::Column::FollowedId)
        .filter(follow::Column::FollowerId.eq(user))
        .into_tuple::<i64>()
        .all(db)
        .await?)
}
