use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use super::error::{is_unique_violation, ServiceError, ServiceResult};
use super::uploads::{ImageKind, ImageStore};
use crate::auth::{hash_password, verify_password};
use crate::db::DbPool;
use crate::entities::user::{self, DEFAULT_AVATAR};
use crate::models::{NewAccount, ProfileEdit};
use crate::validation::{validate_account, validate_profile};

pub async fn find_by_id(db: &DbPool, id: i64) -> ServiceResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("user"))
}

pub async fn find_by_username(db: &DbPool, username: &str) -> ServiceResult<user::Model> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("user"))
}

async fn username_taken(db: &DbPool, username: &str) -> ServiceResult<bool> {
    Ok(user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .is_some())
}

async fn email_taken(db: &DbPool, email: &str) -> ServiceResult<bool> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
        .is_some())
}

/// Map a UNIQUE violation that slipped past the pre-checks onto the matching
/// duplicate error.
fn duplicate_from(err: sea_orm::DbErr) -> ServiceError {
    if is_unique_violation(&err) {
        if err.to_string().contains("email") {
            return ServiceError::DuplicateEmail;
        }
        return ServiceError::DuplicateUsername;
    }
    ServiceError::Database(err)
}

pub async fn register(db: &DbPool, account: NewAccount, hash_cost: u32) -> ServiceResult<user::Model> {
    let errors = validate_account(&account);
    if !errors.is_empty() {
        return Err(ServiceError::Validation(errors));
    }
    if username_taken(db, &account.username).await? {
        return Err(ServiceError::DuplicateUsername);
    }
    if email_taken(db, &account.email).await? {
        return Err(ServiceError::DuplicateEmail);
    }

    let password_hash = hash_password(&account.password, hash_cost)?;

    let new_user = user::ActiveModel {
        username: Set(account.username),
        email: Set(account.email),
        password_hash: Set(password_hash),
        bio: Set(None),
        avatar: Set(DEFAULT_AVATAR.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(db).await.map_err(duplicate_from)?;
    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Unknown usernames and wrong passwords are indistinguishable to the caller.
pub async fn authenticate(db: &DbPool, username: &str, password: &str) -> ServiceResult<user::Model> {
    let user = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    match user {
        Some(user) if verify_password(password, &user.password_hash) => Ok(user),
        _ => {
            log::info!("Failed login attempt for {:?}", username);
            Err(ServiceError::InvalidCredentials)
        }
    }
}

/// Apply a profile edit for `actor`. Uniqueness is only re-checked for fields
/// that differ from the stored values, so saving an unchanged form succeeds.
pub async fn edit_profile(
    db: &DbPool,
    images: &ImageStore,
    actor: &user::Model,
    edit: ProfileEdit,
) -> ServiceResult<user::Model> {
    let errors = validate_profile(&edit);
    if !errors.is_empty() {
        return Err(ServiceError::Validation(errors));
    }
    if edit.username != actor.username && username_taken(db, &edit.username).await? {
        return Err(ServiceError::DuplicateUsername);
    }
    if edit.email != actor.email && email_taken(db, &edit.email).await? {
        return Err(ServiceError::DuplicateEmail);
    }

    let new_avatar = match &edit.avatar {
        Some(upload) => Some(images.save(ImageKind::Avatar, upload)?),
        None => None,
    };

    let mut model: user::ActiveModel = actor.clone().into();
    model.username = Set(edit.username);
    model.email = Set(edit.email);
    model.bio = Set(edit.bio.filter(|bio| !bio.trim().is_empty()));
    if let Some(avatar) = &new_avatar {
        model.avatar = Set(avatar.clone());
    }

    let updated = match model.update(db).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(avatar) = &new_avatar {
                images.remove(ImageKind::Avatar, avatar);
            }
            return Err(duplicate_from(e));
        }
    };

    if new_avatar.is_some() && !actor.has_default_avatar() {
        images.remove(ImageKind::Avatar, &actor.avatar);
    }

    log::info!("Updated profile of user {}", updated.id);
    Ok(updated)
}
