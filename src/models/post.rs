use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::user::AuthorView;
use crate::entities::{comment, post};

/// A post as shown in feeds and on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: AuthorView,
    pub like_count: u64,
    pub comment_count: u64,
    pub liked: bool,
    pub is_author: bool,
}

impl PostView {
    pub fn new(post: post::Model, author: AuthorView) -> Self {
        PostView {
            id: post.id,
            content: post.content,
            image: post.image,
            created_at: post.created_at,
            author,
            like_count: 0,
            comment_count: 0,
            liked: false,
            is_author: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorView,
}

impl CommentView {
    pub fn new(comment: comment::Model, author: AuthorView) -> Self {
        CommentView {
            id: comment.id,
            content: comment.content,
            created_at: comment.created_at,
            author,
        }
    }
}

/// Post fields submitted by the create form.
#[derive(Debug, Default)]
pub struct NewPost {
    pub content: String,
    pub image: Option<Upload>,
}

/// A file received in a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FollowState {
    pub following: bool,
    pub follower_count: u64,
}
