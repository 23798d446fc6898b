pub mod accounts;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod follows;
pub mod posts;
pub mod search;
pub mod uploads;

pub use error::{ServiceError, ServiceResult};
pub use feed::FeedPolicy;
pub use uploads::{ImageKind, ImageStore};
