pub mod pagination;
pub mod post;
pub mod user;

pub use pagination::*;
pub use post::*;
pub use user::*;
