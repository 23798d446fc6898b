use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use super::error::ServiceResult;
use crate::db::DbPool;
use crate::entities::user;
use crate::models::{Page, PageRequest, UserView};

/// Users whose username contains `query`, case-sensitively.
///
/// SQLite's LIKE ignores ASCII case, so the match uses `instr`. Only an empty
/// query yields an empty page rather than every user; whitespace is matched
/// literally like any other character.
// TODO: case-sensitive matching mirrors the existing behaviour; confirm with
// product before switching to a case-insensitive search.
pub async fn search_users(
    db: &DbPool,
    query: &str,
    request: PageRequest,
) -> ServiceResult<Page<UserView>> {
    if query.is_empty() {
        return Ok(Page::empty(request));
    }

    let contains = Expr::expr(
        Func::cust(Alias::new("instr"))
            .arg(Expr::col((user::Entity, user::Column::Username)))
            .arg(query),
    )
    .gt(0);

    let select = user::Entity::find().filter(contains);
    let total = select.clone().count(db).await?;
    if request.offset() >= total {
        return Ok(Page::new(Vec::new(), request, total));
    }

    let users = select
        .order_by_asc(user::Column::Id)
        .offset(request.offset())
        .limit(request.per_page)
        .all(db)
        .await?;

    Ok(Page::new(users, request, total).map(UserView::from))
}
