use crate::core::{collect_pages, UserDirectory};
use crate::domain::model::UserSummary;
use crate::utils::error::Result;

pub async fn list_users<D: UserDirectory>(directory: &D, pool_id: &str) -> Result<Vec<UserSummary>> {
    let mut users =
        collect_pages(None, move |token| directory.list_users_page(pool_id, token)).await?;
    users.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(users)
}
