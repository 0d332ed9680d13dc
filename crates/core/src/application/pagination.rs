// Pagination helper

use crate::domain::Page;
use crate::error::Result;
use std::future::Future;

/// Walk a paginated collection from page 0 until `has_next_page` is false
///
/// Pages are concatenated in the order they arrive. An empty page stops the
/// walk even if the platform claims there is more.
pub async fn collect_pages<T, F, Fut>(limit: u32, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut all = Vec::new();
    let mut page = 0;

    loop {
        let batch = fetch(page, limit).await?;
        let more = batch.has_next_page && !batch.data.is_empty();
        all.extend(batch.data);
        if !more {
            break;
        }
        page += 1;
    }

    Ok(all)
}
