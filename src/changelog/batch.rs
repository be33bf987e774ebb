use futures::future::try_join_all;
use std::future::Future;

use crate::error::Result;

/// Number of requests allowed in flight at once against the platform.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Maps `f` over `items` in fixed-width batches.
///
/// Calls inside a batch run concurrently, batches run one after another and
/// results keep the input order. The first failure stops the remaining batches.
/// A width of zero is treated as one.
pub async fn batched<T, R, F, Fut>(items: Vec<T>, width: usize, f: F) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let width = width.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let batch: Vec<Fut> = items.by_ref().take(width).map(&f).collect();
        results.extend(try_join_all(batch).await?);
    }

    Ok(results)
}
