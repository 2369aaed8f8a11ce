//! Run-order scheduling
//!
//! Items sharing a run order form a group. Groups execute strictly in ascending
//! order; items inside a group execute concurrently. The first failure in a group
//! aborts the remaining groups. Siblings already started in the failing group are
//! not cancelled: each item runs on its own task, and dropping a `JoinHandle`
//! detaches rather than aborts it.

use crate::error::{DeploymentError, Result};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::future::Future;
use tracing::debug;

/// Anything carrying an integer run order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOrderItem<T> {
    pub order: i32,
    pub item: T,
}

impl<T> RunOrderItem<T> {
    pub fn new(order: i32, item: T) -> Self {
        Self { order, item }
    }
}

/// Items that execute together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOrderGroup<T> {
    pub order: i32,
    pub items: Vec<T>,
}

/// Group items by run order, ascending. Input order is preserved within a group.
pub fn group_by_run_order<T>(
    items: impl IntoIterator<Item = RunOrderItem<T>>,
) -> Vec<RunOrderGroup<T>> {
    let mut groups: BTreeMap<i32, Vec<T>> = BTreeMap::new();
    for RunOrderItem { order, item } in items {
        groups.entry(order).or_default().push(item);
    }
    groups
        .into_iter()
        .map(|(order, items)| RunOrderGroup { order, items })
        .collect()
}

/// Run every item of one group concurrently.
///
/// Results come back in item order. Returns on the first failure.
pub async fn execute_group<T, R, F, Fut>(items: Vec<T>, executor: &F) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let handles: Vec<_> = items
        .into_iter()
        .map(|item| tokio::spawn(executor(item)))
        .collect();

    try_join_all(handles.into_iter().map(|handle| async move {
        match handle.await {
            Ok(result) => result,
            Err(e) => Err(DeploymentError::TaskJoin(e.to_string())),
        }
    }))
    .await
}

/// Run groups one after another, flattening their results in execution order
pub async fn execute_groups<T, R, F, Fut>(
    groups: Vec<RunOrderGroup<T>>,
    executor: F,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let mut results = Vec::new();
    for group in groups {
        debug!(order = group.order, items = group.items.len(), "Executing run-order group");
        results.extend(execute_group(group.items, &executor).await?);
    }
    Ok(results)
}

/// Group then execute
pub async fn run_in_order<T, R, F, Fut>(
    items: impl IntoIterator<Item = RunOrderItem<T>>,
    executor: F,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    execute_groups(group_by_run_order(items), executor).await
}
