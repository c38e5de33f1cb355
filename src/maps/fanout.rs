//! Concurrent provider queries and how their results are joined.
//!
//! Live-traffic sampling and route comparison both fan out several provider
//! queries, but they treat failures differently. The difference is spelled
//! out as a `FanOutPolicy` so each call site states which one it wants.

use std::future::Future;

use futures_util::future::join_all;
use log::warn;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutPolicy {
    /// Failed branches are logged and dropped; the call still succeeds.
    BestEffort,
    /// Any failed branch fails the whole call (first failure in input order).
    AllOrNothing,
}

/// Run every labelled task concurrently and join the results under `policy`.
///
/// All branches run to completion before the policy is applied; nothing is
/// cancelled early. Output order matches input order.
pub async fn fan_out<T, F>(
    policy: FanOutPolicy,
    tasks: Vec<(String, F)>,
) -> Result<Vec<(String, T)>>
where
    F: Future<Output = Result<T>>,
{
    let (labels, futures): (Vec<String>, Vec<F>) = tasks.into_iter().unzip();
    let results = join_all(futures).await;

    let mut joined = Vec::with_capacity(results.len());
    for (label, result) in labels.into_iter().zip(results) {
        match (policy, result) {
            (_, Ok(value)) => joined.push((label, value)),
            (FanOutPolicy::AllOrNothing, Err(e)) => return Err(e),
            (FanOutPolicy::BestEffort, Err(e)) => {
                warn!("[FanOut] {} failed, omitting from results: {}", label, e);
            }
        }
    }
    Ok(joined)
}
