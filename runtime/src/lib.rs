//! # RSVP Runtime
//!
//! The imperative shell around reducers.
//!
//! [`drive`] feeds an action into a reducer, executes the effects it returns
//! and feeds every action those effects produce back into the same reducer,
//! until nothing is left to do. State is borrowed mutably for the whole run,
//! so callers decide where state lives and how it is persisted.
//!
//! ## Example
//!
//! ```
//! use rsvp_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//! use rsvp_runtime::drive;
//!
//! enum Action {
//!     Start,
//!     Finished(u32),
//! }
//!
//! struct Fetcher;
//!
//! impl Reducer for Fetcher {
//!     type State = Option<u32>;
//!     type Action = Action;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Option<u32>, action: Action, _env: &()) -> SmallVec<[Effect<Action>; 4]> {
//!         match action {
//!             Action::Start => smallvec![Effect::future(async { Some(Action::Finished(7)) })],
//!             Action::Finished(value) => {
//!                 *state = Some(value);
//!                 SmallVec::new()
//!             },
//!         }
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let mut state = None;
//! drive(&Fetcher, &mut state, Action::Start, &()).await.unwrap();
//! assert_eq!(state, Some(7));
//! # });
//! ```

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use rsvp_core::{effect::Effect, reducer::Reducer};
use std::collections::VecDeque;

/// Retry logic with exponential backoff
pub mod retry;

/// Upper bound on reducer invocations in a single [`drive`] call.
pub const DEFAULT_STEP_LIMIT: usize = 64;

/// Errors raised by the effect driver.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    /// The reducer kept producing actions past the step limit.
    #[error("reducer did not settle after {0} steps")]
    StepLimitExceeded(usize),
}

/// Run `action` through `reducer` until no effect produces a follow-up action.
///
/// Returns the number of actions reduced, including the initial one.
///
/// # Errors
///
/// Returns [`DriveError::StepLimitExceeded`] when the feedback loop does not
/// settle within [`DEFAULT_STEP_LIMIT`] reductions.
pub async fn drive<R>(
    reducer: &R,
    state: &mut R::State,
    action: R::Action,
    env: &R::Environment,
) -> Result<usize, DriveError>
where
    R: Reducer + Sync,
    R::State: Send,
    R::Action: Send + 'static,
    R::Environment: Sync,
{
    drive_with_limit(reducer, state, action, env, DEFAULT_STEP_LIMIT).await
}

/// [`drive`] with an explicit step limit.
///
/// # Errors
///
/// Returns [`DriveError::StepLimitExceeded`] when more than `limit` actions
/// would be reduced.
#[tracing::instrument(level = "trace", skip_all, fields(limit))]
pub async fn drive_with_limit<R>(
    reducer: &R,
    state: &mut R::State,
    action: R::Action,
    env: &R::Environment,
    limit: usize,
) -> Result<usize, DriveError>
where
    R: Reducer + Sync,
    R::State: Send,
    R::Action: Send + 'static,
    R::Environment: Sync,
{
    let mut queue = VecDeque::from([action]);
    let mut steps = 0;

    while let Some(next) = queue.pop_front() {
        if steps >= limit {
            tracing::error!(steps, "Reducer did not settle");
            return Err(DriveError::StepLimitExceeded(limit));
        }
        steps += 1;

        let effects = reducer.reduce(state, next, env);
        for effect in effects {
            queue.extend(execute(effect).await);
        }
    }

    tracing::trace!(steps, "Reducer settled");
    Ok(steps)
}

/// Execute one effect and collect the actions it produces, in order.
fn execute<A>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>>
where
    A: Send + 'static,
{
    match effect {
        Effect::None => {
            metrics::counter!("runtime.effects.executed", "type" => "none").increment(1);
            async { Vec::new() }.boxed()
        },
        Effect::Future(fut) => {
            metrics::counter!("runtime.effects.executed", "type" => "future").increment(1);
            async move { fut.await.into_iter().collect() }.boxed()
        },
        Effect::Delay { duration, action } => {
            metrics::counter!("runtime.effects.executed", "type" => "delay").increment(1);
            async move {
                tokio::time::sleep(duration).await;
                vec![*action]
            }
            .boxed()
        },
        Effect::Parallel(effects) => {
            metrics::counter!("runtime.effects.executed", "type" => "parallel").increment(1);
            async move {
                join_all(effects.into_iter().map(execute))
                    .await
                    .into_iter()
                    .flatten()
                    .collect()
            }
            .boxed()
        },
        Effect::Sequential(effects) => {
            metrics::counter!("runtime.effects.executed", "type" => "sequential").increment(1);
            async move {
                let mut produced = Vec::new();
                for effect in effects {
                    produced.extend(execute(effect).await);
                }
                produced
            }
            .boxed()
        },
    }
}
