//! # Lazy Values and Combinators
//!
//! A [`Future`] wraps either a known outcome or a zero-argument producer that
//! runs the first time the value is observed. The outcome, success or
//! failure, is computed once and replayed to every later observer.
//!
//! These are not `std::future::Future`s: nothing is polled and nothing runs
//! in the background. Evaluation happens synchronously inside [`Future::get`],
//! which is the only place any blocking occurs. Handing out clones of one
//! `Future` is how several logical callers share a single computation.
//!
//! ## Combinators
//!
//! - [`Future::then`] / [`Future::then_or_else`]: transform a success, and
//!   optionally absorb a failure.
//! - [`all`] / [`all_except`]: force every value in order.
//! - [`race`]: force values in order and keep the first success.
//!
//! `except_pass` lists name the [`ErrorKind`]s a combinator tolerates rather
//! than propagates.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{Error, ErrorKind, Result};

type Producer<T> = Box<dyn FnOnce() -> Result<T> + Send>;

enum State<T> {
    Pending(Producer<T>),
    Running,
    Done(Result<T>),
}

/// A lazy, memoized, single-evaluation value.
///
/// The internal lock is held while the producer runs, so observers on other
/// threads wait for the one evaluation instead of starting their own. A
/// producer must not observe the `Future` it belongs to.
pub struct Future<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.state.try_lock() {
            Ok(state) => match *state {
                State::Pending(_) => "pending",
                State::Running => "running",
                State::Done(Ok(_)) => "resolved",
                State::Done(Err(_)) => "failed",
            },
            Err(_) => "running",
        };
        f.debug_struct("Future").field("status", &status).finish()
    }
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Create a value whose producer runs on first observation.
    pub fn new<F>(producer: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self::with_state(State::Pending(Box::new(producer)))
    }

    /// Create an already-resolved value.
    pub fn ready(value: T) -> Self {
        Self::with_state(State::Done(Ok(value)))
    }

    /// Create an already-failed value.
    pub fn failed(error: Error) -> Self {
        Self::with_state(State::Done(Err(error)))
    }

    fn with_state(state: State<T>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Force evaluation and return the value, or the captured error.
    pub fn get(&self) -> Result<T> {
        let mut state = self.state.lock().map_err(|_| Error::LockPoisoned {
            context: "lazy value".to_string(),
        })?;

        match std::mem::replace(&mut *state, State::Running) {
            State::Pending(producer) => {
                let outcome = producer();
                *state = State::Done(outcome.clone());
                outcome
            }
            State::Done(outcome) => {
                *state = State::Done(outcome.clone());
                outcome
            }
            State::Running => Err(Error::LockPoisoned {
                context: "lazy value evaluation was interrupted".to_string(),
            }),
        }
    }

    /// Whether the outcome has already been computed.
    pub fn is_settled(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(*state, State::Done(_)))
            .unwrap_or(false)
    }

    /// Apply `transform` to the value once it resolves. Failures propagate.
    pub fn then<U, F>(&self, transform: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let source = self.clone();
        Future::new(move || transform(source.get()?))
    }

    /// Like [`Future::then`], but `on_error` absorbs a failure and supplies
    /// the replacement outcome.
    pub fn then_or_else<U, F, H>(&self, transform: F, on_error: H) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
        H: FnOnce(Error) -> Result<U> + Send + 'static,
    {
        let source = self.clone();
        Future::new(move || match source.get() {
            Ok(value) => transform(value),
            Err(error) => on_error(error),
        })
    }
}

/// Force every value in order; the first error aborts the aggregate.
pub fn all<T>(futures: Vec<Future<T>>) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
{
    Future::new(move || futures.iter().map(Future::get).collect())
}

/// Force every value in order. Errors whose kind is in `except_pass` leave a
/// `None` in that slot; any other error aborts the aggregate.
pub fn all_except<T>(futures: Vec<Future<T>>, except_pass: &[ErrorKind]) -> Future<Vec<Option<T>>>
where
    T: Clone + Send + 'static,
{
    let except_pass = except_pass.to_vec();
    Future::new(move || {
        let mut values = Vec::with_capacity(futures.len());
        for future in &futures {
            match future.get() {
                Ok(value) => values.push(Some(value)),
                Err(error) if error.is_any_of(&except_pass) => values.push(None),
                Err(error) => return Err(error),
            }
        }
        Ok(values)
    })
}

/// Force values strictly in argument order and resolve to the first success.
///
/// An error in `except_pass` moves on to the next candidate; when every
/// candidate fails that way the last error propagates. Any other error
/// propagates immediately and later candidates are never forced. An empty
/// race fails with `NotFound`.
pub fn race<T>(futures: Vec<Future<T>>, except_pass: &[ErrorKind]) -> Future<T>
where
    T: Clone + Send + 'static,
{
    let except_pass = except_pass.to_vec();
    Future::new(move || {
        let mut last_error = None;
        for future in &futures {
            match future.get() {
                Ok(value) => return Ok(value),
                Err(error) if error.is_any_of(&except_pass) => last_error = Some(error),
                Err(error) => return Err(error),
            }
        }
        Err(last_error.unwrap_or_else(|| Error::not_found("no candidates to race")))
    })
}
