//! Success/failure propagation without panics.
//!
//! [`Outcome`] is what every validator, parser and the validation engine hand
//! back. A failure is an ordinary value: callers branch on it, they never
//! catch it.

use serde::{Deserialize, Serialize};

/// Exactly one of a computed value or a failure reason.
///
/// `Success(None)` is a success like any other; absence of a value carries no
/// failure meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome<T, E> {
    Success(T),
    Failure(E),
}

impl<T, E> Outcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(reason) => Outcome::Failure(reason),
        }
    }

    /// Like [`Outcome::map`] for conversions that can fail; an `Err` from `f`
    /// becomes the failure.
    pub fn try_map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        match self {
            Outcome::Success(value) => f(value).into(),
            Outcome::Failure(reason) => Outcome::Failure(reason),
        }
    }

    pub fn map_failure<G, F>(self, f: F) -> Outcome<T, G>
    where
        F: FnOnce(E) -> G,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(value),
            Outcome::Failure(reason) => Outcome::Failure(f(reason)),
        }
    }

    pub fn bind<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> Outcome<U, E>,
    {
        match self {
            Outcome::Success(value) => f(value),
            Outcome::Failure(reason) => Outcome::Failure(reason),
        }
    }

    pub fn match_with<R, S, F>(self, on_success: S, on_failure: F) -> R
    where
        S: FnOnce(T) -> R,
        F: FnOnce(E) -> R,
    {
        match self {
            Outcome::Success(value) => on_success(value),
            Outcome::Failure(reason) => on_failure(reason),
        }
    }

    /// The success payload, if any. Never panics.
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// The failure payload, if any. Never panics.
    pub fn failure(self) -> Option<E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(reason) => Some(reason),
        }
    }

    pub fn as_ref(&self) -> Outcome<&T, &E> {
        match self {
            Outcome::Success(value) => Outcome::Success(value),
            Outcome::Failure(reason) => Outcome::Failure(reason),
        }
    }

    pub fn value_or(self, default: T) -> T {
        match self {
            Outcome::Success(value) => value,
            Outcome::Failure(_) => default,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(reason) => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(reason) => Outcome::Failure(reason),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        outcome.into_result()
    }
}

/// Left-to-right composition: `compose(vec![f, g])(x) == g(f(x))`.
pub fn compose<'a, T: 'a>(steps: Vec<Box<dyn Fn(T) -> T + 'a>>) -> impl Fn(T) -> T + 'a {
    move |input| steps.iter().fold(input, |acc, step| step(acc))
}
