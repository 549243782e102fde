//! Tiny parser combinators.
//!
//! Standalone utility; nothing in the transaction pipeline depends on it.
//!
//! ```
//! use txn_etl::core::parser::digit;
//!
//! let parser = digit().map(|c| c.to_digit(10).unwrap_or(0));
//! let (value, rest) = parser.parse("7xyz").success().unwrap();
//! assert_eq!(value, 7);
//! assert_eq!(rest, "xyz");
//! ```

use std::sync::Arc;

use super::outcome::Outcome;

type ParseFn<T> = dyn for<'a> Fn(&'a str) -> Outcome<(T, &'a str), String> + Send + Sync;

/// Consumes a prefix of the input, yielding a value and the unconsumed rest.
pub struct Parser<T> {
    run: Arc<ParseFn<T>>,
}

impl<T> Clone for Parser<T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T: 'static> Parser<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a str) -> Outcome<(T, &'a str), String> + Send + Sync + 'static,
    {
        Self { run: Arc::new(f) }
    }

    pub fn parse<'a>(&self, input: &'a str) -> Outcome<(T, &'a str), String> {
        (self.run)(input)
    }

    /// Transforms the parsed value; failures are passed through untouched.
    pub fn map<U, F>(self, f: F) -> Parser<U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Parser::new(move |input| self.parse(input).map(|(value, rest)| (f(value), rest)))
    }
}

/// One character satisfying `predicate`, failing with `expected` otherwise.
pub fn satisfy<P>(predicate: P, expected: impl Into<String>) -> Parser<char>
where
    P: Fn(char) -> bool + Send + Sync + 'static,
{
    let expected = expected.into();
    Parser::new(move |input: &str| {
        let mut chars = input.chars();
        match chars.next() {
            Some(c) if predicate(c) => Outcome::Success((c, chars.as_str())),
            _ => Outcome::Failure(expected.clone()),
        }
    })
}

pub fn char_parser(expected: char) -> Parser<char> {
    satisfy(move |c| c == expected, format!("Expected '{}'", expected))
}

pub fn digit() -> Parser<char> {
    satisfy(|c| c.is_ascii_digit(), "Expected digit")
}
