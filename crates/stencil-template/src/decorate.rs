/*
 * decorate.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Line decoration.
//!
//! [`decorate`] wraps each line of a sequence in a prefix and suffix, which
//! is how templates and providers comment-wrap or bullet-format blocks of
//! inserted lines. Empty lines stay empty, so decorating never turns a blank
//! line into visible content.

use std::iter::FusedIterator;

/// Wrap every non-empty item of `lines` as `prefix + item + suffix`.
///
/// The result is lazy and has the same length as `lines`. It can be cloned
/// (restarted) whenever the underlying iterator can.
///
/// ```ignore
/// let lines: Vec<String> = decorate(["", "b", ""], "> ", "").collect();
/// assert_eq!(lines, ["", "> b", ""]);
/// ```
pub fn decorate<I>(lines: I, prefix: &str, suffix: &str) -> Decorate<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Decorate {
        inner: lines.into_iter(),
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
    }
}

/// Iterator returned by [`decorate`].
#[derive(Debug, Clone)]
pub struct Decorate<I> {
    inner: I,
    prefix: String,
    suffix: String,
}

impl<I> Decorate<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    fn wrap(&self, line: I::Item) -> String {
        let line = line.as_ref();
        if line.is_empty() {
            String::new()
        } else {
            format!("{}{}{}", self.prefix, line, self.suffix)
        }
    }
}

impl<I> Iterator for Decorate<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let line = self.inner.next()?;
        Some(self.wrap(line))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<I> DoubleEndedIterator for Decorate<I>
where
    I: DoubleEndedIterator,
    I::Item: AsRef<str>,
{
    fn next_back(&mut self) -> Option<String> {
        let line = self.inner.next_back()?;
        Some(self.wrap(line))
    }
}

impl<I> ExactSizeIterator for Decorate<I>
where
    I: ExactSizeIterator,
    I::Item: AsRef<str>,
{
}

impl<I> FusedIterator for Decorate<I>
where
    I: FusedIterator,
    I::Item: AsRef<str>,
{
}
