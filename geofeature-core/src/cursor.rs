//! Forward-only result cursors.

use std::fmt;
use std::sync::Arc;

use crate::{Feature, FeatureSet, StoreError};

/// A lazy, forward-only, non-restartable stream of query results.
///
/// The cursor owns snapshots of the candidate records and holds no lock on
/// the store. Close it when done to release them early; closing is also
/// implied by dropping.
///
/// # Examples
///
/// ```
/// use geofeature_core::{Cursor, StoreError};
///
/// let mut cursor = Cursor::new(vec![1, 2, 3].into_iter());
/// assert_eq!(cursor.next(), Some(1));
/// cursor.close();
/// assert!(matches!(cursor.try_next(), Err(StoreError::IllegalState { .. })));
/// ```
pub struct Cursor<T> {
    inner: Option<Box<dyn Iterator<Item = T> + Send>>,
}

/// Cursor over features.
pub type FeatureCursor = Cursor<Arc<Feature>>;

/// Cursor over feature sets.
pub type FeatureSetCursor = Cursor<Arc<FeatureSet>>;

impl<T> Cursor<T> {
    /// Wrap an iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        Self {
            inner: Some(Box::new(iter)),
        }
    }

    /// A cursor with no results.
    #[must_use]
    pub fn empty() -> Self
    where
        T: Send + 'static,
    {
        Self::new(std::iter::empty())
    }

    /// Advance, failing if the cursor was closed.
    ///
    /// # Errors
    ///
    /// [`StoreError::IllegalState`] after [`Cursor::close`].
    pub fn try_next(&mut self) -> Result<Option<T>, StoreError> {
        match self.inner.as_mut() {
            Some(iter) => Ok(iter.next()),
            None => Err(StoreError::IllegalState {
                reason: "cursor is closed",
            }),
        }
    }

    /// Release the underlying snapshots.
    pub fn close(&mut self) {
        self.inner = None;
    }

    /// Whether [`Cursor::close`] was called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<T> Iterator for Cursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.as_mut().and_then(Iterator::next)
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn closed_cursor_yields_nothing() {
        let mut cursor = Cursor::new(0..3);
        cursor.close();
        assert!(cursor.is_closed());
        assert_eq!(cursor.next(), None);
    }

    #[rstest]
    fn empty_cursor_is_open_but_exhausted() {
        let mut cursor: Cursor<u8> = Cursor::empty();
        assert!(!cursor.is_closed());
        assert_eq!(cursor.try_next(), Ok(None));
    }

    #[rstest]
    fn cursor_is_not_restartable() {
        let mut cursor = Cursor::new(0..2);
        assert_eq!(cursor.by_ref().count(), 2);
        assert_eq!(cursor.try_next(), Ok(None));
    }
}
