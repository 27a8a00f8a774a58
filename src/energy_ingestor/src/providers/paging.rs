//! Cursor-paged series turned into a lazy iterator.
//!
//! [`PagedSeries`] owns a fetch closure that knows how to load one page given the
//! cursor of the previous one. Pages are requested only when the buffered entries
//! run out, so dropping the iterator early (e.g. via `take_while`) bounds the
//! number of upstream requests.

use std::collections::VecDeque;

use tracing::debug;

use super::ProviderError;

/// One page of entries, already in iteration order.
#[derive(Debug)]
pub struct Page<T> {
    pub entries: Vec<T>,
    /// Cursor to pass to the next fetch.
    pub cursor: Option<String>,
    /// Whether the provider reports more entries past `cursor`.
    pub has_more: bool,
}

/// Lazy iterator over a cursor-paged upstream series.
pub struct PagedSeries<T, F>
where
    F: FnMut(Option<&str>) -> Result<Page<T>, ProviderError>,
{
    fetch: F,
    cursor: Option<String>,
    buffer: VecDeque<T>,
    has_more: bool,
    pages_fetched: usize,
}

impl<T, F> PagedSeries<T, F>
where
    F: FnMut(Option<&str>) -> Result<Page<T>, ProviderError>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            cursor: None,
            buffer: VecDeque::new(),
            has_more: true,
            pages_fetched: 0,
        }
    }

    /// Number of pages requested from upstream so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

impl<T, F> Iterator for PagedSeries<T, F>
where
    F: FnMut(Option<&str>) -> Result<Page<T>, ProviderError>,
{
    type Item = Result<T, ProviderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if !self.has_more {
                return None;
            }

            let page = match (self.fetch)(self.cursor.as_deref()) {
                Ok(page) => page,
                Err(e) => {
                    self.has_more = false;
                    return Some(Err(e));
                }
            };
            self.pages_fetched += 1;
            debug!(
                entries = page.entries.len(),
                has_more = page.has_more,
                page = self.pages_fetched,
                "fetched series page"
            );

            // A provider that keeps handing out the same cursor would loop forever.
            let stalled = page.entries.is_empty() && page.cursor == self.cursor;
            self.has_more = page.has_more && page.cursor.is_some() && !stalled;
            self.cursor = page.cursor;
            self.buffer.extend(page.entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ApiSnafu;

    fn numbered_pages(total_pages: usize) -> impl FnMut(Option<&str>) -> Result<Page<u32>, ProviderError> {
        move |cursor| {
            let idx: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let base = (idx * 2) as u32;
            Ok(Page {
                entries: vec![base, base + 1],
                cursor: Some((idx + 1).to_string()),
                has_more: idx + 1 < total_pages,
            })
        }
    }

    #[test]
    fn walks_all_pages_in_order() {
        let got: Vec<u32> = PagedSeries::new(numbered_pages(3))
            .map(Result::unwrap)
            .collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn early_stop_does_not_fetch_more_pages() {
        let mut series = PagedSeries::new(numbered_pages(100));
        let got: Vec<u32> = series.by_ref().take(3).map(Result::unwrap).collect();
        assert_eq!(got, vec![0, 1, 2]);
        assert_eq!(series.pages_fetched(), 2);
    }

    #[test]
    fn error_ends_the_series() {
        let mut calls = 0;
        let series = PagedSeries::new(|_cursor: Option<&str>| -> Result<Page<u32>, ProviderError> {
            calls += 1;
            ApiSnafu { message: "boom" }.fail()
        });
        let items: Vec<_> = series.collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn stalled_cursor_terminates() {
        let series = PagedSeries::new(|_cursor: Option<&str>| -> Result<Page<u32>, ProviderError> {
            Ok(Page {
                entries: vec![],
                cursor: None,
                has_more: true,
            })
        });
        assert_eq!(series.count(), 0);
    }
}
