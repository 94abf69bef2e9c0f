//! Offset/limit paging shared by the listing endpoints.

use std::time::Duration;

use playmirror_core::RemoteError;

/// Fetch pages until one comes back shorter than `page_size`.
///
/// `fetch(offset, limit)` returns one page. The loop sleeps `delay` between
/// pages; it never sleeps after the last one.
pub(crate) fn collect_pages<T, F>(
    page_size: u32,
    delay: Duration,
    mut fetch: F,
) -> Result<Vec<T>, RemoteError>
where
    F: FnMut(u64, u32) -> Result<Vec<T>, RemoteError>,
{
    let limit = page_size.max(1);
    let mut items = Vec::new();
    let mut offset = 0u64;
    loop {
        let page = fetch(offset, limit)?;
        let len = page.len();
        items.extend(page);
        if len < limit as usize {
            break;
        }
        offset += len as u64;
        tracing::debug!("fetched {} items, next offset {offset}", items.len());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages_of(total: u64) -> impl FnMut(u64, u32) -> Result<Vec<u64>, RemoteError> {
        move |offset, limit| {
            let end = (offset + u64::from(limit)).min(total);
            Ok((offset..end).collect())
        }
    }

    #[test]
    fn stops_on_short_page() {
        let mut calls = 0;
        let mut inner = pages_of(25);
        let items = collect_pages(10, Duration::ZERO, |o, l| {
            calls += 1;
            inner(o, l)
        })
        .unwrap();
        assert_eq!(items.len(), 25);
        assert_eq!(calls, 3);
        assert_eq!(items.first(), Some(&0));
        assert_eq!(items.last(), Some(&24));
    }

    #[test]
    fn exact_multiple_needs_one_empty_page() {
        let mut offsets = Vec::new();
        let mut inner = pages_of(20);
        let items = collect_pages(10, Duration::ZERO, |o, l| {
            offsets.push(o);
            inner(o, l)
        })
        .unwrap();
        assert_eq!(items.len(), 20);
        assert_eq!(offsets, vec![0, 10, 20]);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let items = collect_pages(0, Duration::ZERO, pages_of(3)).unwrap();
        assert_eq!(items, vec![0, 1, 2]);
    }

    #[test]
    fn error_aborts_listing() {
        let err = collect_pages::<u64, _>(10, Duration::ZERO, |offset, _| {
            if offset == 0 {
                Ok((0..10).collect())
            } else {
                Err(RemoteError::transport("/tracks", "reset"))
            }
        })
        .unwrap_err();
        assert!(matches!(err, RemoteError::Transport { .. }));
    }
}
