use std::future::Future;

use reqwest::header::{HeaderMap, LINK};
use url::Url;

use super::FetchError;

/// Results per page requested from list endpoints.
pub const PAGE_SIZE: usize = 100;

/// One page of a listing, and where to find the next one.
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

/// Keeps fetching pages, starting at `first`, until no next page is
/// reported. Any failed page aborts the whole listing.
pub async fn collect_pages<T, C, F, Fut>(first: C, mut fetch: F) -> Result<Vec<T>, FetchError>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<Page<T, C>, FetchError>>,
{
    let mut out = Vec::new();
    let mut page = Some(first);

    while let Some(cursor) = page {
        let Page { items, next } = fetch(cursor).await?;
        out.extend(items);
        page = next;
    }

    Ok(out)
}

/// Extracts the `rel="next"` target from a `Link` response header.
pub fn next_link(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            let links = parse_link_header::parse_with_rel(value).ok()?;
            Url::parse(&links.get("next")?.raw_uri).ok()
        })
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
