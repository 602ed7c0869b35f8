//! Bulletin listing: fetch the first page and turn it into a [`Listing`].

use bw_domain::error::{Error, Result};
use bw_domain::listing::Listing;
use bw_domain::trace::TraceEvent;

use crate::auth::SessionContext;
use crate::markup::{Document, Element};
use crate::transport::Transport;

/// Row marker: `<tr data-name="post_list">`.
pub const ROW_ATTR: (&str, &str) = ("data-name", "post_list");
/// Class fragment of the cell holding the post sequence number.
pub const ID_CELL_CLASS: &str = "bc-s-post_seq";
/// Class fragment of the cell holding the title `<span>`.
pub const TITLE_CELL_CLASS: &str = "bc-s-title";

/// Fetch the listing page with the authenticated session.
///
/// Non-2xx responses are logged and their body is returned anyway; an
/// unauthenticated page simply parses to an empty listing.
pub async fn fetch_listing<T: Transport>(session: &SessionContext<T>, url: &str) -> Result<String> {
    let resp = session.get(url).await.map_err(|e| match e {
        Error::Transport(msg) => Error::Transport(format!("listing fetch: {msg}")),
        other => other,
    })?;
    if !resp.is_success() {
        tracing::warn!(status = resp.status, url, "listing page returned non-success status");
    }
    tracing::debug!(bytes = resp.body.len(), url = %resp.url, "listing page fetched");
    Ok(resp.body)
}

/// Extract `identity → title` from a listing page.
///
/// Never fails: rows without an identity are skipped, a missing title is
/// the empty string, and a repeated identity keeps its first position with
/// the last title seen.
pub fn parse_listing(html: &str) -> Listing {
    let doc = Document::parse(html);
    let rows = doc.select(|e| e.is("tr") && e.attr(ROW_ATTR.0) == Some(ROW_ATTR.1));

    let mut listing = Listing::new();
    for row in &rows {
        let Some(id) = post_id(row) else {
            continue;
        };
        listing.insert(id, title(row));
    }

    TraceEvent::ListingParsed {
        rows: rows.len(),
        posts: listing.len(),
    }
    .emit();
    listing
}

fn cells<'a>(row: &Element<'a>, class: &'a str) -> impl Iterator<Item = Element<'a>> + 'a {
    row.descendants()
        .filter(move |e| e.is("td") && e.class_contains(class))
}

/// First direct text node of any id cell, trimmed; `None` when blank.
fn post_id(row: &Element<'_>) -> Option<String> {
    let raw = cells(row, ID_CELL_CLASS).flat_map(|td| td.own_texts()).next()?;
    let id = raw.trim();
    (!id.is_empty()).then(|| id.to_owned())
}

/// First text node, in document order, whose parent is a `<span>` inside a
/// title cell, trimmed.
fn title(row: &Element<'_>) -> String {
    cells(row, TITLE_CELL_CLASS)
        .flat_map(|td| td.texts())
        .find(|(parent, _)| parent.is("span"))
        .map(|(_, t)| t.trim().to_owned())
        .unwrap_or_default()
}
