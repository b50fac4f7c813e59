//! # Catalog Paginator
//!
//! Walks a marketplace catalog listing to the end and collects every offer
//! id of one campaign.
//!
//! The listing is modelled as a lazy stream of pages ([`CatalogPaginator::pages`]).
//! Each page's request depends on the previous response (cursor token or
//! last id), so pages are always fetched one after another. When to stop is
//! decided by [`next_cursor`], which only looks at the page just received and
//! can be tested without any HTTP layer.
//!
//! A failed page aborts the whole listing. There is no partial catalog.

use bridge_traits::marketplace::{
    CampaignContext, CatalogOfferId, CatalogPage, CatalogSource, PaginationPolicy,
};
use futures::stream::{self, Stream, TryStreamExt};
use tracing::debug;

use crate::catalog::CatalogOfferSet;
use crate::error::{Result, SyncError};

/// What to request after a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Request another page with this token.
    Continue(String),
    /// The listing is complete.
    Finished,
}

/// One page as seen by the paginator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// 1-based page number.
    pub number: u32,
    pub offer_ids: Vec<CatalogOfferId>,
    /// Items received so far, this page included.
    pub accumulated: u64,
    /// Total reported by the endpoint, if any.
    pub total: Option<u64>,
}

/// Termination predicate for both pagination policies.
///
/// - Cursor: continue while the page carries a non-empty next token.
/// - Total count: continue until `accumulated` reaches the reported total.
///   An empty page or a missing next token before that point means the
///   listing cannot reach the total and is reported as
///   [`SyncError::IncompleteCatalog`]. An empty token would restart the
///   listing from the first page.
pub fn next_cursor(
    policy: PaginationPolicy,
    page: &CatalogPage,
    accumulated: u64,
    page_number: u32,
) -> Result<PageCursor> {
    match policy {
        PaginationPolicy::Cursor => Ok(page
            .next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| PageCursor::Continue(token.to_string()))
            .unwrap_or(PageCursor::Finished)),
        PaginationPolicy::TotalCount => {
            let total = page.total.ok_or(SyncError::MissingCatalogTotal { page: page_number })?;
            if accumulated >= total {
                return Ok(PageCursor::Finished);
            }
            match page.next_page_token.as_deref() {
                Some(token) if !token.is_empty() && !page.offer_ids.is_empty() => {
                    Ok(PageCursor::Continue(token.to_string()))
                }
                _ => Err(SyncError::IncompleteCatalog {
                    received: accumulated,
                    total,
                }),
            }
        }
    }
}

enum PagerState {
    Pending {
        token: String,
        number: u32,
        accumulated: u64,
    },
    Exhausted,
}

/// Sequential reader of one campaign's catalog listing.
pub struct CatalogPaginator<'a, S: ?Sized> {
    source: &'a S,
    campaign: &'a CampaignContext,
}

impl<'a, S> CatalogPaginator<'a, S>
where
    S: CatalogSource + ?Sized,
{
    pub fn new(source: &'a S, campaign: &'a CampaignContext) -> Self {
        Self { source, campaign }
    }

    /// Lazy stream of pages starting from the first one.
    ///
    /// Every call starts a fresh listing. The stream ends after the page for
    /// which [`next_cursor`] returns [`PageCursor::Finished`], or after the
    /// first error.
    pub fn pages(&self) -> impl Stream<Item = Result<FetchedPage>> + Send + 'a {
        let source = self.source;
        let campaign = self.campaign;
        let policy = source.pagination_policy();
        let initial = PagerState::Pending {
            token: String::new(),
            number: 1,
            accumulated: 0,
        };

        stream::try_unfold(initial, move |state| async move {
            let PagerState::Pending {
                token,
                number,
                accumulated,
            } = state
            else {
                return Ok::<_, SyncError>(None);
            };

            debug!(page = number, campaign_id = %campaign.campaign_id, "Fetching catalog page");
            let page = source
                .fetch_catalog_page(&token, campaign)
                .await
                .map_err(|err| SyncError::CatalogFetchFailed {
                    page: number,
                    source: err,
                })?;

            let accumulated = accumulated + page.offer_ids.len() as u64;
            let next = match next_cursor(policy, &page, accumulated, number)? {
                PageCursor::Continue(token) => PagerState::Pending {
                    token,
                    number: number + 1,
                    accumulated,
                },
                PageCursor::Finished => PagerState::Exhausted,
            };

            let fetched = FetchedPage {
                number,
                offer_ids: page.offer_ids,
                accumulated,
                total: page.total,
            };
            Ok::<_, SyncError>(Some((fetched, next)))
        })
    }

    /// Every distinct offer id of the campaign.
    pub async fn fetch_all_offer_ids(&self) -> Result<CatalogOfferSet> {
        self.pages()
            .try_fold(CatalogOfferSet::new(), |mut catalog, page| async move {
                catalog.extend(page.offer_ids);
                Ok::<_, SyncError>(catalog)
            })
            .await
    }
}
