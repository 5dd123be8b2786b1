//! Pagination cursor: the per-parent crawl state machine
//!
//! `Start → Fetching(url) → (parsed) → Fetching(next) | Done | Aborted`
//!
//! The cursor itself never touches the network; the backfill driver fetches
//! and parses, then feeds each outcome back in. Every edge case is a named
//! transition: a repeated page is `Done` (cycle), the page ceiling is
//! `Aborted`, a fetch failure is `Aborted`.

use crate::url::ItemIdentity;
use std::collections::HashSet;
use url::Url;

/// Why a walk ended before pagination ran out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Hard ceiling on pages reached; bounds worst-case cost independent of
    /// cycle detection
    PageCapReached,
    /// A page fetch or parse failed
    PageFailed(String),
}

impl AbortReason {
    pub fn describe(&self) -> String {
        match self {
            Self::PageCapReached => "page cap reached".to_string(),
            Self::PageFailed(reason) => reason.clone(),
        }
    }
}

/// Cursor state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    Start,
    Fetching(Url),
    Done,
    Aborted(AbortReason),
}

/// Walks one parent's paginated listing
pub struct CrawlCursor {
    seed: Url,
    state: CursorState,
    /// Identities of pages already visited (cycle protection)
    visited: HashSet<ItemIdentity>,
    page_cap: u32,
    pages_parsed: u32,
    items_found: u32,
}

impl CrawlCursor {
    pub fn new(seed: Url, page_cap: u32) -> Self {
        Self {
            seed,
            state: CursorState::Start,
            visited: HashSet::new(),
            page_cap: page_cap.max(1),
            pages_parsed: 0,
            items_found: 0,
        }
    }

    /// Returns the page to fetch next, or None when the walk has ended.
    ///
    /// The first call transitions `Start → Fetching(seed)`.
    pub fn next_target(&mut self) -> Option<Url> {
        match &self.state {
            CursorState::Start => {
                let seed = self.seed.clone();
                self.visited.insert(ItemIdentity::of(&seed));
                self.state = CursorState::Fetching(seed.clone());
                Some(seed)
            }
            CursorState::Fetching(url) => Some(url.clone()),
            CursorState::Done | CursorState::Aborted(_) => None,
        }
    }

    /// Feeds back a successfully parsed page.
    ///
    /// `next_page` must already be resolved against the page it was found
    /// on. A candidate page seen before forces `Done`; the page ceiling
    /// forces `Aborted`.
    pub fn on_parsed(&mut self, item_count: u32, next_page: Option<Url>) {
        debug_assert!(matches!(self.state, CursorState::Fetching(_)));

        self.pages_parsed += 1;
        self.items_found += item_count;

        match next_page {
            None => {
                self.state = CursorState::Done;
            }
            Some(next) => {
                let identity = ItemIdentity::of(&next);
                if self.visited.contains(&identity) {
                    tracing::debug!("Pagination cycle at {}, ending walk", next);
                    self.state = CursorState::Done;
                } else if self.pages_parsed >= self.page_cap {
                    self.state = CursorState::Aborted(AbortReason::PageCapReached);
                } else {
                    self.visited.insert(identity);
                    self.state = CursorState::Fetching(next);
                }
            }
        }
    }

    /// Feeds back a failed page fetch or parse.
    pub fn on_failed(&mut self, reason: String) {
        self.state = CursorState::Aborted(AbortReason::PageFailed(reason));
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn pages_parsed(&self) -> u32 {
        self.pages_parsed
    }

    pub fn items_found(&self) -> u32 {
        self.items_found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn seed() -> Url {
        url("https://testdev.example.com/")
    }

    #[test]
    fn test_first_target_is_seed() {
        let mut cursor = CrawlCursor::new(seed(), 50);
        assert_eq!(cursor.state(), &CursorState::Start);
        assert_eq!(cursor.next_target(), Some(seed()));
        assert!(matches!(cursor.state(), CursorState::Fetching(_)));
    }

    #[test]
    fn test_acyclic_chain_reaches_done_in_chain_length() {
        let mut cursor = CrawlCursor::new(seed(), 50);
        let pages = [
            url("https://testdev.example.com/?page=2"),
            url("https://testdev.example.com/?page=3"),
        ];

        let mut fetches = 0;
        let mut next_iter = pages.iter();
        while cursor.next_target().is_some() {
            fetches += 1;
            cursor.on_parsed(5, next_iter.next().cloned());
        }

        assert_eq!(fetches, 3);
        assert_eq!(cursor.state(), &CursorState::Done);
        assert_eq!(cursor.pages_parsed(), 3);
        assert_eq!(cursor.items_found(), 15);
    }

    #[test]
    fn test_cycle_forces_done() {
        let mut cursor = CrawlCursor::new(seed(), 50);
        let page2 = url("https://testdev.example.com/?page=2");

        cursor.next_target().unwrap();
        cursor.on_parsed(3, Some(page2.clone()));
        cursor.next_target().unwrap();
        // Page 2 links back to the seed.
        cursor.on_parsed(3, Some(seed()));

        assert_eq!(cursor.state(), &CursorState::Done);
        assert_eq!(cursor.pages_parsed(), 2);
    }

    #[test]
    fn test_self_link_forces_done() {
        let mut cursor = CrawlCursor::new(seed(), 50);
        cursor.next_target().unwrap();
        cursor.on_parsed(2, Some(seed()));
        assert_eq!(cursor.state(), &CursorState::Done);
    }

    #[test]
    fn test_cycle_detection_sees_equivalent_spellings() {
        let mut cursor = CrawlCursor::new(url("https://testdev.example.com/games"), 50);
        cursor.next_target().unwrap();
        // Same page, different spelling: trailing slash + tracking param.
        let respelled = crate::url::normalize_url(
            "https://TESTDEV.example.com/games/?utm_source=pagination",
        )
        .unwrap();
        cursor.on_parsed(2, Some(respelled));
        assert_eq!(cursor.state(), &CursorState::Done);
    }

    #[test]
    fn test_page_cap_forces_aborted() {
        let mut cursor = CrawlCursor::new(seed(), 3);

        let mut fetches = 0;
        let mut page = 2;
        while cursor.next_target().is_some() {
            fetches += 1;
            let next = url(&format!("https://testdev.example.com/?page={}", page));
            page += 1;
            cursor.on_parsed(1, Some(next));
        }

        assert_eq!(fetches, 3);
        assert_eq!(
            cursor.state(),
            &CursorState::Aborted(AbortReason::PageCapReached)
        );
    }

    #[test]
    fn test_cyclic_chain_never_exceeds_cap() {
        // A two-page cycle under a large cap: ends via cycle detection.
        let mut cursor = CrawlCursor::new(seed(), 50);
        let page2 = url("https://testdev.example.com/?page=2");

        let mut fetches = 0;
        let mut next = Some(page2);
        while cursor.next_target().is_some() {
            fetches += 1;
            cursor.on_parsed(1, next.take().or(Some(seed())));
        }

        assert!(fetches <= 50);
        assert_eq!(cursor.state(), &CursorState::Done);
    }

    #[test]
    fn test_fetch_failure_aborts() {
        let mut cursor = CrawlCursor::new(seed(), 50);
        cursor.next_target().unwrap();
        cursor.on_failed("retries exhausted".to_string());

        assert_eq!(
            cursor.state(),
            &CursorState::Aborted(AbortReason::PageFailed("retries exhausted".to_string()))
        );
        assert_eq!(cursor.pages_parsed(), 0);
        assert!(cursor.next_target().is_none());
    }

    #[test]
    fn test_no_next_target_after_done() {
        let mut cursor = CrawlCursor::new(seed(), 50);
        cursor.next_target().unwrap();
        cursor.on_parsed(0, None);
        assert_eq!(cursor.state(), &CursorState::Done);
        assert!(cursor.next_target().is_none());
    }
}
