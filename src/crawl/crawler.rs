use crate::crawl::cleaner::HtmlCleaner;
use crate::crawl::fetcher::Fetcher;
use crate::index::{InvertedIndex, ThreadSafeIndex};
use crate::sync::WorkQueue;
use crate::utils::{Normalizer, TextNormalizer};
use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use url::Url;

/// Counters reported after a crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// URLs ever admitted to the frontier
    pub scheduled: usize,
    /// Pages fetched and merged into the index
    pub indexed: usize,
    /// Pages that could not be fetched
    pub failed: usize,
}

/// State shared by every page task of one crawler
struct CrawlState {
    index: Arc<ThreadSafeIndex>,
    fetcher: Arc<dyn Fetcher>,
    normalizer: Arc<dyn Normalizer>,
    limit: usize,
    /// Every URL ever scheduled, fragments removed
    frontier: Mutex<FxHashSet<String>>,
    indexed: AtomicUsize,
    failed: AtomicUsize,
}

impl CrawlState {
    /// Admit `links` in order while the frontier has room, returning the
    /// newly admitted ones.
    ///
    /// The size check and the insert happen under one lock, so the frontier
    /// can never grow past `limit`.
    fn admit(&self, links: impl IntoIterator<Item = Url>) -> Vec<Url> {
        let mut frontier = self.frontier.lock().unwrap_or_else(PoisonError::into_inner);
        let mut admitted = Vec::new();
        for link in links {
            if frontier.len() >= self.limit {
                break;
            }
            if frontier.insert(link.as_str().to_owned()) {
                admitted.push(link);
            }
        }
        admitted
    }

    fn scheduled(&self) -> usize {
        self.frontier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn stats(&self) -> CrawlStats {
        CrawlStats {
            scheduled: self.scheduled(),
            indexed: self.indexed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Breadth-first crawler that indexes at most `limit` pages.
///
/// Each page is one [`WorkQueue`] task: fetch, clean, index into a private
/// shard, merge once, then schedule newly discovered links. The frontier is
/// kept between calls to [`crawl`](WebCrawler::crawl), so a URL is never
/// indexed twice by the same crawler.
pub struct WebCrawler {
    state: Arc<CrawlState>,
    queue: WorkQueue,
}

impl WebCrawler {
    pub fn new(
        index: Arc<ThreadSafeIndex>,
        queue: WorkQueue,
        limit: usize,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self::with_normalizer(index, queue, limit, fetcher, Arc::new(TextNormalizer::new()))
    }

    pub fn with_normalizer(
        index: Arc<ThreadSafeIndex>,
        queue: WorkQueue,
        limit: usize,
        fetcher: Arc<dyn Fetcher>,
        normalizer: Arc<dyn Normalizer>,
    ) -> Self {
        Self {
            state: Arc::new(CrawlState {
                index,
                fetcher,
                normalizer,
                limit: limit.max(1),
                frontier: Mutex::new(FxHashSet::default()),
                indexed: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
            }),
            queue,
        }
    }

    pub fn limit(&self) -> usize {
        self.state.limit
    }

    /// Crawl from `seed` and block until every scheduled page is done.
    pub fn crawl(&self, seed: &str) -> Result<CrawlStats> {
        let mut seed = Url::parse(seed).with_context(|| format!("Invalid seed URL {}", seed))?;
        seed.set_fragment(None);

        let admitted = self.state.admit([seed.clone()]);
        if admitted.is_empty() {
            info!(url = %seed, "seed already crawled or limit reached");
        }
        for url in admitted {
            schedule(&self.state, &self.queue, url)?;
        }
        self.queue.await_idle();

        let stats = self.state.stats();
        info!(
            scheduled = stats.scheduled,
            indexed = stats.indexed,
            failed = stats.failed,
            "crawl complete"
        );
        Ok(stats)
    }

    pub fn stats(&self) -> CrawlStats {
        self.state.stats()
    }
}

fn schedule(state: &Arc<CrawlState>, queue: &WorkQueue, url: Url) -> Result<()> {
    let task_state = Arc::clone(state);
    let task_queue = queue.clone();
    queue.submit(move || crawl_page(&task_state, &task_queue, url))?;
    Ok(())
}

fn crawl_page(state: &Arc<CrawlState>, queue: &WorkQueue, url: Url) -> Result<()> {
    let html = match state.fetcher.fetch(&url) {
        Ok(html) => html,
        Err(err) => {
            state.failed.fetch_add(1, Ordering::Relaxed);
            return Err(err).context("page skipped");
        }
    };

    let page = HtmlCleaner::clean(&url, &html);

    let mut shard = InvertedIndex::new();
    let location = url.as_str();
    let mut position = 0;
    for line in page.text.lines() {
        position = shard.add_all(state.normalizer.normalize(line), location, position);
    }
    state.index.merge(shard);
    state.indexed.fetch_add(1, Ordering::Relaxed);
    debug!(url = %url, terms = position, links = page.links.len(), "indexed page");

    // Submit outside the frontier lock.
    for link in state.admit(page.links) {
        schedule(state, queue, link)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::fetcher::FetchError;
    use std::collections::HashMap;

    /// Serves pages from memory; unknown URLs are 404s.
    #[derive(Default)]
    struct MockFetcher {
        pages: HashMap<String, String>,
        requests: AtomicUsize,
    }

    impl MockFetcher {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_owned(), html.to_owned());
            self
        }
    }

    impl Fetcher for MockFetcher {
        fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn links(targets: &[&str]) -> String {
        targets
            .iter()
            .map(|target| format!(r#"<a href="{}">link</a>"#, target))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn crawler(fetcher: Arc<MockFetcher>, limit: usize) -> (WebCrawler, Arc<ThreadSafeIndex>) {
        let index = Arc::new(ThreadSafeIndex::new());
        let queue = WorkQueue::new(3).unwrap();
        (WebCrawler::new(Arc::clone(&index), queue, limit, fetcher), index)
    }

    #[test]
    fn test_links_admitted_in_document_order_up_to_limit() {
        let fetcher = Arc::new(
            MockFetcher::default()
                .page("https://site.test/", &links(&["/a", "/b", "/c", "/d"]))
                .page("https://site.test/a", "lemon")
                .page("https://site.test/b", "banana")
                .page("https://site.test/c", "melon")
                .page("https://site.test/d", "plum"),
        );
        let (crawler, index) = crawler(Arc::clone(&fetcher), 3);

        let stats = crawler.crawl("https://site.test/").unwrap();
        assert_eq!(stats, CrawlStats { scheduled: 3, indexed: 3, failed: 0 });
        assert!(index.contains("lemon"));
        assert!(index.contains("banana"));
        assert!(!index.contains("melon"));
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cyclic_links_are_fetched_once() {
        let fetcher = Arc::new(
            MockFetcher::default()
                .page("https://site.test/", &links(&["/a", "/#top", "https://site.test/"]))
                .page("https://site.test/a", &links(&["/", "/a#part"])),
        );
        let (crawler, index) = crawler(Arc::clone(&fetcher), 50);

        let stats = crawler.crawl("https://site.test/#intro").unwrap();
        assert_eq!(stats.scheduled, 2);
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 2);
        assert_eq!(
            index.locations("link"),
            ["https://site.test/", "https://site.test/a"]
        );
    }

    #[test]
    fn test_failed_pages_are_counted_and_omitted() {
        let fetcher = Arc::new(
            MockFetcher::default()
                .page("https://site.test/", &links(&["/missing", "/ok"]))
                .page("https://site.test/ok", "good"),
        );
        let (crawler, index) = crawler(fetcher, 10);

        let stats = crawler.crawl("https://site.test/").unwrap();
        assert_eq!(stats, CrawlStats { scheduled: 3, indexed: 2, failed: 1 });
        assert!(index.contains("good"));
        assert!(index
            .counts()
            .keys()
            .all(|location| !location.ends_with("/missing")));
    }

    #[test]
    fn test_limit_never_exceeded_on_wide_site() {
        let mut fetcher = MockFetcher::default();
        for page in 0..40 {
            let targets: Vec<String> = (0..40).map(|n| format!("/p{}", (page * 7 + n) % 40)).collect();
            let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
            fetcher = fetcher.page(&format!("https://site.test/p{}", page), &links(&targets));
        }
        let fetcher = Arc::new(fetcher);
        let (crawler, index) = crawler(Arc::clone(&fetcher), 12);

        let stats = crawler.crawl("https://site.test/p0").unwrap();
        assert_eq!(stats.scheduled, 12);
        assert_eq!(stats.indexed, 12);
        assert_eq!(index.counts().len(), 12);
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_limit_is_at_least_one() {
        let fetcher = Arc::new(MockFetcher::default().page("https://site.test/", &links(&["/a"])));
        let (crawler, _index) = crawler(fetcher, 0);
        assert_eq!(crawler.limit(), 1);
        assert_eq!(crawler.crawl("https://site.test/").unwrap().scheduled, 1);
    }

    #[test]
    fn test_invalid_seed_is_an_error() {
        let (crawler, _index) = crawler(Arc::new(MockFetcher::default()), 5);
        assert!(crawler.crawl("not a url").is_err());
    }
}
