#![no_main]

use libfuzzer_sys::fuzz_target;
use quarry::crawl::HtmlCleaner;
use url::Url;

fuzz_target!(|data: &str| {
    // Arbitrary markup must not panic, and every link must be absolute http(s)
    let base = Url::parse("https://example.com/dir/page.html").unwrap();
    let page = HtmlCleaner::clean(&base, data);
    for link in page.links {
        assert!(matches!(link.scheme(), "http" | "https"));
        assert!(link.fragment().is_none());
    }
});
