//! Public practice sites used by the quick-start endpoint.

use scrapemaster_core::job::JobConfig;
use scrapemaster_core::models::Selectors;

pub const DEMO_MAX_PAGES: u32 = 5;

pub struct DemoSite {
    pub name: &'static str,
    pub url: &'static str,
    pub selectors: &'static [(&'static str, &'static str)],
}

pub const DEMO_SITES: &[DemoSite] = &[
    DemoSite {
        name: "HttpBin HTML Demo",
        url: "https://httpbin.org/html",
        selectors: &[("container", "div"), ("title", "h1"), ("description", "p")],
    },
    DemoSite {
        name: "Books to Scrape",
        url: "https://books.toscrape.com/",
        selectors: &[
            ("container", "article.product_pod"),
            ("title", "h3 a"),
            ("price", ".price_color"),
            ("availability", ".availability"),
        ],
    },
    DemoSite {
        name: "Quotes to Scrape",
        url: "https://quotes.toscrape.com/",
        selectors: &[
            ("container", "div.quote"),
            ("text", "span.text"),
            ("author", "small.author"),
        ],
    },
    DemoSite {
        name: "Random User",
        url: "https://randomuser.me/",
        selectors: &[("container", "div#app"), ("title", "h1"), ("description", "p")],
    },
];

impl DemoSite {
    /// Five pages, default delay, direct connection.
    pub fn job_config(&self) -> JobConfig {
        let selectors: Selectors = self
            .selectors
            .iter()
            .map(|(field, css)| (field.to_string(), css.to_string()))
            .collect();
        JobConfig::new(self.name, self.url, selectors)
            .with_max_pages(DEMO_MAX_PAGES)
            .with_delay(1.0)
            .with_proxy(false)
    }
}

pub fn random_site() -> &'static DemoSite {
    &DEMO_SITES[fastrand::usize(..DEMO_SITES.len())]
}
