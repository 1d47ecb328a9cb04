//! The Block — rendered exclusively in browser mode.

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::{Article, Category};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::{dates, ArticleSink, Scraper};
use crate::browser::BrowserFetcher;
use crate::element::Element;

const NAME: &str = "theblock";
const DOMAIN: &str = "https://www.theblock.co";
const DATE_FORMAT: &str = "%B %d, %Y, %I:%M%p";

pub struct TheBlock {
    sink: ArticleSink,
    ua: String,
}

impl TheBlock {
    pub fn new(sink: ArticleSink, ua: &str) -> Self {
        Self {
            sink,
            ua: ua.to_string(),
        }
    }

    async fn details(&self, url: &str) -> Option<Article> {
        let found: Arc<Mutex<Option<Article>>> = Arc::new(Mutex::new(None));

        let mut fetcher = BrowserFetcher::new(url).with_ua(&self.ua);
        {
            let found = found.clone();
            let link = url.to_string();
            fetcher.on_html("article.articleBody", move |el| {
                let mut article = Article::new(NAME, Category::Latest);
                article.title = el.child_text("h1[class^=articleLabel]");
                article.author = el.child_text("div.articleByline a");
                article.image = el.child_attr("div.articleFeatureImage img", "src");
                article.summary = el.child_text("div.quickTake ul li:nth-of-type(1) span");
                article.link = link.clone();

                // "Posted ... • January 02, 2026, 10:30AM EST"
                let stamp = el.child_text("div.ArticleTimestamps div.ArticleTimestamps__container");
                if let Some((_, raw)) = stamp.split_once('•') {
                    article.pub_date =
                        dates::naive(DATE_FORMAT, dates::strip_tz_suffix(raw.trim()));
                }

                *found.lock().unwrap() = Some(article);
            });
        }
        fetcher.start().await;

        let article = found.lock().unwrap().take();
        article
    }
}

fn featured_card(el: &Element<'_>) -> Article {
    let mut article = Article::new(NAME, Category::Featured);
    article.title = el.child_text("div[class$=__content] a > h2");
    article.link = el.abs_url(&el.child_attr("div[class$=__content] a.appLink", "href"));
    article.image = el.child_attr("a > img[class$=image]", "src");
    article.pub_date = dates::naive(
        DATE_FORMAT,
        dates::strip_tz_suffix(&el.child_text("div.meta__timestamp")),
    );
    article
}

#[async_trait]
impl Scraper for TheBlock {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        let latest_links: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let featured: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        let mut fetcher = BrowserFetcher::new(DOMAIN).with_ua(&self.ua);

        // latest: links only, detail pages carry the record
        {
            let latest_links = latest_links.clone();
            fetcher.on_html("div.heroLeftRail div.latestNews article", move |el| {
                let link = el.child_attr("div.textCard__content a.textCard__link", "href");
                if !link.is_empty() {
                    latest_links.lock().unwrap().push(el.abs_url(&link));
                }
            });
        }

        // featured cards on the homepage
        {
            let featured = featured.clone();
            fetcher.on_html("div.featuredStories article", move |el| {
                featured.lock().unwrap().push(featured_card(el));
            });
        }

        fetcher.start().await;

        let latest_links_taken = std::mem::take(&mut *latest_links.lock().unwrap());
        for link in latest_links_taken {
            match self.details(&link).await {
                Some(article) => self.sink.send([article]).await,
                None => warn!(url = %link, "The Block detail page yielded no article"),
            }
        }

        let featured_taken = std::mem::take(&mut *featured.lock().unwrap());
        self.sink.send(featured_taken).await;

        // the features section has its own page of cards
        let more: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));
        let mut features =
            BrowserFetcher::new(&format!("{DOMAIN}/features")).with_ua(&self.ua);
        {
            let more = more.clone();
            features.on_html("section#contentRoot section div.articles article", move |el| {
                more.lock().unwrap().push(featured_card(el));
            });
        }
        features.start().await;

        let more_taken = std::mem::take(&mut *more.lock().unwrap());
        self.sink.send(more_taken).await;

        Ok(())
    }
}
