//! Blockworks — static HTML. The homepage mixes a latest rail resolved via
//! detail pages with two featured card layouts.

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::{Article, Category};
use std::sync::{Arc, Mutex};

use super::{dates, ArticleSink, Scraper};
use crate::element::Element;
use crate::fetcher::Fetcher;

const NAME: &str = "blockworks";
const DOMAIN: &str = "https://blockworks.co";

pub struct BlockWorks {
    sink: ArticleSink,
}

impl BlockWorks {
    pub fn new(sink: ArticleSink) -> Self {
        Self { sink }
    }

    async fn details(&self, url: &str) -> Article {
        let found: Arc<Mutex<Article>> = Arc::new(Mutex::new(Article::new(NAME, Category::Latest)));

        let mut fetcher = Fetcher::new(url);
        {
            let found = found.clone();
            fetcher.on_html("article", move |el| {
                let mut article = found.lock().unwrap();
                article.title = el.child_text("h1:first-of-type");
                article.summary = el.child_text("div:first-of-type > p.text-left");
                article.image =
                    el.abs_url(&el.child_attr("div:nth-of-type(2) img.object-cover", "src"));

                let author = el.child_text("div:first-of-type div.uppercase:first-of-type");
                article.author = author
                    .strip_prefix("by ")
                    .unwrap_or(&author)
                    .trim()
                    .to_string();

                let raw =
                    el.child_attr("div:first-of-type div.uppercase:last-of-type time", "datetime");
                article.pub_date = dates::rfc3339(&raw);
            });
        }
        fetcher.start().await;

        let article = found.lock().unwrap().clone();
        article
    }

    async fn homepage(&self) -> (Vec<String>, Vec<Article>) {
        let latest_links: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let featured: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        let mut fetcher = Fetcher::new(DOMAIN);

        // latest rail: links only, records come from detail pages
        {
            let latest_links = latest_links.clone();
            fetcher.on_html("section.flex section", move |el| {
                let link = el.child_attr("div:nth-child(2) > a", "href");
                if !link.is_empty() {
                    latest_links.lock().unwrap().push(el.abs_url(&link));
                }
            });
        }

        // featured cards, two layouts
        {
            let featured = featured.clone();
            fetcher.on_html("section.flex div.order-1 > div", move |el| {
                let mut collected = featured.lock().unwrap();

                el.for_each(
                    "div.flex.justify-center.items-start.self-stretch.gap-3:nth-child(1)",
                    |card| {
                        if let Some(article) = featured_card(&card, true) {
                            collected.push(article);
                        }
                    },
                );

                el.for_each("div.justify-start.items-center.flex-grow.gap-2.w-full", |card| {
                    if let Some(article) = featured_card(&card, false) {
                        collected.push(article);
                    }
                });
            });
        }

        fetcher.start().await;

        let links = std::mem::take(&mut *latest_links.lock().unwrap());
        let articles = std::mem::take(&mut *featured.lock().unwrap());
        (links, articles)
    }

    async fn opinions(&self) -> Vec<Article> {
        let collected: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        let url = format!("{DOMAIN}/category/opinion");
        let mut fetcher = Fetcher::new(&url);
        {
            let collected = collected.clone();
            fetcher.on_html(
                "section.flex div.flex.flex-col.justify-start.self-stretch.flex-grow.gap-2.w-full",
                move |el| {
                    let mut article = Article::new(NAME, Category::Opinions);
                    article.title = el.child_text("div:nth-child(3) > a");
                    article.summary = el.child_text("div:nth-child(4) > p");
                    article.author = el.child_text("div:nth-child(5) > div > span > a");
                    article.link = el.abs_url(&el.child_attr("a.cursor-pointer", "href"));
                    article.image =
                        el.abs_url(&el.child_attr("a > img[alt=article-image]", "src"));
                    article.pub_date = dates::rfc3339(
                        &el.child_attr("div:nth-child(5) > div > time", "datetime"),
                    );
                    collected.lock().unwrap().push(article);
                },
            );
        }
        fetcher.start().await;

        let articles = std::mem::take(&mut *collected.lock().unwrap());
        articles
    }
}

fn featured_card(card: &Element<'_>, large_layout: bool) -> Option<Article> {
    let (title_sel, summary_sel, link_sel, time_sel, image_sel) = if large_layout {
        (
            "div > div:nth-child(2) > a",
            "div > div:nth-child(3) > p",
            "div > div:nth-child(2) > a",
            "div > div:nth-child(4) > div > time",
            "div > div:nth-child(5) img[alt=article-image]",
        )
    } else {
        (
            "div > div:nth-of-type(2) > a",
            "div > div:nth-of-type(3)",
            "div > div:nth-of-type(2) > a",
            "div > div:nth-of-type(4) > div > time",
            "div > a > img[alt=article-image]",
        )
    };

    let title = card.child_text(title_sel);
    let link = card.child_attr(link_sel, "href");
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let mut article = Article::new(NAME, Category::Featured);
    article.title = title;
    article.summary = card.child_text(summary_sel);
    article.link = card.abs_url(&link);
    article.image = card.abs_url(&card.child_attr(image_sel, "src"));
    article.pub_date = dates::rfc3339(&card.child_attr(time_sel, "datetime"));

    let mut authors = Vec::new();
    card.for_each("span a.link-gray", |author| {
        let name = author.text();
        if !name.is_empty() {
            authors.push(name);
        }
    });
    article.author = authors.join(" & ");

    Some(article)
}

#[async_trait]
impl Scraper for BlockWorks {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        let (latest_links, featured) = self.homepage().await;

        for link in latest_links {
            let mut article = self.details(&link).await;
            article.category = Category::Latest;
            article.link = link;
            if !article.title.is_empty() {
                self.sink.send([article]).await;
            }
        }

        // Featured cards without a cover image fall back to the article's
        // own detail page.
        for mut article in featured {
            if article.image.is_empty() {
                let image = self.details(&article.link).await.image;
                article.image = image;
            }
            self.sink.send([article]).await;
        }
        self.sink.send(self.opinions().await).await;

        Ok(())
    }
}
