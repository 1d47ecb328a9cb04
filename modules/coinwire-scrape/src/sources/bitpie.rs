//! BitPie — Chinese-language source, static HTML.

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::{Article, Category};
use std::sync::{Arc, Mutex};

use super::{dates, ArticleSink, Scraper};
use crate::fetcher::Fetcher;

const NAME: &str = "bitpie";
const DOMAIN: &str = "https://m.sc5b.net";

pub struct BitPie {
    sink: ArticleSink,
}

impl BitPie {
    pub fn new(sink: ArticleSink) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Scraper for BitPie {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        let collected: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));
        // Sidebar author applies to the latest rail; its callback registers
        // first so the value is populated before the rail is walked.
        let site_author: Arc<Mutex<String>> = Arc::new(Mutex::new(String::new()));

        let mut fetcher = Fetcher::new(DOMAIN);

        {
            let site_author = site_author.clone();
            fetcher.on_html("section.widget_avatar", move |el| {
                *site_author.lock().unwrap() = el.child_attr("div.user-bgif img", "title");
            });
        }

        // featured
        {
            let collected = collected.clone();
            fetcher.on_html("div.home-main article.picsrcd div.entry-container", move |el| {
                let mut article = Article::new(NAME, Category::Featured);
                article.title = el.child_attr("header h3 a", "title");
                article.link = el.abs_url(&el.child_attr("header h3 a", "href"));
                article.summary = el.child_text("div.entry-summary p");
                article.author = el.child_text("div.entry-meta-items div.entry-meta-author a");
                article.image = el.abs_url(&el.child_attr("figure.block-image a img", "src"));
                article.pub_date = dates::naive(
                    "%Y-%m-%d %H:%M:%S",
                    &el.child_attr("div.entry-meta-items time", "datetime"),
                );

                // "1234 次浏览"
                let reads_text =
                    el.child_attr("div.entry-meta-items span.meta-viewnums", "title");
                article.reads = reads_text
                    .split(' ')
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0);

                collected.lock().unwrap().push(article);
            });
        }

        // latest sidebar
        {
            let collected = collected.clone();
            let site_author = site_author.clone();
            fetcher.on_html("section#divPrevious ul.divPrevious div.side_new", move |el| {
                let mut article = Article::new(NAME, Category::Latest);
                article.title = el.child_text("div.side-new-title a");
                article.link = el.abs_url(&el.child_attr("div.side-new-title a", "href"));
                article.author = site_author.lock().unwrap().clone();

                // "发布时间：2026年08月01日"
                let raw = el.child_text("div.side-new-time");
                let date = raw.split('：').nth(1).unwrap_or(&raw);
                article.pub_date = dates::naive_date("%Y年%m月%d日", date);

                collected.lock().unwrap().push(article);
            });
        }

        fetcher.start().await;

        let articles = std::mem::take(&mut *collected.lock().unwrap());
        self.sink.send(articles).await;
        Ok(())
    }
}
