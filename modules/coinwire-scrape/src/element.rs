//! Element handle passed to selector callbacks.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

/// One matched element plus the page URL for relative-link resolution.
pub struct Element<'a> {
    node: ElementRef<'a>,
    base: &'a Url,
}

impl<'a> Element<'a> {
    pub fn new(node: ElementRef<'a>, base: &'a Url) -> Self {
        Self { node, base }
    }

    /// Whitespace-normalized text content of this element.
    pub fn text(&self) -> String {
        normalize(self.node.text())
    }

    pub fn attr(&self, name: &str) -> String {
        self.node.value().attr(name).unwrap_or_default().to_string()
    }

    /// Text of the first descendant matching `selector`, empty if none.
    pub fn child_text(&self, selector: &str) -> String {
        match self.select_first(selector) {
            Some(el) => normalize(el.text()),
            None => String::new(),
        }
    }

    /// Attribute of the first descendant matching `selector`, empty if none.
    pub fn child_attr(&self, selector: &str, attr: &str) -> String {
        self.select_first(selector)
            .and_then(|el| el.value().attr(attr))
            .unwrap_or_default()
            .to_string()
    }

    /// Run `f` for every descendant matching `selector`.
    pub fn for_each(&self, selector: &str, mut f: impl FnMut(Element<'_>)) {
        let Ok(sel) = Selector::parse(selector) else {
            warn!(selector, "Invalid selector");
            return;
        };
        for node in self.node.select(&sel) {
            f(Element::new(node, self.base));
        }
    }

    /// Resolve an href against the page URL. Absolute inputs pass through.
    pub fn abs_url(&self, href: &str) -> String {
        if href.is_empty() {
            return String::new();
        }
        match self.base.join(href) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => href.to_string(),
        }
    }

    fn select_first(&self, selector: &str) -> Option<ElementRef<'a>> {
        let sel = match Selector::parse(selector) {
            Ok(sel) => sel,
            Err(_) => {
                warn!(selector, "Invalid selector");
                return None;
            }
        };
        self.node.select(&sel).next()
    }
}

fn normalize<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run every `(selector, callback)` registration against a parsed document,
/// matches in document order per registration.
pub(crate) fn dispatch_html(
    html: &str,
    base: &Url,
    callbacks: &mut [(String, crate::fetcher::HtmlCallback)],
) {
    let document = Html::parse_document(html);
    for (selector, callback) in callbacks {
        let sel = match Selector::parse(selector) {
            Ok(sel) => sel,
            Err(_) => {
                warn!(selector = %selector, "Invalid selector, skipping callback");
                continue;
            }
        };
        for node in document.select(&sel) {
            callback(&Element::new(node, base));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::HtmlCallback;
    use std::sync::{Arc, Mutex};

    const PAGE: &str = r#"
        <html><body>
            <div class="card">
                <h3><a href="/news/btc-rally" title="BTC rallies">BTC rallies</a></h3>
                <p class="summary">  Bitcoin   is up.  </p>
            </div>
            <div class="card">
                <h3><a href="https://other.example/eth">ETH steady</a></h3>
            </div>
        </body></html>
    "#;

    #[test]
    fn child_helpers_extract_text_and_attrs() {
        let base = Url::parse("https://news.example").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let collected = seen.clone();
        let mut callbacks: Vec<(String, HtmlCallback)> = vec![(
            "div.card".to_string(),
            Box::new(move |el| {
                collected.lock().unwrap().push((
                    el.child_text("h3 a"),
                    el.abs_url(&el.child_attr("h3 a", "href")),
                    el.child_text("p.summary"),
                ));
            }),
        )];

        dispatch_html(PAGE, &base, &mut callbacks);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "BTC rallies");
        assert_eq!(seen[0].1, "https://news.example/news/btc-rally");
        assert_eq!(seen[0].2, "Bitcoin is up.");
        // Absolute URLs pass through resolution untouched.
        assert_eq!(seen[1].1, "https://other.example/eth");
        // Missing descendant yields empty, not an error.
        assert_eq!(seen[1].2, "");
    }

    #[test]
    fn callbacks_run_in_document_order() {
        let base = Url::parse("https://news.example").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let collected = order.clone();
        let mut callbacks: Vec<(String, HtmlCallback)> = vec![(
            "a".to_string(),
            Box::new(move |el| collected.lock().unwrap().push(el.text())),
        )];

        dispatch_html(PAGE, &base, &mut callbacks);
        assert_eq!(*order.lock().unwrap(), vec!["BTC rallies", "ETH steady"]);
    }
}
