//! Result page parsing.
//!
//! Selectors are tied to the upstream result markup: one `div` with class
//! exactly `g` per listing, the heading in `h3`, the snippet in
//! `div.IsZvec`, the link in `div.yuRUbf > a`, and `a#pnnext` for the
//! next page control.

use scraper::{ElementRef, Html, Selector};

use crate::{Result, SearchError};

const BLOCK_SELECTOR: &str = r#"div[class="g"]"#;
const TITLE_SELECTOR: &str = "h3";
const DESCRIPTION_SELECTOR: &str = "div.IsZvec";
const LINK_SELECTOR: &str = "div.yuRUbf > a";
const NEXT_SELECTOR: &str = "a#pnnext";

/// Fields extracted from one result block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageEntry {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// A parsed result page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Entries in document order.
    pub entries: Vec<PageEntry>,
    /// Whether the page links to a following page.
    pub has_next: bool,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector: {:?}", e)))
}

fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Parses a result page. Missing sub-elements leave the field empty rather
/// than dropping the entry.
pub fn parse_page(html: &str) -> Result<ParsedPage> {
    let document = Html::parse_document(html);

    let block_selector = selector(BLOCK_SELECTOR)?;
    let title_selector = selector(TITLE_SELECTOR)?;
    let description_selector = selector(DESCRIPTION_SELECTOR)?;
    let link_selector = selector(LINK_SELECTOR)?;
    let next_selector = selector(NEXT_SELECTOR)?;

    let entries = document
        .select(&block_selector)
        .map(|block| PageEntry {
            title: first_text(&block, &title_selector),
            description: first_text(&block, &description_selector),
            url: block
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string),
        })
        .collect();

    let has_next = document.select(&next_selector).next().is_some();

    Ok(ParsedPage { entries, has_next })
}
