mod kanjidamage;
mod rules;
mod tangorin;

pub use kanjidamage::{Glyph, KanjiPage, KanjiPageScraper};
pub use tangorin::{CompoundScraper, ReadingGroups, TangorinWord};

use scraper::{ElementRef, Html, Node};

pub struct Scraper {
    document: Html,
}

impl Scraper {
    pub fn new(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    pub fn kanji_page(&self) -> KanjiPageScraper {
        KanjiPageScraper::new(&self.document)
    }

    pub fn compounds(&self) -> CompoundScraper {
        CompoundScraper::new(&self.document)
    }
}

// Shared DOM helpers. The reference sites interleave text nodes with
// elements, so several fields can only be reached by walking siblings
// rather than by selector alone.

pub(crate) fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// First non-empty text node directly under `el`, trimmed.
pub(crate) fn first_text(el: ElementRef) -> Option<String> {
    for node in el.children() {
        if let Node::Text(text) = node.value() {
            let trimmed = text.text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

pub(crate) fn has_class(el: ElementRef, name: &str) -> bool {
    el.value()
        .attr("class")
        .map(|classes| classes.split_whitespace().any(|c| c == name))
        .unwrap_or(false)
}

/// First following sibling element matching `tag`, with `class_name` when
/// given.
pub(crate) fn following_element<'a>(
    el: ElementRef<'a>,
    tag: &str,
    class_name: Option<&str>,
) -> Option<ElementRef<'a>> {
    for node in el.next_siblings() {
        if let Some(sibling) = ElementRef::wrap(node) {
            if sibling.value().name() != tag {
                continue;
            }
            match class_name {
                Some(name) if !has_class(sibling, name) => continue,
                _ => return Some(sibling),
            }
        }
    }
    None
}

/// Serializes everything after `el` inside its parent, stopping before the
/// first element named `stop_tag` when one is given. Text nodes are kept
/// verbatim, elements as their outer HTML.
pub(crate) fn sibling_fragment(el: ElementRef, stop_tag: Option<&str>) -> String {
    let mut out = String::new();
    for node in el.next_siblings() {
        if let Some(sibling) = ElementRef::wrap(node) {
            if stop_tag == Some(sibling.value().name()) {
                break;
            }
            out.push_str(&sibling.html());
        } else if let Node::Text(text) = node.value() {
            out.push_str(&text.text);
        }
    }
    out.trim().to_string()
}

/// Concatenated text nodes immediately following `el`, up to the next
/// element sibling.
pub(crate) fn text_after(el: ElementRef) -> String {
    let mut out = String::new();
    for node in el.next_siblings() {
        match node.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(_) => break,
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn first<'a>(document: &'a Html, selector: &str) -> ElementRef<'a> {
        let selector = Selector::parse(selector).unwrap();
        document.select(&selector).next().unwrap()
    }

    #[test]
    fn first_text_skips_markup_and_whitespace() {
        let document = Html::parse_document(
            "<table><tbody><tr><td>\n  <span>ignored</span>to climb<span>more</span></td></tr></tbody></table>",
        );
        let td = first(&document, "td");
        assert_eq!(first_text(td), Some("to climb".to_string()));
    }

    #[test]
    fn sibling_fragment_stops_at_tag() {
        let document = Html::parse_document(
            "<div><h2>A</h2> tail text <p>kept</p><h2>B</h2><p>dropped</p></div>",
        );
        let h2 = first(&document, "h2");
        let fragment = sibling_fragment(h2, Some("h2"));
        assert_eq!(fragment, "tail text <p>kept</p>");
    }

    #[test]
    fn text_after_stops_at_element() {
        let document =
            Html::parse_document("<td><span class=\"romaji\">hi</span>】 fire<br>rest</td>");
        let span = first(&document, "span.romaji");
        assert_eq!(text_after(span), "】 fire");
    }

    #[test]
    fn following_element_filters_by_class() {
        let document = Html::parse_document(
            "<div><h2>Onyomi</h2><p>skip</p><table class=\"other\"></table>\
             <table class=\"definition\"><tbody><tr><td>row</td></tr></tbody></table></div>",
        );
        let h2 = first(&document, "h2");
        let table = following_element(h2, "table", Some("definition")).unwrap();
        assert_eq!(element_text(table), "row");
    }
}
