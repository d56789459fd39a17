//! Declarative extraction rules for the reference sites. Every structural
//! assumption about their markup lives here, so a layout change on either
//! site means editing one table instead of chasing selectors through the
//! extractors.

use crate::error::{ExtractError, Result};
use scraper::{Html, Selector};

#[derive(Clone, Copy)]
pub(crate) enum Grab {
    /// All text under the first match, trimmed.
    Text,
    /// Child nodes of the first match, serialized.
    Inner,
    /// The first match serialized with its own tag.
    Outer,
    /// An attribute of the first match.
    Attr(&'static str),
}

pub(crate) struct FieldRule {
    pub name: &'static str,
    pub selector: &'static str,
    pub grab: Grab,
    pub required: bool,
    pub post: Option<fn(&str) -> String>,
}

impl FieldRule {
    /// Runs the rule against a document. Required fields that do not match
    /// (or match only emptiness) are a structure mismatch; optional fields
    /// degrade to `None`.
    pub(crate) fn apply(&self, document: &Html) -> Result<Option<String>> {
        let selector = Selector::parse(self.selector).unwrap();

        let value = match document.select(&selector).next() {
            Some(el) => {
                let raw = match self.grab {
                    Grab::Text => el.text().collect::<String>(),
                    Grab::Inner => el.inner_html(),
                    Grab::Outer => el.html(),
                    Grab::Attr(attr) => {
                        el.value().attr(attr).unwrap_or_default().to_string()
                    }
                };
                let trimmed = raw.trim();
                match self.post {
                    Some(post) => post(trimmed),
                    None => trimmed.to_string(),
                }
            }
            None => String::new(),
        };

        if value.is_empty() {
            if self.required {
                return Err(ExtractError::StructureMismatch { field: self.name }.into());
            }
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Like [`apply`], for fields the page must always carry.
    pub(crate) fn require(&self, document: &Html) -> Result<String> {
        self.apply(document)?
            .ok_or_else(|| ExtractError::StructureMismatch { field: self.name }.into())
    }
}

fn strip_ordinal(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_alphabetic() && !c.is_whitespace())
        .collect()
}

// The kanji site wraps each detail page in a handful of fixed-layout divs.
// Attribute-equality selectors mirror the full class strings the site uses,
// since `span8` alone also matches the centered ordinal block.

pub(crate) const GLYPH_SELECTOR: &str = r#"div[class="span8"] h1 span.kanji_character"#;

pub(crate) const MEANING: FieldRule = FieldRule {
    name: "meaning",
    selector: r#"div[class="span8"] h1 span.translation"#,
    grab: Grab::Text,
    required: true,
    post: None,
};

pub(crate) const NUMBER: FieldRule = FieldRule {
    name: "number",
    selector: r#"div[class="span8 text-centered"]"#,
    grab: Grab::Text,
    required: true,
    post: Some(strip_ordinal),
};

pub(crate) const USEFULNESS: FieldRule = FieldRule {
    name: "usefulness",
    selector: r#"div[class="span4 text-righted"] span.usefulness-stars"#,
    grab: Grab::Text,
    required: false,
    post: None,
};

pub(crate) const DESCRIPTION: FieldRule = FieldRule {
    name: "description",
    selector: "div.description",
    grab: Grab::Inner,
    required: false,
    post: None,
};

pub(crate) const USED_IN: FieldRule = FieldRule {
    name: "used_in",
    selector: "ul.lacidar",
    grab: Grab::Outer,
    required: false,
    post: None,
};

pub(crate) const HEADER: FieldRule = FieldRule {
    name: "header",
    selector: r#"div[class="span8"]"#,
    grab: Grab::Outer,
    required: false,
    post: None,
};

pub(crate) const NEXT_LINK: FieldRule = FieldRule {
    name: "next",
    selector: r#"div[class="span2 text-righted"] a"#,
    grab: Grab::Attr("href"),
    required: false,
    post: None,
};

// Reading and compound tables hang off plain h2 headings.
pub(crate) const ONYOMI_TITLE: &str = "Onyomi";
pub(crate) const KUNYOMI_TITLE: &str = "Kunyomi";
pub(crate) const MNEMONIC_TITLE: &str = "Mnemonic";
pub(crate) const JUKUGO_TITLE: &str = "Jukugo";
pub(crate) const LOOKALIKES_TITLE: &str = "Lookalikes";
pub(crate) const DEFINITION_TABLE_CLASS: &str = "definition";

pub(crate) const HEADING: &str = "h2";
pub(crate) const ROW: &str = "tr";
pub(crate) const CELL: &str = "td";
pub(crate) const PARAGRAPH: &str = "p";
pub(crate) const ONYOMI_READING: &str = "span.onyomi";
pub(crate) const STARS: &str = "span.usefulness-stars";

// The compound site's per-kanji page.
pub(crate) const COMPOUNDS_TABLE: &str = "table.k-compounds-table";
pub(crate) const COMPOUND_READING: &str = "span.kana b";
pub(crate) const WORD_LINK: &str = "a";
pub(crate) const KANA_CLASS: &str = "kana";
pub(crate) const ROMAJI_CLASS: &str = "romaji";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selectors_parse() {
        for rule in [
            &MEANING,
            &NUMBER,
            &USEFULNESS,
            &DESCRIPTION,
            &USED_IN,
            &HEADER,
            &NEXT_LINK,
        ] {
            assert!(
                Selector::parse(rule.selector).is_ok(),
                "bad selector for {}",
                rule.name
            );
        }
        for selector in [
            GLYPH_SELECTOR,
            HEADING,
            ROW,
            CELL,
            PARAGRAPH,
            ONYOMI_READING,
            STARS,
            COMPOUNDS_TABLE,
            COMPOUND_READING,
            WORD_LINK,
        ] {
            assert!(Selector::parse(selector).is_ok(), "bad selector {selector}");
        }
    }

    #[test]
    fn required_rule_rejects_missing_field() {
        let document = Html::parse_document("<html><body><p>nothing</p></body></html>");
        let result = MEANING.require(&document);
        assert!(result.is_err());
    }

    #[test]
    fn optional_rule_degrades_to_none() {
        let document = Html::parse_document("<html><body><p>nothing</p></body></html>");
        assert_eq!(DESCRIPTION.apply(&document).unwrap(), None);
    }

    #[test]
    fn ordinal_post_processing_strips_label() {
        let document = Html::parse_document(
            r#"<div class="span8 text-centered"><img alt="Flag">Number 335</div>"#,
        );
        assert_eq!(NUMBER.require(&document).unwrap(), "335");
    }
}
