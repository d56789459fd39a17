use super::rules;
use super::{element_text, following_element, text_after};
pub use crate::log_debug;
use scraper::{ElementRef, Html, Selector};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One example compound scraped from the dictionary site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TangorinWord {
    pub word: String,
    #[serde(default)]
    pub furigana: String,
    #[serde(default)]
    pub meaning: String,
}

/// Example words for one kanji, grouped by reading in page order. The order
/// readings appear in is part of the ranking contract, so this is a keyed
/// sequence rather than a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingGroups(Vec<(String, Vec<TangorinWord>)>);

impl ReadingGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reading group. A repeated reading replaces its words but keeps
    /// its original position.
    pub fn push(&mut self, reading: String, words: Vec<TangorinWord>) {
        if let Some(group) = self.0.iter_mut().find(|(r, _)| *r == reading) {
            group.1 = words;
        } else {
            self.0.push((reading, words));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<TangorinWord>)> {
        self.0.iter().map(|(reading, words)| (reading, words))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ReadingGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (reading, words) in &self.0 {
            map.serialize_entry(reading, words)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ReadingGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = ReadingGroups;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of reading to word list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut groups = ReadingGroups::new();
                while let Some((reading, words)) =
                    access.next_entry::<String, Vec<TangorinWord>>()?
                {
                    groups.push(reading, words);
                }
                Ok(groups)
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

pub struct CompoundScraper<'a> {
    document: &'a Html,
}

impl<'a> CompoundScraper<'a> {
    pub(crate) fn new(document: &'a Html) -> Self {
        Self { document }
    }

    /// Extracts the compound table. `None` means the page carries no data
    /// for this kanji: either the table is absent or a reading row is too
    /// broken to trust the rest of the page.
    pub fn extract(&self) -> Option<ReadingGroups> {
        let table_selector = Selector::parse(rules::COMPOUNDS_TABLE).unwrap();
        let table = match self.document.select(&table_selector).next() {
            Some(table) => table,
            None => {
                log_debug!("[tangorin] page has no compounds table");
                return None;
            }
        };

        let row_selector = Selector::parse(rules::ROW).unwrap();
        let cell_selector = Selector::parse(rules::CELL).unwrap();
        let reading_selector = Selector::parse(rules::COMPOUND_READING).unwrap();
        let link_selector = Selector::parse(rules::WORD_LINK).unwrap();

        let mut groups = ReadingGroups::new();
        for row in table.select(&row_selector) {
            let cells: Vec<ElementRef> = row.select(&cell_selector).collect();

            let reading = cells
                .first()
                .and_then(|td| td.select(&reading_selector).next())
                .map(element_text)
                .unwrap_or_default();
            if reading.is_empty() {
                log_debug!("[tangorin] row without reading, treating page as empty");
                return None;
            }

            let mut words = Vec::new();
            if let Some(cell) = cells.get(1) {
                for link in cell.select(&link_selector) {
                    let word = element_text(link);
                    if word.is_empty() {
                        continue;
                    }
                    words.push(TangorinWord {
                        word,
                        furigana: Self::furigana_for(link),
                        meaning: Self::meaning_for(link),
                    });
                }
            }
            groups.push(reading, words);
        }
        Some(groups)
    }

    // The furigana and meaning are not wrapped with the word; they trail it
    // as loose siblings. This walk mirrors the page's visual layout and is
    // best effort: a missing piece degrades to an empty string.

    fn furigana_for(link: ElementRef) -> String {
        following_element(link, "span", Some(rules::KANA_CLASS))
            .map(element_text)
            .unwrap_or_default()
    }

    fn meaning_for(link: ElementRef) -> String {
        following_element(link, "span", Some(rules::ROMAJI_CLASS))
            .map(|span| text_after(span).replace('】', "").trim().to_string())
            .unwrap_or_default()
    }
}
