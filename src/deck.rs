use crate::anki::{CardInfo, NoteInfo};
use crate::error::{DeckError, Result};
pub use crate::{log_debug, log_info};
use crate::utils::fold_fullwidth;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::sync::OnceLock;

fn kanji_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[一-龯]").unwrap())
}

/// Characters the deck indexes notes by directly: kanji, katakana and a few
/// special glyph labels the deck uses for radicals.
fn valid_note_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^([一-龯]|L|￥|(<<<)|丶|[ァ-ン])").unwrap())
}

/// Whether a glyph can serve as a note key on its own.
pub fn is_valid_key(text: &str) -> bool {
    valid_note_key().is_match(text)
}

/// The key a note is looked up by: its kanji field when that is a glyph the
/// deck indexes directly, otherwise its meaning field.
pub fn note_key<'a>(kanji: &'a str, meaning: &'a str) -> &'a str {
    if is_valid_key(kanji) {
        kanji
    } else {
        meaning
    }
}

/// Maps every note's key to its id. A key collision means two notes claim
/// the same glyph, which breaks the update-in-place assumption.
pub fn key_map(notes: &[NoteInfo]) -> Result<HashMap<String, u64>> {
    let mut map = HashMap::with_capacity(notes.len());
    for note in notes {
        let kanji = note.field("Kanji").unwrap_or("");
        let meaning = note.field("Meaning").unwrap_or("");
        let key = note_key(kanji, meaning);
        if map.insert(key.to_string(), note.note_id).is_some() {
            return Err(DeckError::DuplicateKey {
                key: key.to_string(),
            }
            .into());
        }
    }
    Ok(map)
}

/// One word parsed from a note's stored reading tables. The stem and the
/// okurigana suffix are kept apart so the merger can rewrite prefixes.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryWord {
    pub word: String,
    pub suffix: Option<String>,
    pub meaning: String,
}

/// Kanji order and per-kanji word lists read back from the deck.
#[derive(Debug, Default)]
pub struct SourceWords {
    pub order: Vec<String>,
    pub words: HashMap<String, Vec<PrimaryWord>>,
}

impl SourceWords {
    /// Reads the deck's card list: kanji order follows the due position,
    /// cards whose front is not a kanji character are skipped, and each
    /// kept note contributes its kunyomi rows followed by its jukugo rows.
    pub fn from_cards(mut cards: Vec<CardInfo>) -> Result<Self> {
        cards.sort_by_key(|card| card.due);

        let mut source = SourceWords::default();
        for card in &cards {
            let kanji = card.field("Kanji").unwrap_or("");
            if !kanji_start().is_match(kanji) {
                log_debug!("[deck] skipping non-kanji card: {}", kanji);
                continue;
            }
            if source.words.contains_key(kanji) {
                return Err(DeckError::DuplicateKey {
                    key: kanji.to_string(),
                }
                .into());
            }

            let mut words =
                parse_word_table(card.field("Full kunyomi").unwrap_or(""), MeaningCell::Direct);
            words.extend(parse_word_table(
                card.field("Full jukugo").unwrap_or(""),
                MeaningCell::Paragraph,
            ));

            source.order.push(kanji.to_string());
            source.words.insert(kanji.to_string(), words);
        }

        log_info!("[deck] {} kanji in deck order", source.order.len());
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Where a word table keeps its meaning text: kunyomi rows put it directly
/// in the second cell, jukugo rows wrap it in a paragraph.
#[derive(Debug, Clone, Copy)]
enum MeaningCell {
    Direct,
    Paragraph,
}

fn parse_word_table(html: &str, meaning_cell: MeaningCell) -> Vec<PrimaryWord> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let fragment = Html::parse_fragment(html);
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut words = Vec::new();
    for row in fragment.select(&row_selector) {
        let mut cells = row.select(&cell_selector);
        let (Some(word_cell), Some(rest_cell)) = (cells.next(), cells.next()) else {
            continue;
        };

        let text = normalize_word(word_cell);
        if text.is_empty() {
            continue;
        }
        let (word, suffix) = split_okurigana(&text);
        let meaning = match meaning_cell {
            MeaningCell::Direct => direct_text(rest_cell),
            MeaningCell::Paragraph => paragraph_first_text(rest_cell),
        };

        words.push(PrimaryWord {
            word,
            suffix,
            meaning,
        });
    }
    words
}

/// Word-cell text: every text node folded to ASCII where full-width,
/// whitespace dropped and lowercased, then joined.
fn normalize_word(cell: ElementRef) -> String {
    cell.text()
        .map(|text| {
            fold_fullwidth(text)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase()
        })
        .collect()
}

/// The deck marks okurigana with a `*` between stem and ending.
fn split_okurigana(word: &str) -> (String, Option<String>) {
    match word.split_once('*') {
        Some((stem, suffix)) if !suffix.is_empty() => {
            (stem.to_string(), Some(suffix.replace('*', "")))
        }
        Some((stem, _)) => (stem.to_string(), None),
        None => (word.to_string(), None),
    }
}

fn direct_text(cell: ElementRef) -> String {
    let mut out = String::new();
    for child in cell.children() {
        if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
    fold_fullwidth(&out).trim().to_string()
}

fn paragraph_first_text(cell: ElementRef) -> String {
    let paragraph_selector = Selector::parse("p").unwrap();
    let Some(paragraph) = cell.select(&paragraph_selector).next() else {
        return String::new();
    };
    for child in paragraph.children() {
        if let Node::Text(text) = child.value() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return fold_fullwidth(trimmed);
            }
        }
    }
    String::new()
}
