use super::rules;
use super::{element_text, first_text, following_element, sibling_fragment};
use crate::error::{ExtractError, Result};
use scraper::{ElementRef, Html, Selector};

/// The character a detail page describes. Rare characters are shipped as
/// inline images instead of text; those pages are keyed by meaning.
#[derive(Debug, Clone, PartialEq)]
pub enum Glyph {
    Character(String),
    Image(String),
}

impl Glyph {
    pub fn is_image(&self) -> bool {
        matches!(self, Glyph::Image(_))
    }

    /// The note field value for the glyph.
    pub fn as_field(&self) -> &str {
        match self {
            Glyph::Character(text) => text,
            Glyph::Image(html) => html,
        }
    }
}

impl Default for Glyph {
    fn default() -> Self {
        Glyph::Character(String::new())
    }
}

/// Everything one kanji detail page yields. Reading and compound sections
/// come in a serialized "full" form plus the first row broken out, which is
/// what the card templates show on the front.
#[derive(Debug, Clone, Default)]
pub struct KanjiPage {
    pub glyph: Glyph,
    pub meaning: String,
    pub number: String,
    pub usefulness: String,
    pub description: String,
    pub used_in: String,
    pub onyomi_full: String,
    pub onyomi: String,
    pub kunyomi_full: String,
    pub kunyomi: String,
    pub kunyomi_meaning: String,
    pub kunyomi_usefulness: String,
    pub mnemonic_full: String,
    pub mnemonic: String,
    pub components: String,
    pub jukugo_full: String,
    pub jukugo: String,
    pub jukugo_meaning: String,
    pub jukugo_usefulness: String,
    pub header: String,
    pub lookalikes: String,
}

impl KanjiPage {
    /// Field names and values in the note model's order.
    pub fn note_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Kanji", self.glyph.as_field()),
            ("Meaning", self.meaning.as_str()),
            ("Number", self.number.as_str()),
            ("Description", self.description.as_str()),
            ("Usefulness", self.usefulness.as_str()),
            ("Full used In", self.used_in.as_str()),
            ("Full onyomi", self.onyomi_full.as_str()),
            ("Onyomi", self.onyomi.as_str()),
            ("Full kunyomi", self.kunyomi_full.as_str()),
            ("First kunyomi", self.kunyomi.as_str()),
            ("First kunyomi meaning", self.kunyomi_meaning.as_str()),
            ("First kunyomi usefulness", self.kunyomi_usefulness.as_str()),
            ("Full mnemonic", self.mnemonic_full.as_str()),
            ("Mnemonic", self.mnemonic.as_str()),
            ("Components", self.components.as_str()),
            ("Full jukugo", self.jukugo_full.as_str()),
            ("First jukugo", self.jukugo.as_str()),
            ("First jukugo meaning", self.jukugo_meaning.as_str()),
            ("First jukugo usefulness", self.jukugo_usefulness.as_str()),
            ("Full header", self.header.as_str()),
            ("Full lookalikes", self.lookalikes.as_str()),
        ]
    }

    /// Mutable references to the fields that hold HTML fragments, for media
    /// localization.
    pub fn html_fields(&mut self) -> Vec<&mut String> {
        let mut fields = vec![
            &mut self.description,
            &mut self.used_in,
            &mut self.onyomi_full,
            &mut self.kunyomi_full,
            &mut self.kunyomi,
            &mut self.mnemonic_full,
            &mut self.mnemonic,
            &mut self.components,
            &mut self.jukugo_full,
            &mut self.jukugo,
            &mut self.header,
            &mut self.lookalikes,
        ];
        if let Glyph::Image(html) = &mut self.glyph {
            fields.push(html);
        }
        fields
    }
}

pub struct KanjiPageScraper<'a> {
    document: &'a Html,
}

impl<'a> KanjiPageScraper<'a> {
    pub(crate) fn new(document: &'a Html) -> Self {
        Self { document }
    }

    /// Path of the next detail page, read independently of field extraction
    /// so the crawl can continue past a broken page.
    pub fn next_path(&self) -> Option<String> {
        rules::NEXT_LINK.apply(self.document).ok().flatten()
    }

    pub fn extract(&self) -> Result<KanjiPage> {
        let glyph = self.extract_glyph()?;
        let meaning = rules::MEANING.require(self.document)?;
        let number = self.extract_number()?;

        let mut page = KanjiPage {
            glyph,
            meaning,
            number,
            usefulness: self.optional(&rules::USEFULNESS),
            description: self.optional(&rules::DESCRIPTION),
            used_in: self.optional(&rules::USED_IN),
            header: self.optional(&rules::HEADER),
            components: self.extract_components(),
            lookalikes: self.extract_lookalikes(),
            ..KanjiPage::default()
        };

        if let Some(table) = self.section_table(rules::ONYOMI_TITLE) {
            page.onyomi_full = table.html().trim().to_string();
            page.onyomi = self
                .first_cell(table, 0)
                .and_then(|td| self.select_text(td, rules::ONYOMI_READING))
                .unwrap_or_default();
        }

        if let Some(table) = self.section_table(rules::KUNYOMI_TITLE) {
            page.kunyomi_full = table.html().trim().to_string();
            page.kunyomi = self
                .first_cell(table, 0)
                .map(|td| td.inner_html().trim().to_string())
                .unwrap_or_default();
            page.kunyomi_meaning = self
                .first_cell(table, 1)
                .and_then(first_text)
                .unwrap_or_default();
            page.kunyomi_usefulness = self
                .first_cell(table, 1)
                .and_then(|td| self.select_text(td, rules::STARS))
                .unwrap_or_default();
        }

        if let Some(table) = self.section_table(rules::MNEMONIC_TITLE) {
            page.mnemonic_full = table.html().trim().to_string();
            page.mnemonic = self
                .first_cell(table, 1)
                .and_then(|td| self.select_first(td, rules::PARAGRAPH))
                .map(|p| p.inner_html().trim().to_string())
                .unwrap_or_default();
        }

        if let Some(table) = self.section_table(rules::JUKUGO_TITLE) {
            page.jukugo_full = table.html().trim().to_string();
            page.jukugo = self
                .first_cell(table, 0)
                .map(|td| td.inner_html().trim().to_string())
                .unwrap_or_default();
            let paragraph = self
                .first_cell(table, 1)
                .and_then(|td| self.select_first(td, rules::PARAGRAPH));
            if let Some(p) = paragraph {
                page.jukugo_meaning = first_text(p).unwrap_or_default();
                page.jukugo_usefulness = self.select_text(p, rules::STARS).unwrap_or_default();
            }
        }

        Ok(page)
    }

    fn extract_glyph(&self) -> Result<Glyph> {
        let selector = Selector::parse(rules::GLYPH_SELECTOR).unwrap();
        let span = self
            .document
            .select(&selector)
            .next()
            .ok_or(ExtractError::StructureMismatch { field: "kanji" })?;

        let img_selector = Selector::parse("img").unwrap();
        if let Some(img) = span.select(&img_selector).next() {
            return Ok(Glyph::Image(img.html()));
        }

        let text =
            first_text(span).ok_or(ExtractError::StructureMismatch { field: "kanji" })?;
        Ok(Glyph::Character(text))
    }

    fn extract_number(&self) -> Result<String> {
        let number = rules::NUMBER.require(self.document)?;
        if number.parse::<i64>().is_err() {
            return Err(ExtractError::InvalidNumber { value: number }.into());
        }
        Ok(number)
    }

    /// Trailing content of the page header: the component breakdown sits
    /// between the `</h1>` and the end of the header div.
    fn extract_components(&self) -> String {
        let selector = Selector::parse(rules::GLYPH_SELECTOR).unwrap();
        self.document
            .select(&selector)
            .next()
            .and_then(|span| span.parent())
            .and_then(ElementRef::wrap)
            .map(|h1| sibling_fragment(h1, None))
            .unwrap_or_default()
    }

    fn extract_lookalikes(&self) -> String {
        self.heading(rules::LOOKALIKES_TITLE)
            .map(|h2| sibling_fragment(h2, Some(rules::HEADING)))
            .unwrap_or_default()
    }

    fn optional(&self, rule: &rules::FieldRule) -> String {
        rule.apply(self.document)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    fn heading(&self, title: &str) -> Option<ElementRef<'a>> {
        let selector = Selector::parse(rules::HEADING).unwrap();
        self.document
            .select(&selector)
            .find(|h2| element_text(*h2) == title)
    }

    fn section_table(&self, title: &str) -> Option<ElementRef<'a>> {
        let heading = self.heading(title)?;
        following_element(heading, "table", Some(rules::DEFINITION_TABLE_CLASS))
    }

    fn first_cell(&self, table: ElementRef<'a>, index: usize) -> Option<ElementRef<'a>> {
        let row_selector = Selector::parse(rules::ROW).unwrap();
        let cell_selector = Selector::parse(rules::CELL).unwrap();
        let row = table.select(&row_selector).next()?;
        row.select(&cell_selector).nth(index)
    }

    fn select_first(&self, scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
        let selector = Selector::parse(selector).unwrap();
        scope.select(&selector).next()
    }

    fn select_text(&self, scope: ElementRef<'a>, selector: &str) -> Option<String> {
        self.select_first(scope, selector).map(element_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Scraper;

    const PAGE: &str = r##"
<html><body>
<div class="row">
  <div class="span8 text-centered"><img alt="Flag" src="/flags/1.png">Number 335</div>
  <div class="span4 text-righted"><span class="usefulness-stars">★★★★★</span></div>
</div>
<div class="row">
  <div class="span8">
    <h1><span class="kanji_character">火</span><span class="translation">fire</span></h1>
    <a href="/kanji/354">木</a> (tree) + <a href="/kanji/23">人</a> (person)
  </div>
  <div class="span2 text-righted"><a href="/kanji/336">Next</a></div>
</div>
<div class="description"><p>Flames and <em>heat</em>.</p></div>
<h2>Onyomi</h2>
<table class="definition"><tbody>
  <tr><td><span class="onyomi">カ</span></td><td>as in <b>fire</b></td></tr>
</tbody></table>
<h2>Mnemonic</h2>
<table class="definition"><tbody>
  <tr><td>火</td><td><p>A <b>person</b> waving flaming arms.</p></td></tr>
</tbody></table>
<h2>Kunyomi</h2>
<table class="definition"><tbody>
  <tr><td>ひ・bana</td><td>fire, flame<span class="usefulness-stars">★★★★</span></td></tr>
  <tr><td>ほ</td><td>archaic flame</td></tr>
</tbody></table>
<h2>Jukugo</h2>
<table class="definition"><tbody>
  <tr><td>火曜日</td><td><p>Tuesday<br><span class="usefulness-stars">★★★★★</span></p></td></tr>
</tbody></table>
<h2>Used In</h2>
<ul class="lacidar"><li><a href="/kanji/900">灰</a></li></ul>
<h2>Lookalikes</h2>
<p>Not to be confused with</p>
<table class="definition"><tbody><tr><td>人</td></tr></tbody></table>
<h2>Footer</h2>
</body></html>
"##;

    #[test]
    fn extracts_all_sections() {
        let scraper = Scraper::new(PAGE);
        let page = scraper.kanji_page().extract().unwrap();

        assert_eq!(page.glyph, Glyph::Character("火".to_string()));
        assert_eq!(page.meaning, "fire");
        assert_eq!(page.number, "335");
        assert_eq!(page.usefulness, "★★★★★");
        assert_eq!(page.description, "<p>Flames and <em>heat</em>.</p>");
        assert!(page.used_in.starts_with("<ul class=\"lacidar\">"));
        assert_eq!(page.onyomi, "カ");
        assert!(page.onyomi_full.contains("<span class=\"onyomi\">カ</span>"));
        assert_eq!(page.kunyomi, "ひ・bana");
        assert_eq!(page.kunyomi_meaning, "fire, flame");
        assert_eq!(page.kunyomi_usefulness, "★★★★");
        assert_eq!(page.mnemonic, "A <b>person</b> waving flaming arms.");
        assert_eq!(page.jukugo, "火曜日");
        assert_eq!(page.jukugo_meaning, "Tuesday");
        assert_eq!(page.jukugo_usefulness, "★★★★★");
        assert!(page.components.contains("href=\"/kanji/354\""));
        assert!(page.components.contains("(tree) +"));
        assert!(page.lookalikes.starts_with("<p>Not to be confused with</p>"));
        assert!(page.lookalikes.contains("人"));
        assert!(!page.lookalikes.contains("Footer"));
        assert!(page.header.starts_with("<div class=\"span8\">"));
    }

    #[test]
    fn next_path_is_independent_of_extraction() {
        let scraper = Scraper::new(PAGE);
        assert_eq!(
            scraper.kanji_page().next_path(),
            Some("/kanji/336".to_string())
        );

        let broken = Scraper::new(
            r#"<div class="span2 text-righted"><a href="/kanji/2">Next</a></div>"#,
        );
        assert_eq!(broken.kanji_page().next_path(), Some("/kanji/2".to_string()));
        assert!(broken.kanji_page().extract().is_err());
    }

    #[test]
    fn image_glyph_is_flagged() {
        let scraper = Scraper::new(
            r#"
<div class="span8 text-centered">Number 1041</div>
<div class="span8">
  <h1><span class="kanji_character"><img src="/images/1041.gif"></span>
      <span class="translation">rare bird</span></h1>
</div>"#,
        );
        let page = scraper.kanji_page().extract().unwrap();
        assert!(page.glyph.is_image());
        assert!(page.glyph.as_field().contains("src=\"/images/1041.gif\""));
        assert_eq!(page.meaning, "rare bird");
    }

    #[test]
    fn missing_meaning_is_structure_mismatch() {
        let scraper = Scraper::new(
            r#"
<div class="span8 text-centered">Number 3</div>
<div class="span8"><h1><span class="kanji_character">山</span></h1></div>"#,
        );
        assert!(scraper.kanji_page().extract().is_err());
    }

    #[test]
    fn non_numeric_ordinal_is_rejected() {
        let scraper = Scraper::new(
            r#"
<div class="span8 text-centered">Number x√</div>
<div class="span8">
  <h1><span class="kanji_character">山</span><span class="translation">mountain</span></h1>
</div>"#,
        );
        assert!(scraper.kanji_page().extract().is_err());
    }

    #[test]
    fn absent_sections_degrade_to_empty() {
        let scraper = Scraper::new(
            r#"
<div class="span8 text-centered">Number 7</div>
<div class="span8">
  <h1><span class="kanji_character">山</span><span class="translation">mountain</span></h1>
</div>"#,
        );
        let page = scraper.kanji_page().extract().unwrap();
        assert_eq!(page.onyomi_full, "");
        assert_eq!(page.kunyomi, "");
        assert_eq!(page.jukugo_meaning, "");
        assert_eq!(page.lookalikes, "");
        assert_eq!(page.description, "");
    }

    #[test]
    fn media_fields_include_image_glyph() {
        let mut page = KanjiPage {
            glyph: Glyph::Image("<img src=\"/x.gif\">".to_string()),
            ..KanjiPage::default()
        };
        let with_image = page.html_fields().len();

        let mut page = KanjiPage::default();
        assert_eq!(page.html_fields().len() + 1, with_image);
    }

    #[test]
    fn note_fields_follow_model_order() {
        let page = KanjiPage {
            glyph: Glyph::Character("火".to_string()),
            meaning: "fire".to_string(),
            ..KanjiPage::default()
        };
        let fields = page.note_fields();
        assert_eq!(fields[0], ("Kanji", "火"));
        assert_eq!(fields[1], ("Meaning", "fire"));
        assert_eq!(fields.len(), 21);
    }
}
