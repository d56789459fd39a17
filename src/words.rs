use crate::anki::template::TemplateSet;
use crate::anki::{AnkiConnectClient, CardSink, TemplateSides};
use crate::cache::WordCache;
use crate::client::Client;
use crate::config::Config;
use crate::deck::SourceWords;
use crate::error::{DeckError, Result};
use crate::extract::{ReadingGroups, Scraper};
use crate::freq::WordFrequencyTable;
use crate::merge::{self, KanjiRecord, WordEntry};
use crate::utils;
pub use crate::{log_debug, log_info, log_warn};
use std::path::PathBuf;
use std::time::Duration;

pub struct BuildOptions {
    pub force: bool,
    pub limit: Option<usize>,
    pub dump: Option<PathBuf>,
    pub export: Option<PathBuf>,
}

/// Rebuilds the vocabulary deck: reads the kanji order and word lists out
/// of the bundled deck, refreshes the compound cache from the dictionary
/// site, merges both against the frequency table and emits the ranked
/// entries through the sink.
pub async fn run(
    tangorin: &Client,
    anki: &AnkiConnectClient,
    sink: &mut dyn CardSink,
    config: &Config,
    options: &BuildOptions,
) -> Result<()> {
    let source_deck = locate_source_deck(anki, config).await?;
    let query = format!(
        "deck:\"{}\" card:{}",
        source_deck, config.anki.read_template
    );
    let ids = anki.find_cards(&query).await?;
    log_info!("[build] {} cards in {}", ids.len(), source_deck);

    let cards = anki.cards_info(&ids).await?;
    let mut source = SourceWords::from_cards(cards)?;
    if let Some(limit) = options.limit {
        source.order.truncate(limit);
    }
    if source.is_empty() {
        log_warn!("[build] no kanji cards in {}", source_deck);
    } else {
        log_info!("[build] merging words for {} kanji", source.len());
    }

    let mut cache = WordCache::load(&config.paths.cache_file);
    refresh_cache(
        tangorin,
        &source.order,
        &mut cache,
        options.force,
        Duration::from_secs(config.sites.request_delay),
    )
    .await;
    if let Err(err) = cache.save(&config.paths.cache_file) {
        log_warn!("[build] could not save cache: {}", err);
    }

    let freq = WordFrequencyTable::load(&config.paths.freq_file);

    if cache.is_empty() {
        log_warn!("[build] compound cache is empty, cards will carry deck words only");
    }
    let (records, stats) = merge::merge(
        &source.order,
        &source.words,
        &cache,
        &freq,
        config.merge.top_per_group,
    );
    stats.log_summary();

    if let Some(path) = &options.dump {
        utils::save_json(&records, path)?;
        log_info!("[build] ranked records dumped to {}", path.display());
    }

    let templates = TemplateSet::new(
        &config.paths.template_dir,
        config.anki.words_template_prefix.as_str(),
    );
    let emitted = emit(
        &records,
        vec![templates.words_template()?],
        &config.anki.words_deck,
        &config.anki.words_model,
        sink,
    )
    .await?;
    log_info!(
        "[build] emitted {} notes into {}",
        emitted,
        config.anki.words_deck
    );

    if let Some(path) = &options.export {
        anki.export_package(&config.anki.words_deck, path).await?;
        log_info!("[build] deck exported to {}", path.display());
    }
    Ok(())
}

/// The kanji order comes from the reordered deck when it exists, else the
/// stock deck.
async fn locate_source_deck(anki: &AnkiConnectClient, config: &Config) -> Result<String> {
    let decks = anki.deck_names().await?;
    for candidate in [&config.anki.reordered_deck, &config.anki.deck] {
        if decks.iter().any(|name| name == candidate) {
            return Ok(candidate.clone());
        }
    }
    Err(DeckError::MissingDeck(config.anki.reordered_deck.clone()).into())
}

/// Fetches compounds for every kanji not yet cached (all of them under
/// force). Transport failures leave the kanji uncached so the next run
/// retries; a page without a compounds table is cached as definitive
/// "no data".
async fn refresh_cache(
    tangorin: &Client,
    kanjis: &[String],
    cache: &mut WordCache,
    force: bool,
    delay: Duration,
) {
    let total = kanjis.len();
    for (i, kanji) in kanjis.iter().enumerate() {
        if !force && cache.contains(kanji) {
            log_debug!("[build] [{}/{}] {}: cached", i + 1, total, kanji);
            continue;
        }
        match fetch_words(tangorin, kanji).await {
            Ok(groups) => {
                log_debug!(
                    "[build] [{}/{}] {}: {} readings",
                    i + 1,
                    total,
                    kanji,
                    groups.as_ref().map_or(0, ReadingGroups::len)
                );
                cache.insert(kanji.clone(), groups);
            }
            Err(err) => {
                log_warn!("[build] [{}/{}] {}: fetch failed: {}", i + 1, total, kanji, err);
            }
        }
        tokio::time::sleep(delay).await;
    }
}

async fn fetch_words(tangorin: &Client, kanji: &str) -> Result<Option<ReadingGroups>> {
    let response = tangorin.get(&format!("/kanji/{}", kanji)).await?;
    let scraper = Scraper::new(&response.content);
    Ok(scraper.compounds().extract())
}

async fn emit(
    records: &[KanjiRecord],
    templates: Vec<(String, TemplateSides)>,
    deck: &str,
    model: &str,
    sink: &mut dyn CardSink,
) -> Result<usize> {
    sink.create_or_reset(deck, model, &["Front", "Back"], &templates)
        .await?;
    let mut emitted = 0;
    for record in records {
        for entry in &record.entries {
            sink.add_note(note_values(entry)).await?;
            emitted += 1;
        }
    }
    sink.commit().await?;
    Ok(emitted)
}

fn note_values(entry: &WordEntry) -> Vec<(String, String)> {
    let mut back = String::new();
    if !entry.furigana.is_empty() {
        back.push_str("<h3>");
        back.push_str(&entry.furigana);
        back.push_str("</h3>");
    }
    if !entry.meaning.is_empty() {
        if !back.is_empty() {
            back.push_str("<br>");
        }
        back.push_str(&entry.meaning);
    }
    vec![
        ("Front".to_string(), format!("<h3>{}</h3>", entry.rendered())),
        ("Back".to_string(), back),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::merge::Provenance;

    fn entry(word: &str, furigana: &str, meaning: &str) -> WordEntry {
        WordEntry {
            word: word.to_string(),
            prefix: None,
            suffix: None,
            furigana: furigana.to_string(),
            meaning: meaning.to_string(),
            sort: -1,
            sort2: None,
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        reset: Option<(String, String)>,
        notes: Vec<Vec<(String, String)>>,
        committed: bool,
    }

    #[async_trait::async_trait]
    impl CardSink for RecordingSink {
        async fn create_or_reset(
            &mut self,
            deck: &str,
            model: &str,
            _field_names: &[&str],
            _templates: &[(String, TemplateSides)],
        ) -> Result<()> {
            self.reset = Some((deck.to_string(), model.to_string()));
            Ok(())
        }

        async fn add_note(&mut self, values: Vec<(String, String)>) -> Result<()> {
            self.notes.push(values);
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.committed = true;
            Ok(())
        }
    }

    #[test]
    fn front_wraps_rendered_word_in_heading() {
        let mut word = entry("茶", "おちゃ", "tea");
        word.prefix = Some("お".to_string());
        let values = note_values(&word);
        assert_eq!(values[0], ("Front".to_string(), "<h3>お茶</h3>".to_string()));
        assert_eq!(
            values[1],
            ("Back".to_string(), "<h3>おちゃ</h3><br>tea".to_string())
        );
    }

    #[test]
    fn back_degrades_when_a_side_is_missing() {
        let values = note_values(&entry("火", "", "fire"));
        assert_eq!(values[1].1, "fire");

        let values = note_values(&entry("火", "ひ", ""));
        assert_eq!(values[1].1, "<h3>ひ</h3>");

        let values = note_values(&entry("火", "", ""));
        assert_eq!(values[1].1, "");
    }

    #[tokio::test]
    async fn emit_resets_feeds_and_commits_in_order() {
        let records = vec![
            KanjiRecord {
                kanji: "火".to_string(),
                provenance: Provenance::Merged,
                entries: vec![entry("火", "ひ", "fire"), entry("火山", "かざん", "volcano")],
            },
            KanjiRecord {
                kanji: "水".to_string(),
                provenance: Provenance::PrimaryOnly,
                entries: vec![entry("水", "みず", "water")],
            },
        ];

        let mut sink = RecordingSink::default();
        let emitted = emit(
            &records,
            Vec::new(),
            "KanjiDamage Words",
            "KanjiDamage Words",
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(emitted, 3);
        assert_eq!(
            sink.reset,
            Some(("KanjiDamage Words".to_string(), "KanjiDamage Words".to_string()))
        );
        assert!(sink.committed);
        assert_eq!(sink.notes.len(), 3);
        assert_eq!(sink.notes[0][0].1, "<h3>火</h3>");
        assert_eq!(sink.notes[2][0].1, "<h3>水</h3>");
    }
}
