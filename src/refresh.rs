use crate::anki::template::{ensure_stroke_order_css, TemplateSet};
use crate::anki::{AnkiConnectClient, NotePayload};
use crate::client::Client;
use crate::config::Config;
use crate::deck;
use crate::error::{DeckError, Result};
use crate::extract::{KanjiPage, Scraper};
use crate::media::{self, MediaStore};
pub use crate::{log_debug, log_info, log_warn};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

const FIRST_PAGE: &str = "/kanji/1";

#[derive(Debug, Default)]
pub struct RefreshStats {
    pub pages: usize,
    pub updated: usize,
    pub added: usize,
    pub ignored: usize,
    pub failed: usize,
    pub media_files: usize,
}

impl RefreshStats {
    pub fn log_summary(&self) {
        log_info!(
            "[refresh] crawled {} pages: {} updated, {} added, {} ignored, {} failed",
            self.pages,
            self.updated,
            self.added,
            self.ignored,
            self.failed
        );
        log_info!("[refresh] pushed {} media files to the store", self.media_files);
    }
}

/// Crawls the reference site page by page and syncs every kanji into the
/// deck's notes. Setup problems (missing model or deck) are fatal; one bad
/// page is logged and skipped.
pub async fn run(
    site: &Client,
    anki: &AnkiConnectClient,
    config: &Config,
    force: bool,
    limit: Option<usize>,
) -> Result<RefreshStats> {
    let model = config.anki.model.as_str();
    let models = anki.model_names().await?;
    if !models.iter().any(|name| name == model) {
        return Err(DeckError::MissingModel(model.to_string()).into());
    }
    // New notes land in the stock deck, or the reordered one when only
    // that variant was imported.
    let decks = anki.deck_names().await?;
    let deck = [&config.anki.deck, &config.anki.reordered_deck]
        .into_iter()
        .find(|name| decks.iter().any(|existing| &existing == name))
        .cloned()
        .ok_or_else(|| DeckError::MissingDeck(config.anki.deck.clone()))?;

    refresh_templates(anki, config).await?;
    let key_map = load_key_map(anki, model).await?;

    let mut refresh = Refresh {
        site,
        anki,
        config,
        deck,
        media: MediaStore::new(&config.paths.media_dir, force),
        key_map,
        pushed_media: HashSet::new(),
        stats: RefreshStats::default(),
    };
    refresh.crawl(limit).await;
    refresh.stats.log_summary();
    Ok(refresh.stats)
}

/// Rewrites the model's card templates from local override files and makes
/// sure the stroke order class is styled.
async fn refresh_templates(anki: &AnkiConnectClient, config: &Config) -> Result<()> {
    let model = config.anki.model.as_str();
    let set = TemplateSet::new(
        &config.paths.template_dir,
        config.anki.template_prefix.as_str(),
    );

    let mut templates = anki.model_templates(model).await?;
    if set.apply(&mut templates)? {
        anki.update_model_templates(model, &templates).await?;
        log_info!("[refresh] card templates updated from override files");
    }

    let css = anki.model_styling(model).await?;
    if let Some(updated) = ensure_stroke_order_css(&css) {
        anki.update_model_styling(model, &updated).await?;
        log_info!("[refresh] stroke order styling appended to model");
    }
    Ok(())
}

async fn load_key_map(anki: &AnkiConnectClient, model: &str) -> Result<HashMap<String, u64>> {
    let ids = anki.find_notes(&format!("note:\"{}\"", model)).await?;
    let notes = anki.notes_info(&ids).await?;
    let map = deck::key_map(&notes)?;
    log_info!("[refresh] {} notes already in the deck", map.len());
    Ok(map)
}

struct Refresh<'a> {
    site: &'a Client,
    anki: &'a AnkiConnectClient,
    config: &'a Config,
    deck: String,
    media: MediaStore,
    key_map: HashMap<String, u64>,
    pushed_media: HashSet<PathBuf>,
    stats: RefreshStats,
}

impl Refresh<'_> {
    async fn crawl(&mut self, limit: Option<usize>) {
        let mut next = Some(FIRST_PAGE.to_string());
        let mut tries = 0;

        while let Some(current) = next.take() {
            if limit.is_some_and(|limit| self.stats.pages >= limit) {
                log_info!("[refresh] page limit reached");
                break;
            }

            let response = match self.site.get(&current).await {
                Ok(response) => response,
                Err(err) => {
                    tries += 1;
                    if tries > self.config.sites.max_retries {
                        log_warn!("[refresh] giving up on {}: {}", current, err);
                        break;
                    }
                    log_warn!(
                        "[refresh] retry {}/{} for {}",
                        tries,
                        self.config.sites.max_retries,
                        current
                    );
                    tokio::time::sleep(Duration::from_secs(self.config.sites.retry_delay)).await;
                    next = Some(current);
                    continue;
                }
            };
            tries = 0;
            self.stats.pages += 1;
            log_debug!(
                "[refresh] {} answered {} ({} bytes)",
                current,
                response.status,
                response.content.len()
            );

            let scraper = Scraper::new(&response.content);
            let page_scraper = scraper.kanji_page();
            // The next link does not depend on a clean extraction; keep
            // crawling past broken pages.
            next = page_scraper.next_path();

            match page_scraper.extract() {
                Ok(page) => {
                    if let Err(err) = self.sync_page(page).await {
                        self.stats.failed += 1;
                        log_warn!("[refresh] failed to sync {}: {}", current, err);
                    }
                }
                Err(err) => {
                    self.stats.failed += 1;
                    log_warn!("[refresh] skipping {}: {}", current, err);
                }
            }

            if next.is_some() {
                tokio::time::sleep(Duration::from_secs(self.config.sites.request_delay)).await;
            }
        }
    }

    async fn sync_page(&mut self, mut page: KanjiPage) -> Result<()> {
        let mut referenced: Vec<PathBuf> = Vec::new();
        for html in page.html_fields() {
            let absolute = media::absolutize_links(html, &self.config.sites.kanjidamage_url);
            let (localized, paths) = self.media.localize(&absolute, self.site).await?;
            *html = localized;
            referenced.extend(paths);
        }
        for path in referenced {
            self.push_media(path).await;
        }

        // Image glyphs cannot key a note; those pages are keyed by meaning.
        let key = if page.glyph.is_image() {
            Some(page.meaning.clone())
        } else if deck::is_valid_key(page.glyph.as_field()) {
            Some(page.glyph.as_field().to_string())
        } else {
            None
        };
        let Some(key) = key else {
            self.stats.ignored += 1;
            log_info!("[refresh] ignored kanji: {}", page.glyph.as_field());
            return Ok(());
        };

        let fields: HashMap<String, String> = page
            .note_fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        match self.key_map.get(&key) {
            Some(&note_id) => {
                self.anki.update_note_fields(note_id, &fields).await?;
                self.stats.updated += 1;
            }
            None => {
                let note = NotePayload {
                    deck_name: self.deck.clone(),
                    model_name: self.config.anki.model.clone(),
                    fields,
                    tags: Vec::new(),
                };
                let note_id = self.anki.add_note(&note).await?;
                self.key_map.insert(key, note_id);
                self.stats.added += 1;
            }
        }
        Ok(())
    }

    /// Registers one downloaded file with the store, once per run. Media
    /// failures stay cosmetic and never fail the page.
    async fn push_media(&mut self, path: PathBuf) {
        if !self.pushed_media.insert(path.clone()) {
            return;
        }
        let filename = media::local_name_of(&path);
        let absolute = match std::fs::canonicalize(&path) {
            Ok(absolute) => absolute,
            Err(err) => {
                log_warn!("[refresh] cannot resolve media file {:?}: {}", path, err);
                return;
            }
        };
        match self.anki.store_media_file(&filename, &absolute).await {
            Ok(_) => self.stats.media_files += 1,
            Err(err) => {
                log_warn!("[refresh] failed to push media {}: {}", filename, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anki::TemplateSides;

    #[test]
    fn stats_start_empty() {
        let stats = RefreshStats::default();
        assert_eq!(stats.pages, 0);
        assert_eq!(stats.media_files, 0);
    }

    #[test]
    fn missing_overrides_leave_model_templates_alone() {
        // The crawl only writes templates back when an override file
        // exists; this is the guard refresh_templates relies on.
        let set = TemplateSet::new("no-such-directory", "kd");
        let mut templates = HashMap::from([(
            "Read".to_string(),
            TemplateSides {
                front: "{{Kanji}}".to_string(),
                back: "{{Meaning}}".to_string(),
            },
        )]);
        assert!(!set.apply(&mut templates).unwrap());
    }
}
