use crate::cache::WordCache;
use crate::deck::PrimaryWord;
use crate::extract::ReadingGroups;
use crate::freq::WordFrequencyTable;
pub use crate::{log_debug, log_info};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const HONORIFIC_PREFIX: &str = "お";

/// One candidate vocabulary word for a kanji.
///
/// `sort` ranks entries across sources: deck words carry negative values in
/// deck order, scraped words carry the number of deck words that preceded
/// them in their reading group. `sort2` ranks within one `sort` value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordEntry {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    pub furigana: String,
    pub meaning: String,
    pub sort: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort2: Option<f64>,
}

impl WordEntry {
    /// Display text: prefix, stem and okurigana suffix joined.
    pub fn rendered(&self) -> String {
        let mut out = String::new();
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
        }
        out.push_str(&self.word);
        if let Some(suffix) = &self.suffix {
            out.push_str(suffix);
        }
        out
    }
}

enum WordMatch {
    Exact,
    /// Same word once the honorific prefix is added to a deck entry that
    /// does not carry one yet.
    Honorific,
}

fn match_against(entry: &WordEntry, text: &str) -> Option<WordMatch> {
    let rendered = entry.rendered();
    if rendered == text {
        return Some(WordMatch::Exact);
    }
    if entry.sort < 0
        && entry.prefix.is_none()
        && format!("{}{}", HONORIFIC_PREFIX, rendered) == text
    {
        return Some(WordMatch::Honorific);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Only the bundled deck contributed words.
    PrimaryOnly,
    /// The compound site had data for this kanji.
    Merged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanjiRecord {
    pub kanji: String,
    pub provenance: Provenance,
    pub entries: Vec<WordEntry>,
}

/// Counters for one merge pass, returned alongside the records instead of
/// living in shared state.
#[derive(Debug, Default)]
pub struct MergeStats {
    pub kanji_total: usize,
    pub kanji_without_secondary: usize,
    pub entries_emitted: usize,
    pub freq_hits: usize,
    pub cross_kanji_repeats: usize,
    seen_words: HashMap<String, String>,
}

impl MergeStats {
    fn record_secondary(&mut self, word: &str, kanji: &str, in_freq: bool) {
        match self.seen_words.get(word) {
            Some(first_kanji) => {
                if first_kanji != kanji {
                    self.cross_kanji_repeats += 1;
                }
            }
            None => {
                if in_freq {
                    self.freq_hits += 1;
                }
                self.seen_words
                    .insert(word.to_string(), kanji.to_string());
            }
        }
    }

    pub fn distinct_words(&self) -> usize {
        self.seen_words.len()
    }

    pub fn log_summary(&self) {
        log_info!(
            "[merge] {} kanji processed, {} without secondary data",
            self.kanji_total,
            self.kanji_without_secondary
        );
        log_info!(
            "[merge] emitted {} entries, frequency hit rate: {}/{}",
            self.entries_emitted,
            self.freq_hits,
            self.distinct_words()
        );
        if self.cross_kanji_repeats > 0 {
            log_debug!(
                "[merge] {} secondary words repeated across kanji",
                self.cross_kanji_repeats
            );
        }
    }
}

/// Merges the deck's word lists with the scraped compound cache into one
/// ranked record per kanji, in the given kanji order.
pub fn merge(
    kanjis: &[String],
    primary: &HashMap<String, Vec<PrimaryWord>>,
    secondary: &WordCache,
    freq: &WordFrequencyTable,
    top_per_group: usize,
) -> (Vec<KanjiRecord>, MergeStats) {
    let mut stats = MergeStats::default();
    let mut records = Vec::with_capacity(kanjis.len());

    for kanji in kanjis {
        let primary_words = primary.get(kanji).map(Vec::as_slice).unwrap_or(&[]);
        let groups = secondary.words(kanji);

        let record = merge_kanji(kanji, primary_words, groups, freq, top_per_group, &mut stats);

        stats.kanji_total += 1;
        if groups.is_none() {
            stats.kanji_without_secondary += 1;
        }
        stats.entries_emitted += record.entries.len();
        records.push(record);
    }

    (records, stats)
}

fn merge_kanji(
    kanji: &str,
    primary_words: &[PrimaryWord],
    groups: Option<&ReadingGroups>,
    freq: &WordFrequencyTable,
    top_per_group: usize,
    stats: &mut MergeStats,
) -> KanjiRecord {
    let total = primary_words.len() as i32;
    let mut entries: Vec<WordEntry> = primary_words
        .iter()
        .enumerate()
        .map(|(i, word)| WordEntry {
            word: word.word.clone(),
            prefix: None,
            suffix: word.suffix.clone(),
            furigana: String::new(),
            meaning: word.meaning.clone(),
            sort: i as i32 - total,
            sort2: None,
        })
        .collect();

    if let Some(groups) = groups {
        if groups.is_empty() {
            log_debug!("[merge] {}: compound table cached empty", kanji);
        }
        for (_, words) in groups.iter() {
            // Deck words seen so far in this reading group; unmatched words
            // are ranked below the deck words that precede them.
            let mut primary_in_group = 0;

            for (index, candidate) in words.iter().enumerate() {
                let position = index + 1;
                let frequency = freq.get(&candidate.word);
                stats.record_secondary(&candidate.word, kanji, frequency.is_some());

                let found = entries
                    .iter()
                    .enumerate()
                    .find_map(|(i, entry)| {
                        match_against(entry, &candidate.word).map(|kind| (i, kind))
                    });

                match found {
                    Some((i, kind)) => {
                        let entry = &mut entries[i];
                        let primary_sourced = entry.sort < 0;
                        if let WordMatch::Honorific = kind {
                            entry.prefix = Some(HONORIFIC_PREFIX.to_string());
                        }
                        if entry.sort2.is_none() {
                            entry.meaning = join_meanings(&candidate.meaning, &entry.meaning);
                            entry.sort2 = Some(position as f64);
                            if entry.furigana.is_empty() && !candidate.furigana.is_empty() {
                                entry.furigana = candidate.furigana.clone();
                            }
                        }
                        if primary_sourced {
                            primary_in_group += 1;
                        }
                    }
                    None => {
                        entries.push(WordEntry {
                            word: candidate.word.clone(),
                            prefix: None,
                            suffix: None,
                            furigana: candidate.furigana.clone(),
                            meaning: candidate.meaning.clone(),
                            sort: primary_in_group,
                            sort2: Some(match frequency {
                                Some(f) => 1.0 - f,
                                None => position as f64,
                            }),
                        });
                    }
                }
            }
        }
    }

    KanjiRecord {
        kanji: kanji.to_string(),
        provenance: if groups.is_some() {
            Provenance::Merged
        } else {
            Provenance::PrimaryOnly
        },
        entries: rank(entries, top_per_group),
    }
}

fn join_meanings(secondary: &str, primary: &str) -> String {
    match (secondary.is_empty(), primary.is_empty()) {
        (true, _) => primary.to_string(),
        (_, true) => secondary.to_string(),
        _ => format!("{}; {}", secondary, primary),
    }
}

/// Final emission order: deck entries by rank, then each non-negative rank
/// group by secondary rank, truncated to the best candidates.
fn rank(entries: Vec<WordEntry>, top_per_group: usize) -> Vec<WordEntry> {
    let mut ordered: Vec<WordEntry> = Vec::with_capacity(entries.len());
    let mut groups: BTreeMap<i32, Vec<WordEntry>> = BTreeMap::new();

    for entry in entries {
        if entry.sort < 0 {
            ordered.push(entry);
        } else {
            groups.entry(entry.sort).or_default().push(entry);
        }
    }

    ordered.sort_by_key(|entry| entry.sort);

    for (_, mut group) in groups {
        group.sort_by(|a, b| {
            let a2 = a.sort2.unwrap_or(f64::MAX);
            let b2 = b.sort2.unwrap_or(f64::MAX);
            a2.total_cmp(&b2)
        });
        group.truncate(top_per_group);
        ordered.extend(group);
    }

    ordered
}
