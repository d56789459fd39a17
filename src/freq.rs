pub use crate::{log_debug, log_info, log_warn};
use std::collections::HashMap;
use std::path::Path;

/// Word frequencies from a static corpus file, max-normalized so the most
/// frequent word maps to exactly 1.0.
///
/// The file is whitespace-delimited with the frequency in the second column
/// and the word in the third. Malformed lines are skipped; a missing file
/// yields an empty table, never an error.
#[derive(Debug, Default)]
pub struct WordFrequencyTable {
    entries: HashMap<String, f64>,
}

impl WordFrequencyTable {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log_warn!(
                    "[freq] no frequency table at {}: {} (ranking degrades to page order)",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        let table = Self::parse(&content);
        if table.is_empty() {
            log_warn!("[freq] no usable entries in {}", path.display());
        } else {
            log_info!("[freq] loaded {} words from {}", table.len(), path.display());
        }
        table
    }

    pub fn parse(content: &str) -> Self {
        let mut raw: HashMap<String, f64> = HashMap::new();
        for (number, line) in content.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (freq, word) = match (fields.get(1), fields.get(2)) {
                (Some(freq), Some(word)) => (*freq, *word),
                _ => {
                    if !line.trim().is_empty() {
                        log_debug!("[freq] skipping malformed line {}", number + 1);
                    }
                    continue;
                }
            };

            let freq = match freq.parse::<f64>() {
                Ok(freq) if freq >= 0.0 => freq,
                _ => {
                    log_debug!("[freq] skipping malformed line {}", number + 1);
                    continue;
                }
            };

            if raw.contains_key(word) {
                log_warn!("[freq] duplicate word {}, keeping the first entry", word);
            } else {
                raw.insert(word.to_string(), freq);
            }
        }

        let max = raw.values().fold(0.0_f64, |max, v| max.max(*v));
        if max > 0.0 {
            for value in raw.values_mut() {
                *value /= max;
            }
        }

        Self { entries: raw }
    }

    pub fn get(&self, word: &str) -> Option<f64> {
        self.entries.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_against_observed_maximum() {
        let table = WordFrequencyTable::parse("1 100 火\n2 50 水\n");
        assert_eq!(table.get("火"), Some(1.0));
        assert_eq!(table.get("水"), Some(0.5));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn every_frequency_lies_in_unit_interval() {
        let table = WordFrequencyTable::parse("1 3031 the\n2 700 of\n3 1 zyzzyva\n");
        for word in ["the", "of", "zyzzyva"] {
            let freq = table.get(word).unwrap();
            assert!((0.0..=1.0).contains(&freq), "{word} out of range: {freq}");
        }
        assert_eq!(table.get("the"), Some(1.0));
    }

    #[test]
    fn duplicate_words_keep_first_entry() {
        let table = WordFrequencyTable::parse("1 100 火\n2 10 火\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("火"), Some(1.0));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let table = WordFrequencyTable::parse("garbage\n1 not-a-number 火\n\n2 50 水\n3 -4 negative\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("水"), Some(1.0));
    }

    #[test]
    fn missing_file_degrades_to_empty_table() {
        let table = WordFrequencyTable::load("no/such/word-freq.txt");
        assert!(table.is_empty());
        assert_eq!(table.get("火"), None);
    }
}
