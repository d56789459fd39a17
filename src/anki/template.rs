use crate::anki::TemplateSides;
use crate::error::Result;
use crate::utils;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the single card template on the vocabulary model.
pub const WORDS_TEMPLATE: &str = "Words";

const STROKE_ORDER_CSS: &str =
    "\n.k-sod {\n  line-height: 0;\n  padding: 4px 0;\n  margin: 5px 0;\n  zoom: 1.5;\n}";

/// Loads card template override files from a local directory.
///
/// A side lives in `<prefix>_<template>_<side>.html`, the whole file name
/// lowercased.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    directory: PathBuf,
    prefix: String,
}

impl TemplateSet {
    pub fn new(directory: impl AsRef<Path>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            prefix: prefix.into(),
        }
    }

    fn override_path(&self, template: &str, side: &str) -> PathBuf {
        let name = format!("{}_{}_{}", self.prefix, template, side).to_lowercase();
        self.directory.join(name + ".html")
    }

    pub fn load_side(&self, template: &str, side: &str) -> Result<Option<String>> {
        utils::read_optional(self.override_path(template, side))
    }

    /// Replaces every template side with its override file. Answers whether
    /// any override file existed; when none did the map is not worth
    /// writing back.
    pub fn apply(&self, templates: &mut HashMap<String, TemplateSides>) -> Result<bool> {
        let mut found = false;
        let names: Vec<String> = templates.keys().cloned().collect();
        for name in names {
            let front = self.load_side(&name, "front")?;
            let back = self.load_side(&name, "back")?;
            if front.is_some() || back.is_some() {
                found = true;
            }
            if let Some(sides) = templates.get_mut(&name) {
                sides.front = front.unwrap_or_default();
                sides.back = back.unwrap_or_default();
            }
        }
        Ok(found)
    }

    /// Template for the vocabulary model: the override files when present,
    /// otherwise a plain front/answer layout.
    pub fn words_template(&self) -> Result<(String, TemplateSides)> {
        let front = self
            .load_side(WORDS_TEMPLATE, "front")?
            .unwrap_or_else(|| "{{Front}}".to_string());
        let back = self
            .load_side(WORDS_TEMPLATE, "back")?
            .unwrap_or_else(|| "{{FrontSide}}\n\n<hr id=answer>\n\n{{Back}}".to_string());
        Ok((WORDS_TEMPLATE.to_string(), TemplateSides { front, back }))
    }
}

pub fn words_styling() -> &'static str {
    ".card {\n  font-family: arial;\n  font-size: 20px;\n  text-align: center;\n  color: black;\n  background-color: white;\n}"
}

/// Appends the stroke-order CSS block unless some line already declares the
/// class. Answers the new styling, or nothing when it is already there.
pub fn ensure_stroke_order_css(css: &str) -> Option<String> {
    let declared = css
        .lines()
        .any(|line| line.trim_start().starts_with(".k-sod"));
    if declared {
        return None;
    }
    Some(format!("{}{}", css, STROKE_ORDER_CSS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("anki-kanji-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn override_file_names_join_and_lowercase() {
        let set = TemplateSet::new("templates", "kd");
        assert_eq!(
            set.override_path("Read", "front"),
            Path::new("templates").join("kd_read_front.html")
        );
        assert_eq!(
            set.override_path("Write Quiz", "back"),
            Path::new("templates").join("kd_write quiz_back.html")
        );
    }

    #[test]
    fn apply_replaces_sides_from_files() {
        let dir = scratch_dir("tmpl-apply");
        fs::write(dir.join("kd_read_front.html"), "{{Kanji}}").unwrap();

        let set = TemplateSet::new(&dir, "kd");
        let mut templates = HashMap::from([(
            "Read".to_string(),
            TemplateSides {
                front: "old front".to_string(),
                back: "old back".to_string(),
            },
        )]);

        let found = set.apply(&mut templates).unwrap();
        assert!(found);
        assert_eq!(templates["Read"].front, "{{Kanji}}");
        // A side without an override file is cleared, not kept.
        assert_eq!(templates["Read"].back, "");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn apply_without_any_files_reports_nothing_found() {
        let dir = scratch_dir("tmpl-none");
        let set = TemplateSet::new(&dir, "kd");
        let mut templates = HashMap::from([(
            "Read".to_string(),
            TemplateSides {
                front: "keep".to_string(),
                back: "keep".to_string(),
            },
        )]);
        assert!(!set.apply(&mut templates).unwrap());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn words_template_falls_back_to_default_layout() {
        let dir = scratch_dir("tmpl-words");
        let set = TemplateSet::new(&dir, "words");
        let (name, sides) = set.words_template().unwrap();
        assert_eq!(name, "Words");
        assert_eq!(sides.front, "{{Front}}");
        assert!(sides.back.contains("{{Back}}"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stroke_order_css_appends_exactly_once() {
        let css = ".card { color: black; }";
        let appended = ensure_stroke_order_css(css).unwrap();
        assert!(appended.contains(".k-sod"));
        assert!(appended.starts_with(css));
        assert_eq!(ensure_stroke_order_css(&appended), None);

        let indented = ".card {}\n  .k-sod { zoom: 1; }";
        assert_eq!(ensure_stroke_order_css(indented), None);
    }
}
