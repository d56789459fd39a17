use crate::error::Result;
pub use crate::{log_debug, log_info};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub fn ensure_directory(dir: impl AsRef<Path>) -> Result<()> {
    if !dir.as_ref().exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Reads a file that is allowed to be absent. Returns `None` and logs at
/// debug level when it does not exist.
pub fn read_optional(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    if !path.exists() {
        log_debug!("[utils] No file at {}", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    log_info!("[utils] Loaded {}", path.display());
    Ok(Some(content))
}

pub fn save_json(data: &impl serde::Serialize, path: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json_string = serde_json::to_string_pretty(data)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

/// Folds fullwidth ASCII forms into their halfwidth counterparts and the
/// ideographic space into a plain space. Other characters pass through.
pub fn fold_fullwidth(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{ff01}'..='\u{ff5e}' => {
                char::from_u32(c as u32 - 0xff01 + 0x21).unwrap_or(c)
            }
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_fullwidth_ascii() {
        assert_eq!(fold_fullwidth("ＡＢＣ１２３"), "ABC123");
        assert_eq!(fold_fullwidth("（ー）"), "(ー)");
        assert_eq!(fold_fullwidth("a　b"), "a b");
    }

    #[test]
    fn leaves_kana_and_kanji_alone() {
        assert_eq!(fold_fullwidth("火・ひたち"), "火・ひたち");
    }
}
