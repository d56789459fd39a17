use crate::client::Client;
use crate::error::Result;
use crate::utils::ensure_directory;
pub use crate::{log_debug, log_warn};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use url::Url;

fn src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"src="(/[^"]+)""#).unwrap())
}

fn href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href="([^"]*)""#).unwrap())
}

/// Rewrites every anchor href in `html` to an absolute URL against `base`,
/// so links still work once the fragment lives inside a card.
pub fn absolutize_links(html: &str, base: &str) -> String {
    let base = match Url::parse(base) {
        Ok(base) => base,
        Err(_) => return html.to_string(),
    };

    href_regex()
        .replace_all(html, |caps: &regex::Captures| match base.join(&caps[1]) {
            Ok(url) => format!(r#"href="{}""#, url),
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}

/// Local file name for a remote path: the basename, with percent-encoded
/// spaces decoded so the name on disk matches the name in the card.
fn local_name(remote: &str) -> String {
    let base = remote.rsplit('/').next().unwrap_or(remote);
    base.replace("%20", " ")
}

/// Downloads embedded media into a local directory, skipping files that are
/// already present unless forced.
pub struct MediaStore {
    dir: PathBuf,
    force: bool,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            dir: dir.into(),
            force,
        }
    }

    /// Rewrites the site-absolute image sources in `html` to local file
    /// names, downloading each file at most once. Returns the rewritten
    /// fragment and the local paths it now references. A failed download
    /// leaves that source untouched rather than losing the image.
    pub async fn localize(&self, html: &str, client: &Client) -> Result<(String, Vec<PathBuf>)> {
        let remotes: Vec<String> = src_regex()
            .captures_iter(html)
            .map(|caps| caps[1].to_string())
            .collect();

        let mut local: HashMap<String, String> = HashMap::new();
        let mut files = Vec::new();
        for remote in remotes {
            if local.contains_key(&remote) {
                continue;
            }
            match self.fetch(&remote, client).await {
                Ok(path) => {
                    local.insert(remote, local_name_of(&path));
                    files.push(path);
                }
                Err(e) => {
                    log_warn!("[media] keeping remote source {}: {}", remote, e);
                }
            }
        }

        let rewritten = src_regex()
            .replace_all(html, |caps: &regex::Captures| match local.get(&caps[1]) {
                Some(name) => format!(r#"src="{}""#, name),
                None => caps[0].to_string(),
            })
            .into_owned();

        Ok((rewritten, files))
    }

    async fn fetch(&self, remote: &str, client: &Client) -> Result<PathBuf> {
        let path = self.dir.join(local_name(remote));
        if !self.force && path.exists() {
            log_debug!("[media] cached: {}", path.display());
            return Ok(path);
        }

        ensure_directory(&self.dir)?;
        let bytes = client.get_bytes(remote).await?;
        std::fs::write(&path, bytes)?;
        log_debug!("[media] downloaded: {}", path.display());
        Ok(path)
    }
}

pub fn local_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
