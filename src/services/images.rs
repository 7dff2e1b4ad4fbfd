//! Illustrative images: Pexels first (needs a key), then the Wikipedia page
//! image.  Found images are stored as `<images_dir>/<word>.jpg`; words for
//! which both providers answered "nothing" get a `<word>.nofound` marker and
//! are not queried again.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::display::{ImageHit, SOURCE_CACHE};

use super::cache::{safe_filename, write_atomic};
use super::http::HttpClient;
use super::{FetchError, ImageProvider};

const PEXELS_ENDPOINT: &str = "https://api.pexels.com/v1/search";
const WIKI_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Thumbnail width requested from Wikipedia.
const THUMBNAIL_SIZE: u32 = 500;
/// Thumbnails smaller than this in either dimension are ignored.
const MIN_IMAGE_DIMENSION: u64 = 100;

/// Wikipedia page images that are site furniture rather than illustrations.
const WIKI_BLACKLIST: &[&str] = &[
    "commons-logo", "disambig", "ambox", "wiki_letter", "question_book", "folder",
    "decrease", "increase", "edit-clear", "symbol", "icon", "no_image", "image_missing",
    "placeholder", "replace_this", "wiktionary", "wikiquote", "wikibooks", "wikisource",
    "flag_of", "coat_of_arms", "emblem", "crystal", "nuvola", "tango", ".svg",
];

pub struct WebImages {
    http: HttpClient,
    dir: PathBuf,
    pexels_key: Option<String>,
}

/// Result of asking one provider.
enum Lookup {
    Found(String),
    Nothing,
}

impl WebImages {
    pub fn new(http: HttpClient, dir: impl Into<PathBuf>, pexels_key: Option<String>) -> Self {
        Self {
            http,
            dir: dir.into(),
            pexels_key: pexels_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn image_path(&self, safe: &str) -> PathBuf {
        self.dir.join(format!("{safe}.jpg"))
    }

    fn marker_path(&self, safe: &str) -> PathBuf {
        self.dir.join(format!("{safe}.nofound"))
    }

    async fn search_pexels(&self, key: &str, safe: &str) -> Result<Lookup, FetchError> {
        let request = self
            .http
            .get(PEXELS_ENDPOINT)
            .header(reqwest::header::AUTHORIZATION, key)
            .query(&[("query", safe), ("per_page", "1")]);
        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let json: Value = response.json().await?;
        Ok(json["photos"][0]["src"]["medium"]
            .as_str()
            .map_or(Lookup::Nothing, |url| Lookup::Found(url.to_string())))
    }

    async fn search_wiki(&self, safe: &str) -> Result<Lookup, FetchError> {
        let size = THUMBNAIL_SIZE.to_string();
        let request = self.http.get(WIKI_ENDPOINT).query(&[
            ("action", "query"),
            ("titles", safe),
            ("prop", "pageimages"),
            ("format", "json"),
            ("pithumbsize", size.as_str()),
        ]);
        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let json: Value = response.json().await?;
        Ok(pick_wiki_thumbnail(&json).map_or(Lookup::Nothing, Lookup::Found))
    }

    async fn download(&self, url: &str, safe: &str, source: &str) -> Result<ImageHit, FetchError> {
        let bytes = self.http.get_bytes(url).await?;
        let path = self.image_path(safe);
        write_atomic(&path, &bytes)?;
        Ok(ImageHit {
            path,
            source: source.to_string(),
        })
    }
}

/// First usable thumbnail URL of a `prop=pageimages` answer.
fn pick_wiki_thumbnail(json: &Value) -> Option<String> {
    let pages = json["query"]["pages"].as_object()?;
    pages
        .iter()
        .filter(|(id, _)| id.as_str() != "-1")
        .filter_map(|(_, page)| page.get("thumbnail"))
        .find_map(|thumb| {
            let url = thumb["source"].as_str().filter(|u| !u.is_empty())?;
            let lower = url.to_lowercase();
            if WIKI_BLACKLIST.iter().any(|bad| lower.contains(bad)) {
                return None;
            }
            let width = thumb["width"].as_u64().unwrap_or(0);
            let height = thumb["height"].as_u64().unwrap_or(0);
            (width >= MIN_IMAGE_DIMENSION && height >= MIN_IMAGE_DIMENSION).then(|| url.to_string())
        })
}

#[async_trait]
impl ImageProvider for WebImages {
    async fn fetch_image(&self, word: &str) -> Result<ImageHit, FetchError> {
        let safe = safe_filename(word);
        if safe.is_empty() || self.marker_path(&safe).exists() {
            return Err(FetchError::NotFound);
        }
        let cached = self.image_path(&safe);
        if cached.exists() {
            return Ok(ImageHit {
                path: cached,
                source: SOURCE_CACHE.into(),
            });
        }

        // Only mark "not found" when every provider answered cleanly.
        let mut clean_miss = true;

        if let Some(key) = &self.pexels_key {
            match self.search_pexels(key, &safe).await {
                Ok(Lookup::Found(url)) => match self.download(&url, &safe, "Pexels").await {
                    Ok(hit) => return Ok(hit),
                    Err(e) => {
                        log::debug!("net: pexels download for '{safe}' failed: {e}");
                        clean_miss = false;
                    }
                },
                Ok(Lookup::Nothing) => {}
                Err(e) => {
                    log::debug!("net: pexels search for '{safe}' failed: {e}");
                    clean_miss = false;
                }
            }
        }

        match self.search_wiki(&safe).await {
            Ok(Lookup::Found(url)) => match self.download(&url, &safe, "Wiki").await {
                Ok(hit) => return Ok(hit),
                Err(e) => {
                    log::debug!("net: wiki download for '{safe}' failed: {e}");
                    clean_miss = false;
                }
            },
            Ok(Lookup::Nothing) => {}
            Err(e) => {
                log::debug!("net: wiki search for '{safe}' failed: {e}");
                clean_miss = false;
            }
        }

        if clean_miss {
            if let Err(e) = write_atomic(&self.marker_path(&safe), b"") {
                log::warn!("cache: failed to write not-found marker for '{safe}': {e}");
            }
            Err(FetchError::NotFound)
        } else {
            Err(FetchError::Request(format!("no image provider reachable for '{safe}'")))
        }
    }
}
