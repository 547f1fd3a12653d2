use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "AudioFile::is_absent")]
    pub audio_file: AudioFile,
}

impl Track {
    /// `needle` must already be lowercased. An empty needle matches every track.
    pub fn matches_query(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle)
            || self.artist.to_lowercase().contains(needle)
            || self
                .album
                .as_deref()
                .map(|album| album.to_lowercase().contains(needle))
                .unwrap_or(false)
    }

    pub fn has_genre(&self, name: &str) -> bool {
        self.genres.iter().any(|genre| genre == name)
    }

    pub fn to_draft(&self) -> TrackDraft {
        TrackDraft {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            cover_image: self.cover_image.clone(),
            genres: self.genres.clone(),
        }
    }
}

/// Attachment state of a track's single audio asset.
///
/// The wire format only knows "absent" and "present with reference";
/// `Uploading` exists on the client while an upload is in flight and is never sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum AudioFile {
    #[default]
    Absent,
    Uploading,
    Present(String),
}

impl AudioFile {
    pub fn is_absent(&self) -> bool {
        matches!(self, AudioFile::Absent)
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self, AudioFile::Uploading)
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            AudioFile::Present(reference) => Some(reference),
            _ => None,
        }
    }
}

impl From<Option<String>> for AudioFile {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(reference) if !reference.trim().is_empty() => AudioFile::Present(reference),
            _ => AudioFile::Absent,
        }
    }
}

impl From<AudioFile> for Option<String> {
    fn from(value: AudioFile) -> Self {
        match value {
            AudioFile::Present(reference) => Some(reference),
            AudioFile::Absent | AudioFile::Uploading => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genre(pub String);

impl Genre {
    pub fn new(name: impl Into<String>) -> Self {
        Genre(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Genre {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Genre {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Request body for creating or replacing a track. The server assigns `id`.
/// Cleared optional fields are sent as `null`, never left out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDraft {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl TrackDraft {
    pub fn normalized(&self) -> TrackDraft {
        let mut genres: Vec<String> = Vec::with_capacity(self.genres.len());
        for genre in &self.genres {
            let genre = genre.trim();
            if genre.is_empty() || genres.iter().any(|seen| seen == genre) {
                continue;
            }
            genres.push(genre.to_string());
        }
        TrackDraft {
            title: self.title.trim().to_string(),
            artist: self.artist.trim().to_string(),
            album: non_empty(self.album.as_deref()),
            cover_image: non_empty(self.cover_image.as_deref()),
            genres,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

pub fn is_absolute_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(parsed) => parsed.has_host(),
        Err(_) => false,
    }
}

/// Accepts absolute URLs with a host, or server-relative paths starting with `/`.
pub fn is_valid_asset_ref(value: &str) -> bool {
    let value = value.trim();
    if value.starts_with('/') && !value.starts_with("//") {
        return !value.chars().any(char::is_whitespace);
    }
    is_absolute_url(value)
}

/// Absolute URLs pass through unchanged; anything else is treated as a
/// server-relative path and appended to `base_url`.
pub fn resolve_asset_url(base_url: &str, path: &str) -> String {
    let path = path.trim();
    if is_absolute_url(path) {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}
