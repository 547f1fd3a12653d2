use api_client::{ApiError, TrackApi};
use common::{is_valid_asset_ref, Genre, Track, TrackDraft};
use tracing::{info, warn};

pub const TITLE_REQUIRED: &str = "Title is required";
pub const ARTIST_REQUIRED: &str = "Artist is required";
pub const COVER_INVALID: &str = "Cover must be a valid URL";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub title: Option<&'static str>,
    pub artist: Option<&'static str>,
    pub cover_image: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.cover_image.is_none()
    }

    pub fn messages(&self) -> Vec<(&'static str, &'static str)> {
        let mut out = Vec::new();
        if let Some(message) = self.title {
            out.push(("title", message));
        }
        if let Some(message) = self.artist {
            out.push(("artist", message));
        }
        if let Some(message) = self.cover_image {
            out.push(("coverImage", message));
        }
        out
    }
}

#[derive(Debug)]
pub enum FormError {
    Invalid(FieldErrors),
    Api(ApiError),
    Closed,
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::Invalid(errors) => {
                let messages: Vec<&str> =
                    errors.messages().into_iter().map(|(_, message)| message).collect();
                write!(f, "{}", messages.join("; "))
            }
            FormError::Api(err) => write!(f, "{}", err),
            FormError::Closed => write!(f, "form is closed"),
        }
    }
}

impl std::error::Error for FormError {}

impl From<ApiError> for FormError {
    fn from(err: ApiError) -> Self {
        FormError::Api(err)
    }
}

#[derive(Clone, Debug)]
pub struct TrackForm {
    mode: FormMode,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_image: String,
    genres: Vec<String>,
    vocabulary: Vec<Genre>,
    errors: FieldErrors,
    submit_error: Option<String>,
    open: bool,
}

impl TrackForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            cover_image: String::new(),
            genres: Vec::new(),
            vocabulary: Vec::new(),
            errors: FieldErrors::default(),
            submit_error: None,
            open: true,
        }
    }

    pub fn edit(track: &Track) -> Self {
        let mut form = Self::create();
        form.mode = FormMode::Edit(track.id.clone());
        form.title = track.title.clone();
        form.artist = track.artist.clone();
        form.album = track.album.clone().unwrap_or_default();
        form.cover_image = track.cover_image.clone().unwrap_or_default();
        for genre in &track.genres {
            if !form.genres.contains(genre) {
                form.genres.push(genre.clone());
            }
        }
        form
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub async fn load_genres<A: TrackApi>(&mut self, api: &A) {
        match api.list_genres().await {
            Ok(genres) => self.set_vocabulary(genres),
            Err(err) => {
                warn!("Failed to load genres: {}", err);
                self.vocabulary.clear();
            }
        }
    }

    pub fn set_vocabulary(&mut self, genres: Vec<Genre>) {
        self.vocabulary = genres;
    }

    pub fn available_genres(&self) -> Vec<&str> {
        self.vocabulary
            .iter()
            .map(Genre::name)
            .filter(|name| !self.genres.iter().any(|picked| picked.as_str() == *name))
            .collect()
    }

    /// Adds a genre once. Names outside a loaded vocabulary are refused.
    pub fn add_genre(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.genres.iter().any(|genre| genre == name) {
            return false;
        }
        if !self.vocabulary.is_empty() && !self.vocabulary.iter().any(|genre| genre == name) {
            return false;
        }
        self.genres.push(name.to_string());
        true
    }

    pub fn remove_genre(&mut self, name: &str) -> bool {
        let before = self.genres.len();
        self.genres.retain(|genre| genre != name.trim());
        self.genres.len() != before
    }

    pub fn validate(&mut self) -> Result<TrackDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.title.trim().is_empty() {
            errors.title = Some(TITLE_REQUIRED);
        }
        if self.artist.trim().is_empty() {
            errors.artist = Some(ARTIST_REQUIRED);
        }
        let cover = self.cover_image.trim();
        if !cover.is_empty() && !is_valid_asset_ref(cover) {
            errors.cover_image = Some(COVER_INVALID);
        }
        self.errors = errors.clone();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(TrackDraft {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: Some(self.album.clone()),
            cover_image: Some(self.cover_image.clone()),
            genres: self.genres.clone(),
        }
        .normalized())
    }

    pub async fn submit<A: TrackApi>(&mut self, api: &A) -> Result<Track, FormError> {
        if !self.open {
            return Err(FormError::Closed);
        }
        self.submit_error = None;
        let draft = self.validate().map_err(FormError::Invalid)?;
        let result = match &self.mode {
            FormMode::Create => api.create_track(&draft).await,
            FormMode::Edit(id) => api.update_track(id, &draft).await,
        };
        match result {
            Ok(track) => {
                info!("Saved track {} ({})", track.id, track.title);
                self.open = false;
                Ok(track)
            }
            Err(err) => {
                warn!("Failed to save track: {}", err);
                self.submit_error = Some(err.message().to_string());
                Err(FormError::Api(err))
            }
        }
    }
}
