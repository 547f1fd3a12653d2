mod catalog;
mod debounce;
mod form;
mod list;
mod playback;
mod testing;

use api_client::ApiError;

pub use catalog::{BulkDeleteReport, Catalog};
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use form::{
    FieldErrors, FormError, FormMode, TrackForm, ARTIST_REQUIRED, COVER_INVALID, TITLE_REQUIRED,
};
pub use list::{GenreFilter, PageView, TrackList, PAGE_SIZE};
pub use playback::Playback;

#[derive(Debug)]
pub enum CatalogError {
    UnknownTrack(String),
    NoPendingFile(String),
    NoAudioFile(String),
    UploadInProgress(String),
    Api(ApiError),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::UnknownTrack(id) => write!(f, "no track with id {}", id),
            CatalogError::NoPendingFile(id) => write!(f, "no file chosen for track {}", id),
            CatalogError::NoAudioFile(id) => write!(f, "track {} has no audio file", id),
            CatalogError::UploadInProgress(id) => {
                write!(f, "an upload for track {} is already in progress", id)
            }
            CatalogError::Api(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<ApiError> for CatalogError {
    fn from(err: ApiError) -> Self {
        CatalogError::Api(err)
    }
}
