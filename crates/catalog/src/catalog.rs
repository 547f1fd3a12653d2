use std::sync::Arc;
use std::time::Duration;

use api_client::{validate_audio_upload, ApiError, AudioUpload, TrackApi};
use common::{resolve_asset_url, AudioFile, Genre, Track};
use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::debounce::{Debouncer, SEARCH_DEBOUNCE};
use crate::list::{GenreFilter, PageView, TrackList};
use crate::playback::Playback;
use crate::CatalogError;

#[derive(Debug, Default)]
pub struct BulkDeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, ApiError)>,
    pub resynced: bool,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the track collection and applies every edit to it and the remote service.
pub struct Catalog<A> {
    api: A,
    state: Arc<Mutex<TrackList>>,
    search: Debouncer<String>,
    playback: Mutex<Playback>,
    genres: Mutex<Vec<Genre>>,
}

impl<A: TrackApi> Catalog<A> {
    pub fn new(api: A) -> Self {
        Self::with_debounce(api, SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(api: A, window: Duration) -> Self {
        let state = Arc::new(Mutex::new(TrackList::new()));
        let search_state = Arc::clone(&state);
        let search = Debouncer::new(window, move |query: String| {
            search_state.lock().apply_query(&query);
        });
        Self {
            api,
            state,
            search,
            playback: Mutex::new(Playback::new()),
            genres: Mutex::new(Vec::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn with_list<R>(&self, read: impl FnOnce(&TrackList) -> R) -> R {
        read(&self.state.lock())
    }

    pub async fn load(&self) -> Result<(), ApiError> {
        let mut first_error = None;
        match self.api.list_tracks().await {
            Ok(tracks) => {
                info!("Loaded {} tracks", tracks.len());
                self.state.lock().replace_all(tracks);
            }
            Err(err) => {
                warn!("Failed to load tracks: {}", err);
                first_error = Some(err);
            }
        }
        match self.api.list_genres().await {
            Ok(genres) => *self.genres.lock() = genres,
            Err(err) => {
                warn!("Failed to load genres: {}", err);
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn genres(&self) -> Vec<Genre> {
        self.genres.lock().clone()
    }

    pub fn track(&self, id: &str) -> Option<Track> {
        self.state.lock().get(id).cloned()
    }

    pub fn view(&self) -> PageView {
        self.state.lock().view()
    }

    pub fn set_search(&self, raw: &str) {
        self.state.lock().set_search_input(raw);
        self.search.push(raw.to_string());
    }

    pub async fn flush_search(&self) {
        self.search.flush().await;
    }

    pub fn set_genre_filter(&self, filter: GenreFilter) {
        self.state.lock().set_genre_filter(filter);
    }

    pub fn set_page(&self, page: usize) -> usize {
        self.state.lock().set_page(page)
    }

    pub fn next_page(&self) -> usize {
        self.state.lock().next_page()
    }

    pub fn prev_page(&self) -> usize {
        self.state.lock().prev_page()
    }

    pub fn toggle_selected(&self, id: &str) -> bool {
        self.state.lock().toggle_selected(id)
    }

    pub fn toggle_select_page(&self) -> bool {
        self.state.lock().toggle_select_page()
    }

    pub fn clear_selection(&self) {
        self.state.lock().clear_selection();
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.state.lock().selected_ids()
    }

    pub fn track_created(&self, track: Track) {
        info!("Track {} added", track.id);
        self.state.lock().insert(track);
    }

    pub fn track_updated(&self, track: Track) {
        let id = track.id.clone();
        if !self.state.lock().replace(track) {
            warn!("Updated track {} is no longer in the list", id);
        }
    }

    pub async fn delete_track(&self, id: &str) -> Result<(), CatalogError> {
        let (index, snapshot) = self
            .state
            .lock()
            .remove(id)
            .ok_or_else(|| CatalogError::UnknownTrack(id.to_string()))?;
        self.playback.lock().forget(id);
        match self.api.delete_track(id).await {
            Ok(()) => {
                info!("Deleted track {}", id);
                Ok(())
            }
            Err(err) => {
                warn!("Failed to delete track {}: {}", id, err);
                self.state.lock().restore(index, snapshot);
                Err(err.into())
            }
        }
    }

    pub async fn delete_selected(&self) -> BulkDeleteReport {
        let removed: Vec<(usize, Track)> = {
            let mut state = self.state.lock();
            let ids = state.selected_ids();
            ids.iter().filter_map(|id| state.remove(id)).collect()
        };
        {
            let mut playback = self.playback.lock();
            for (_, track) in &removed {
                playback.forget(&track.id);
            }
        }

        let results = join_all(
            removed
                .iter()
                .map(|(_, track)| self.api.delete_track(&track.id)),
        )
        .await;

        let mut report = BulkDeleteReport::default();
        let mut failed_snapshots = Vec::new();
        for ((index, track), result) in removed.into_iter().zip(results) {
            match result {
                Ok(()) => report.deleted.push(track.id),
                Err(err) => {
                    warn!("Failed to delete track {}: {}", track.id, err);
                    report.failed.push((track.id.clone(), err));
                    failed_snapshots.push((index, track));
                }
            }
        }
        info!(
            "Bulk delete: {} deleted, {} failed",
            report.deleted.len(),
            report.failed.len()
        );

        if !report.failed.is_empty() {
            match self.api.list_tracks().await {
                Ok(tracks) => {
                    self.state.lock().replace_all(tracks);
                    report.resynced = true;
                }
                Err(err) => {
                    warn!("Failed to re-fetch tracks after bulk delete: {}", err);
                    let mut state = self.state.lock();
                    for (index, track) in failed_snapshots.into_iter().rev() {
                        state.restore(index, track);
                    }
                }
            }
        }
        report
    }

    pub fn choose_file(&self, id: &str, upload: AudioUpload) -> Result<(), CatalogError> {
        validate_audio_upload(&upload)?;
        if self.state.lock().set_pending_file(id, upload) {
            Ok(())
        } else {
            Err(CatalogError::UnknownTrack(id.to_string()))
        }
    }

    pub fn pending_file(&self, id: &str) -> Option<AudioUpload> {
        self.state.lock().pending_file(id).cloned()
    }

    pub async fn upload_file(&self, id: &str) -> Result<Track, CatalogError> {
        let (previous_audio, upload) = {
            let mut state = self.state.lock();
            let previous_audio = state
                .get(id)
                .map(|track| track.audio_file.clone())
                .ok_or_else(|| CatalogError::UnknownTrack(id.to_string()))?;
            if previous_audio.is_uploading() {
                return Err(CatalogError::UploadInProgress(id.to_string()));
            }
            let upload = state
                .pending_file(id)
                .cloned()
                .ok_or_else(|| CatalogError::NoPendingFile(id.to_string()))?;
            validate_audio_upload(&upload)?;
            state.set_audio_file(id, AudioFile::Uploading);
            (previous_audio, upload)
        };

        match self.api.upload_audio_file(id, &upload).await {
            Ok(track) => {
                info!("Uploaded {} for track {}", upload.file_name, id);
                let mut state = self.state.lock();
                state.replace(track.clone());
                state.clear_pending_file(id);
                Ok(track)
            }
            Err(err) => {
                warn!("Failed to upload file for track {}: {}", id, err);
                // Other fields may have been edited meanwhile; only undo the upload.
                self.state.lock().set_audio_file(id, previous_audio);
                Err(err.into())
            }
        }
    }

    pub async fn remove_file(&self, id: &str) -> Result<Track, CatalogError> {
        let previous_audio = {
            let mut state = self.state.lock();
            let previous_audio = state
                .get(id)
                .map(|track| track.audio_file.clone())
                .ok_or_else(|| CatalogError::UnknownTrack(id.to_string()))?;
            match &previous_audio {
                AudioFile::Absent => return Err(CatalogError::NoAudioFile(id.to_string())),
                AudioFile::Uploading => {
                    return Err(CatalogError::UploadInProgress(id.to_string()))
                }
                AudioFile::Present(_) => {}
            }
            state.set_audio_file(id, AudioFile::Absent);
            previous_audio
        };
        self.playback.lock().forget(id);

        match self.api.delete_audio_file(id).await {
            Ok(track) => {
                info!("Removed audio file from track {}", id);
                self.state.lock().replace(track.clone());
                Ok(track)
            }
            Err(err) => {
                warn!("Failed to remove audio file from track {}: {}", id, err);
                self.state.lock().set_audio_file(id, previous_audio);
                Err(err.into())
            }
        }
    }

    pub fn audio_url(&self, id: &str) -> Option<String> {
        let state = self.state.lock();
        let reference = state.get(id)?.audio_file.reference()?;
        Some(resolve_asset_url(self.api.base_url(), reference))
    }

    pub fn cover_url(&self, id: &str) -> Option<String> {
        let state = self.state.lock();
        let cover = state.get(id)?.cover_image.as_deref()?;
        Some(resolve_asset_url(self.api.base_url(), cover))
    }

    pub fn play(&self, id: &str) -> Result<Option<String>, CatalogError> {
        let has_audio = self
            .state
            .lock()
            .get(id)
            .map(|track| track.audio_file.reference().is_some())
            .ok_or_else(|| CatalogError::UnknownTrack(id.to_string()))?;
        if !has_audio {
            return Err(CatalogError::NoAudioFile(id.to_string()));
        }
        Ok(self.playback.lock().play(id))
    }

    pub fn pause(&self, id: &str) -> bool {
        self.playback.lock().pause(id)
    }

    pub fn advance_playback(&self, id: &str, elapsed: Duration) {
        self.playback.lock().advance(id, elapsed);
    }

    pub fn playback_position(&self, id: &str) -> Duration {
        self.playback.lock().position(id)
    }

    pub fn now_playing(&self) -> Option<String> {
        let playback = self.playback.lock();
        playback
            .active()
            .filter(|id| playback.is_playing(id))
            .map(|id| id.to_string())
    }
}
