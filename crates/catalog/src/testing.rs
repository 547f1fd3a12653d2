#![cfg(test)]
//! In-memory stand-in for the remote track service.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use api_client::{validate_audio_upload, ApiError, AudioUpload, TrackApi};
use common::{AudioFile, Genre, Track, TrackDraft};
use parking_lot::Mutex;
use tokio::sync::Notify;

pub fn track(id: &str, title: &str) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        artist: "Artist".to_string(),
        album: None,
        cover_image: None,
        genres: vec!["Rock".to_string()],
        audio_file: AudioFile::Absent,
    }
}

#[derive(Default)]
pub struct FakeApi {
    tracks: Mutex<Vec<Track>>,
    calls: Mutex<Vec<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    write_failure: Mutex<Option<ApiError>>,
    list_fails: AtomicBool,
    genres_fail: AtomicBool,
    upload_gate: Mutex<Option<Arc<Notify>>>,
    next_id: AtomicUsize,
}

impl FakeApi {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: Mutex::new(tracks),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn server_tracks(&self) -> Vec<Track> {
        self.tracks.lock().clone()
    }

    pub fn fail_delete(&self, id: &str) {
        self.failing_deletes.lock().insert(id.to_string());
    }

    /// The next create, update, upload or file removal fails with `err`.
    pub fn fail_next_write(&self, err: ApiError) {
        *self.write_failure.lock() = Some(err);
    }

    pub fn fail_list(&self) {
        self.list_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_genres(&self) {
        self.genres_fail.store(true, Ordering::SeqCst);
    }

    /// Uploads wait until the returned gate is notified.
    pub fn gate_uploads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.upload_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn take_write_failure(&self) -> Result<(), ApiError> {
        match self.write_failure.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn modify(&self, id: &str, apply: impl FnOnce(&mut Track)) -> Result<Track, ApiError> {
        let mut tracks = self.tracks.lock();
        match tracks.iter_mut().find(|track| track.id == id) {
            Some(track) => {
                apply(track);
                Ok(track.clone())
            }
            None => Err(ApiError::Server {
                status: 404,
                message: "Track not found".to_string(),
            }),
        }
    }
}

impl TrackApi for FakeApi {
    fn base_url(&self) -> &str {
        "http://localhost:8000"
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, ApiError> {
        self.record("list_tracks");
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        Ok(self.tracks.lock().clone())
    }

    async fn create_track(&self, draft: &TrackDraft) -> Result<Track, ApiError> {
        self.record("create_track");
        self.take_write_failure()?;
        let draft = draft.normalized();
        let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let track = Track {
            id,
            title: draft.title,
            artist: draft.artist,
            album: draft.album,
            cover_image: draft.cover_image,
            genres: draft.genres,
            audio_file: AudioFile::Absent,
        };
        self.tracks.lock().push(track.clone());
        Ok(track)
    }

    async fn update_track(&self, id: &str, draft: &TrackDraft) -> Result<Track, ApiError> {
        self.record(format!("update_track:{}", id));
        self.take_write_failure()?;
        let draft = draft.normalized();
        self.modify(id, |track| {
            track.title = draft.title;
            track.artist = draft.artist;
            track.album = draft.album;
            track.cover_image = draft.cover_image;
            track.genres = draft.genres;
        })
    }

    async fn delete_track(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_track:{}", id));
        if self.failing_deletes.lock().contains(id) {
            return Err(ApiError::Server {
                status: 500,
                message: format!("could not delete {}", id),
            });
        }
        let mut tracks = self.tracks.lock();
        let before = tracks.len();
        tracks.retain(|track| track.id != id);
        if tracks.len() == before {
            return Err(ApiError::Server {
                status: 404,
                message: "Track not found".to_string(),
            });
        }
        Ok(())
    }

    async fn upload_audio_file(&self, id: &str, upload: &AudioUpload) -> Result<Track, ApiError> {
        self.record(format!("upload:{}", id));
        validate_audio_upload(upload)?;
        let gate = self.upload_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.take_write_failure()?;
        let reference = format!("/api/files/{}", upload.file_name);
        self.modify(id, |track| track.audio_file = AudioFile::Present(reference))
    }

    async fn delete_audio_file(&self, id: &str) -> Result<Track, ApiError> {
        self.record(format!("delete_file:{}", id));
        self.take_write_failure()?;
        self.modify(id, |track| track.audio_file = AudioFile::Absent)
    }

    async fn list_genres(&self) -> Result<Vec<Genre>, ApiError> {
        self.record("list_genres");
        if self.genres_fail.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        Ok(["Rock", "Jazz", "Pop"].into_iter().map(Genre::new).collect())
    }
}
