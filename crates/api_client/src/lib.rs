mod error;
mod upload;

use std::time::Duration;

use common::{Genre, Track, TrackDraft};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

pub use error::ApiError;
pub use upload::{
    validate_audio_meta, validate_audio_upload, AudioUpload, ALLOWED_AUDIO_MIME_TYPES,
    MAX_AUDIO_BYTES,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[allow(async_fn_in_trait)]
pub trait TrackApi {
    fn base_url(&self) -> &str;
    async fn list_tracks(&self) -> Result<Vec<Track>, ApiError>;
    async fn create_track(&self, draft: &TrackDraft) -> Result<Track, ApiError>;
    async fn update_track(&self, id: &str, draft: &TrackDraft) -> Result<Track, ApiError>;
    async fn delete_track(&self, id: &str) -> Result<(), ApiError>;
    async fn upload_audio_file(&self, id: &str, upload: &AudioUpload) -> Result<Track, ApiError>;
    async fn delete_audio_file(&self, id: &str) -> Result<Track, ApiError>;
    async fn list_genres(&self) -> Result<Vec<Genre>, ApiError>;
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
            user_agent: "tracklist/0.1".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct TrackListResponse {
    data: Vec<Track>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let raw = config.base_url.trim();
        let base_url = Url::parse(raw)
            .map_err(|err| ApiError::Validation(format!("invalid base url {}: {}", raw, err)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Validation(format!("invalid base url {}", raw)));
        }
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::Validation("base url cannot carry a path".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url.path());
        Ok(self.http.request(method, url))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<bytes::Bytes, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        Ok(body)
    }
}

impl TrackApi for ApiClient {
    fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, ApiError> {
        let request = self.request(Method::GET, &["api", "tracks"])?;
        let payload: TrackListResponse = self.send_json(request).await?;
        Ok(payload.data)
    }

    async fn create_track(&self, draft: &TrackDraft) -> Result<Track, ApiError> {
        let request = self
            .request(Method::POST, &["api", "tracks"])?
            .json(&draft.normalized());
        self.send_json(request).await
    }

    async fn update_track(&self, id: &str, draft: &TrackDraft) -> Result<Track, ApiError> {
        let request = self
            .request(Method::PUT, &["api", "tracks", id])?
            .json(&draft.normalized());
        self.send_json(request).await
    }

    async fn delete_track(&self, id: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &["api", "tracks", id])?;
        self.send(request).await?;
        Ok(())
    }

    async fn upload_audio_file(&self, id: &str, upload: &AudioUpload) -> Result<Track, ApiError> {
        validate_audio_upload(upload)?;
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;
        let form = Form::new().part("file", part);
        let request = self
            .request(Method::POST, &["api", "tracks", id, "upload"])?
            .multipart(form);
        self.send_json(request).await
    }

    async fn delete_audio_file(&self, id: &str) -> Result<Track, ApiError> {
        let request = self.request(Method::DELETE, &["api", "tracks", id, "file"])?;
        self.send_json(request).await
    }

    async fn list_genres(&self) -> Result<Vec<Genre>, ApiError> {
        let request = self.request(Method::GET, &["api", "genres"])?;
        self.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Multipart, Path, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use bytes::Bytes;
    use common::AudioFile;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    #[derive(Clone, Default)]
    struct FakeService {
        tracks: Arc<Mutex<Vec<Track>>>,
        next_id: Arc<AtomicUsize>,
        uploads: Arc<AtomicUsize>,
        last_update: Arc<Mutex<Option<serde_json::Value>>>,
    }

    fn sample(id: &str, title: &str) -> Track {
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

    fn not_found() -> Response {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "Track not found" }))).into_response()
    }

    async fn list(State(svc): State<FakeService>) -> Json<serde_json::Value> {
        let tracks = svc.tracks.lock().clone();
        Json(json!({ "data": tracks, "meta": { "total": tracks.len() } }))
    }

    async fn create(State(svc): State<FakeService>, Json(draft): Json<TrackDraft>) -> Response {
        if draft.title.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Title is required" })),
            )
                .into_response();
        }
        let id = format!("srv-{}", svc.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let track = Track {
            id,
            title: draft.title,
            artist: draft.artist,
            album: draft.album,
            cover_image: draft.cover_image,
            genres: draft.genres,
            audio_file: AudioFile::Absent,
        };
        svc.tracks.lock().push(track.clone());
        (StatusCode::CREATED, Json(track)).into_response()
    }

    // Merges the body into the stored track: keys left out keep their value.
    async fn update(
        State(svc): State<FakeService>,
        Path(id): Path<String>,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        *svc.last_update.lock() = Some(body.clone());
        let mut tracks = svc.tracks.lock();
        let Some(track) = tracks.iter_mut().find(|track| track.id == id) else {
            return not_found();
        };
        let mut merged = serde_json::to_value(&*track).unwrap();
        if let (Some(target), Some(fields)) = (merged.as_object_mut(), body.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        *track = serde_json::from_value(merged).unwrap();
        Json(track.clone()).into_response()
    }

    async fn remove(State(svc): State<FakeService>, Path(id): Path<String>) -> Response {
        let mut tracks = svc.tracks.lock();
        let before = tracks.len();
        tracks.retain(|track| track.id != id);
        if tracks.len() == before {
            not_found()
        } else {
            StatusCode::NO_CONTENT.into_response()
        }
    }

    async fn upload(
        State(svc): State<FakeService>,
        Path(id): Path<String>,
        mut multipart: Multipart,
    ) -> Response {
        svc.uploads.fetch_add(1, Ordering::SeqCst);
        let mut file_name = None;
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() == Some("file") {
                let name = field.file_name().map(|name| name.to_string());
                let content_type = field.content_type().map(|value| value.to_string());
                if content_type.as_deref() != Some("audio/mpeg") {
                    return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
                }
                if field.bytes().await.is_err() {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                file_name = name;
            }
        }
        let Some(file_name) = file_name else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        let mut tracks = svc.tracks.lock();
        match tracks.iter_mut().find(|track| track.id == id) {
            Some(track) => {
                track.audio_file = AudioFile::Present(format!("{}-{}", id, file_name));
                Json(track.clone()).into_response()
            }
            None => not_found(),
        }
    }

    async fn remove_file(State(svc): State<FakeService>, Path(id): Path<String>) -> Response {
        let mut tracks = svc.tracks.lock();
        match tracks.iter_mut().find(|track| track.id == id) {
            Some(track) => {
                track.audio_file = AudioFile::Absent;
                Json(track.clone()).into_response()
            }
            None => not_found(),
        }
    }

    async fn genres() -> Json<Vec<&'static str>> {
        Json(vec!["Rock", "Jazz", "Pop"])
    }

    async fn spawn(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        ApiClient::new(&ApiConfig {
            base_url: format!("http://{}/", addr),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    async fn spawn_fake(svc: FakeService) -> ApiClient {
        let router = Router::new()
            .route("/api/tracks", get(list).post(create))
            .route("/api/tracks/:id", axum::routing::put(update).delete(remove))
            .route("/api/tracks/:id/upload", post(upload))
            .route("/api/tracks/:id/file", delete(remove_file))
            .route("/api/genres", get(genres))
            .with_state(svc);
        spawn(router).await
    }

    #[tokio::test]
    async fn lists_tracks_from_data_envelope() {
        let svc = FakeService::default();
        svc.tracks.lock().push(sample("a", "One"));
        svc.tracks.lock().push(sample("b", "Two"));
        let client = spawn_fake(svc).await;
        let tracks = client.list_tracks().await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].title, "Two");
    }

    #[tokio::test]
    async fn create_update_delete_cycle() {
        let svc = FakeService::default();
        let client = spawn_fake(svc.clone()).await;
        let draft = TrackDraft {
            title: "Song".to_string(),
            artist: "Band".to_string(),
            album: Some(" ".to_string()),
            cover_image: None,
            genres: vec!["Rock".to_string(), "Rock".to_string()],
        };
        let created = client.create_track(&draft).await.unwrap();
        assert_eq!(created.id, "srv-1");
        assert_eq!(created.album, None);
        assert_eq!(created.genres, vec!["Rock"]);

        let mut patch = created.to_draft();
        patch.title = "Renamed".to_string();
        let updated = client.update_track(&created.id, &patch).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "Renamed");

        client.delete_track(&created.id).await.unwrap();
        assert!(svc.tracks.lock().is_empty());
    }

    #[tokio::test]
    async fn clearing_optional_fields_survives_a_merging_server() {
        let svc = FakeService::default();
        let mut stored = sample("a", "One");
        stored.album = Some("LP".to_string());
        stored.cover_image = Some("/covers/lp.png".to_string());
        svc.tracks.lock().push(stored.clone());
        let client = spawn_fake(svc.clone()).await;

        let mut draft = stored.to_draft();
        draft.album = Some(String::new());
        draft.cover_image = None;
        let updated = client.update_track("a", &draft).await.unwrap();

        let body = svc.last_update.lock().clone().unwrap();
        assert_eq!(body.get("album"), Some(&serde_json::Value::Null));
        assert_eq!(body.get("coverImage"), Some(&serde_json::Value::Null));
        assert_eq!(updated.album, None);
        assert_eq!(updated.cover_image, None);
        assert_eq!(updated.title, "One");
    }

    #[tokio::test]
    async fn server_error_payload_is_surfaced() {
        let client = spawn_fake(FakeService::default()).await;
        let err = client.delete_track("missing").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 404,
                message: "Track not found".to_string()
            }
        );
        let err = client
            .create_track(&TrackDraft {
                artist: "Band".to_string(),
                ..TrackDraft::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Validation("Title is required".to_string()));
    }

    #[tokio::test]
    async fn uploads_and_removes_audio() {
        let svc = FakeService::default();
        svc.tracks.lock().push(sample("a", "One"));
        let client = spawn_fake(svc.clone()).await;
        let upload = AudioUpload::new("one.mp3", "audio/mpeg", Bytes::from_static(b"ID3data"));
        let track = client.upload_audio_file("a", &upload).await.unwrap();
        assert_eq!(track.audio_file, AudioFile::Present("a-one.mp3".to_string()));

        let track = client.delete_audio_file("a").await.unwrap();
        assert!(track.audio_file.is_absent());
    }

    #[tokio::test]
    async fn rejected_upload_never_reaches_the_server() {
        let svc = FakeService::default();
        svc.tracks.lock().push(sample("a", "One"));
        let client = spawn_fake(svc.clone()).await;
        let text = AudioUpload::new("notes.txt", "text/plain", Bytes::from_static(b"hello"));
        assert!(matches!(
            client.upload_audio_file("a", &text).await,
            Err(ApiError::Validation(_))
        ));
        let big = AudioUpload::new(
            "big.mp3",
            "audio/mpeg",
            Bytes::from(vec![0u8; 11 * 1024 * 1024]),
        );
        assert!(matches!(
            client.upload_audio_file("a", &big).await,
            Err(ApiError::Validation(_))
        ));
        assert_eq!(svc.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetches_genre_vocabulary() {
        let client = spawn_fake(FakeService::default()).await;
        assert_eq!(client.list_genres().await.unwrap(), vec!["Rock", "Jazz", "Pop"]);
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let router = Router::new().route("/api/genres", get(|| async { "not json" }));
        let client = spawn(router).await;
        assert!(matches!(
            client.list_genres().await,
            Err(ApiError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let client = ApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..ApiConfig::default()
        })
        .unwrap();
        assert!(matches!(
            client.list_tracks().await,
            Err(ApiError::Network(_))
        ));
    }

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let client = ApiClient::new(&ApiConfig {
            base_url: "http://example.com/backend/".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();
        let url = client.endpoint(&["api", "tracks", "a b"]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/backend/api/tracks/a%20b");
        assert_eq!(client.base_url(), "http://example.com/backend");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(ApiClient::new(&ApiConfig {
            base_url: "localhost without scheme".to_string(),
            ..ApiConfig::default()
        })
        .is_err());
    }
}
