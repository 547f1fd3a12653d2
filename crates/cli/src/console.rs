use std::io;
use std::path::Path;

use api_client::{validate_audio_meta, AudioUpload, TrackApi};
use bytes::Bytes;
use catalog::{Catalog, CatalogError, FormError, PageView, TrackForm};
use common::{AudioFile, Genre, Track};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::debug;

use crate::commands::{Command, CommandError, HELP};

pub struct Console<'a, A, R, W> {
    catalog: &'a Catalog<A>,
    lines: Lines<R>,
    out: W,
}

impl<'a, A, R, W> Console<'a, A, R, W>
where
    A: TrackApi,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(catalog: &'a Catalog<A>, input: R, out: W) -> Self {
        Self {
            catalog,
            lines: input.lines(),
            out,
        }
    }

    pub async fn run(&mut self) -> io::Result<()> {
        self.render_page().await?;
        loop {
            self.write("> ").await?;
            let Some(line) = self.read_line().await? else {
                break;
            };
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(CommandError::Empty) => continue,
                Err(err) => {
                    self.say(err.to_string()).await?;
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            debug!("command {:?}", command);
            self.execute(command).await?;
        }
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> io::Result<()> {
        match command {
            Command::List => self.render_page().await?,
            Command::Search(text) => {
                self.catalog.set_search(&text);
                // A console line is a finished edit; nothing to wait out.
                self.catalog.flush_search().await;
                self.render_page().await?;
            }
            Command::Genre(filter) => {
                self.catalog.set_genre_filter(filter);
                self.render_page().await?;
            }
            Command::Genres => {
                let genres = self.catalog.genres();
                if genres.is_empty() {
                    self.say("no genres loaded").await?;
                } else {
                    let names: Vec<&str> = genres.iter().map(Genre::name).collect();
                    self.say(names.join(", ")).await?;
                }
            }
            Command::Page(page) => {
                self.catalog.set_page(page);
                self.render_page().await?;
            }
            Command::Next => {
                self.catalog.next_page();
                self.render_page().await?;
            }
            Command::Prev => {
                self.catalog.prev_page();
                self.render_page().await?;
            }
            Command::Select(id) => {
                if self.catalog.track(&id).is_none() {
                    self.alert(CatalogError::UnknownTrack(id)).await?;
                } else if self.catalog.toggle_selected(&id) {
                    self.say(format!("selected {}", id)).await?;
                } else {
                    self.say(format!("deselected {}", id)).await?;
                }
            }
            Command::SelectPage => {
                if self.catalog.toggle_select_page() {
                    self.say("selected every track on this page").await?;
                } else {
                    self.say("deselected every track on this page").await?;
                }
            }
            Command::Clear => {
                self.catalog.clear_selection();
                self.say("selection cleared").await?;
            }
            Command::Delete(id) => match self.catalog.delete_track(&id).await {
                Ok(()) => {
                    self.say(format!("deleted {}", id)).await?;
                    self.render_page().await?;
                }
                Err(err) => self.alert(err).await?,
            },
            Command::DeleteSelected => self.delete_selected().await?,
            Command::Create => {
                if let Some(track) = self.run_form(TrackForm::create()).await? {
                    self.say(format!("created {} ({})", track.title, track.id))
                        .await?;
                    self.catalog.track_created(track);
                    self.render_page().await?;
                }
            }
            Command::Edit(id) => match self.catalog.track(&id) {
                Some(track) => {
                    if let Some(track) = self.run_form(TrackForm::edit(&track)).await? {
                        self.say(format!("updated {}", track.id)).await?;
                        self.catalog.track_updated(track);
                        self.render_page().await?;
                    }
                }
                None => self.alert(CatalogError::UnknownTrack(id)).await?,
            },
            Command::Attach { id, path } => match read_upload(&path).await {
                Ok(upload) => {
                    let name = upload.file_name.clone();
                    match self.catalog.choose_file(&id, upload) {
                        Ok(()) => {
                            self.say(format!("{} ready; run 'upload {}'", name, id))
                                .await?
                        }
                        Err(err) => self.alert(err).await?,
                    }
                }
                Err(message) => self.alert(message).await?,
            },
            Command::Upload(id) => match self.catalog.upload_file(&id).await {
                Ok(track) => {
                    self.say(format!("uploaded audio for {}", track.id)).await?;
                }
                Err(err) => self.alert(err).await?,
            },
            Command::RemoveFile(id) => match self.catalog.remove_file(&id).await {
                Ok(track) => self.say(format!("removed audio from {}", track.id)).await?,
                Err(err) => self.alert(err).await?,
            },
            Command::Play(id) => match self.catalog.play(&id) {
                Ok(previous) => {
                    if let Some(previous) = previous {
                        self.say(format!("stopped {}", previous)).await?;
                    }
                    let url = self.catalog.audio_url(&id).unwrap_or_default();
                    self.say(format!("playing {} from {}", id, url)).await?;
                }
                Err(err) => self.alert(err).await?,
            },
            Command::Pause(id) => {
                if self.catalog.pause(&id) {
                    self.say(format!("paused {}", id)).await?;
                } else {
                    self.say(format!("{} is not playing", id)).await?;
                }
            }
            Command::Reload => {
                if let Err(err) = self.catalog.load().await {
                    self.alert(err).await?;
                }
                self.render_page().await?;
            }
            Command::Help => self.say(HELP).await?,
            Command::Quit => {}
        }
        Ok(())
    }

    async fn delete_selected(&mut self) -> io::Result<()> {
        if self.catalog.selected_ids().is_empty() {
            return self.say("nothing selected").await;
        }
        let report = self.catalog.delete_selected().await;
        self.say(format!("deleted {} track(s)", report.deleted.len()))
            .await?;
        for (id, err) in &report.failed {
            self.alert(format!("could not delete {}: {}", id, err)).await?;
        }
        if report.resynced {
            self.say("list re-fetched from the server").await?;
        }
        self.render_page().await
    }

    async fn run_form(&mut self, mut form: TrackForm) -> io::Result<Option<Track>> {
        form.load_genres(self.catalog.api()).await;
        loop {
            let Some(title) = self.prompt_field("Title", &form.title).await? else {
                return Ok(None);
            };
            form.title = title;
            let Some(artist) = self.prompt_field("Artist", &form.artist).await? else {
                return Ok(None);
            };
            form.artist = artist;
            let Some(album) = self.prompt_field("Album", &form.album).await? else {
                return Ok(None);
            };
            form.album = album;
            let Some(cover) = self.prompt_field("Cover URL", &form.cover_image).await? else {
                return Ok(None);
            };
            form.cover_image = cover;
            if !self.prompt_genres(&mut form).await? {
                return Ok(None);
            }

            match form.submit(self.catalog.api()).await {
                Ok(track) => return Ok(Some(track)),
                Err(FormError::Invalid(errors)) => {
                    for (field, message) in errors.messages() {
                        self.say(format!("  {}: {}", field, message)).await?;
                    }
                }
                Err(err) => self.alert(err).await?,
            }

            self.write("Try again? [y/N] ").await?;
            let answer = self.read_line().await?.unwrap_or_default();
            if !answer.trim().eq_ignore_ascii_case("y") {
                form.close();
                self.say("cancelled").await?;
                return Ok(None);
            }
        }
    }

    /// Empty input keeps the current value, `-` clears it.
    async fn prompt_field(&mut self, label: &str, current: &str) -> io::Result<Option<String>> {
        if current.is_empty() {
            self.write(&format!("{}: ", label)).await?;
        } else {
            self.write(&format!("{} [{}]: ", label, current)).await?;
        }
        let Some(line) = self.read_line().await? else {
            return Ok(None);
        };
        let value = line.trim();
        Ok(Some(match value {
            "" => current.to_string(),
            "-" => String::new(),
            _ => value.to_string(),
        }))
    }

    async fn prompt_genres(&mut self, form: &mut TrackForm) -> io::Result<bool> {
        let available = form.available_genres().join(", ");
        self.say(format!(
            "Genres: [{}]  available: {}",
            form.genres().join(", "),
            if available.is_empty() { "-" } else { available.as_str() }
        ))
        .await?;
        self.write("Toggle genres (comma separated): ").await?;
        let Some(line) = self.read_line().await? else {
            return Ok(false);
        };
        for name in line.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            if form.genres().iter().any(|genre| genre == name) {
                form.remove_genre(name);
            } else if !form.add_genre(name) {
                self.say(format!("  unknown genre {}", name)).await?;
            }
        }
        Ok(true)
    }

    async fn render_page(&mut self) -> io::Result<()> {
        let view = self.catalog.view();
        let (query, genre, selected) = self.catalog.with_list(|list| {
            (
                list.query().to_string(),
                list.genre_filter().label().to_string(),
                list.selected_ids(),
            )
        });
        let playing = self.catalog.now_playing();
        let text = render_view(&view, &query, &genre, &selected, playing.as_deref());
        self.say(text).await
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }

    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await
    }

    async fn say(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        self.write(text.as_ref()).await?;
        self.write("\n").await
    }

    async fn alert(&mut self, message: impl std::fmt::Display) -> io::Result<()> {
        self.say(format!("! {}", message)).await
    }
}

async fn read_upload(path: &Path) -> Result<AudioUpload, String> {
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| format!("cannot read {}: {}", path.display(), err))?;
    validate_audio_meta(&mime_type, metadata.len()).map_err(|err| err.to_string())?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| format!("cannot read {}: {}", path.display(), err))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    Ok(AudioUpload::new(file_name, mime_type, Bytes::from(bytes)))
}

pub fn render_view(
    view: &PageView,
    query: &str,
    genre: &str,
    selected: &[String],
    playing: Option<&str>,
) -> String {
    let mut out = format!(
        "Page {}/{} ({} match{}) | search: \"{}\" | genre: {} | selected: {}",
        view.page,
        view.total_pages.max(1),
        view.total_matches,
        if view.total_matches == 1 { "" } else { "es" },
        query,
        genre,
        selected.len()
    );
    if view.items.is_empty() {
        out.push_str("\n  (no tracks)");
    }
    for track in &view.items {
        let is_selected = selected.iter().any(|id| id == &track.id);
        let is_playing = playing == Some(track.id.as_str());
        out.push('\n');
        out.push_str(&format_track_line(track, is_selected, is_playing));
    }
    out
}

pub fn format_track_line(track: &Track, selected: bool, playing: bool) -> String {
    let mut line = format!(
        "{} {}  {} - {}",
        if selected { "[x]" } else { "[ ]" },
        track.id,
        track.title,
        track.artist
    );
    if let Some(album) = track.album.as_deref() {
        line.push_str(&format!(" ({})", album));
    }
    for genre in &track.genres {
        line.push_str(&format!(" #{}", genre));
    }
    match &track.audio_file {
        AudioFile::Absent => {}
        AudioFile::Uploading => line.push_str("  [uploading]"),
        AudioFile::Present(_) if playing => line.push_str("  [playing]"),
        AudioFile::Present(_) => line.push_str("  [audio]"),
    }
    line
}
