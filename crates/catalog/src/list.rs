use std::collections::{HashMap, HashSet};

use api_client::AudioUpload;
use common::{AudioFile, Track};

pub const PAGE_SIZE: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GenreFilter {
    #[default]
    All,
    Only(String),
}

impl GenreFilter {
    /// Only the exact keyword `all` clears the filter, so a genre named
    /// "All" stays selectable.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == "all" {
            GenreFilter::All
        } else {
            GenreFilter::Only(value.to_string())
        }
    }

    pub fn matches(&self, track: &Track) -> bool {
        match self {
            GenreFilter::All => true,
            GenreFilter::Only(name) => track.has_genre(name),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GenreFilter::All => "all",
            GenreFilter::Only(name) => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageView {
    pub items: Vec<Track>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

#[derive(Debug)]
pub struct TrackList {
    tracks: Vec<Track>,
    search_input: String,
    query: String,
    genre: GenreFilter,
    page: usize,
    selected: HashSet<String>,
    pending_files: HashMap<String, AudioUpload>,
}

impl Default for TrackList {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            search_input: String::new(),
            query: String::new(),
            genre: GenreFilter::All,
            page: 1,
            selected: HashSet::new(),
            pending_files: HashMap::new(),
        }
    }
}

impl TrackList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == id)
    }

    /// Swaps in a freshly fetched collection. Selection and pending files
    /// pointing at ids that no longer exist are dropped.
    pub fn replace_all(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        let ids: HashSet<&str> = self.tracks.iter().map(|track| track.id.as_str()).collect();
        self.selected.retain(|id| ids.contains(id.as_str()));
        self.pending_files.retain(|id, _| ids.contains(id.as_str()));
        self.page = self.current_page();
    }

    pub fn insert(&mut self, track: Track) {
        if !self.replace(track.clone()) {
            self.tracks.push(track);
        }
    }

    pub fn replace(&mut self, track: Track) -> bool {
        match self.position(&track.id) {
            Some(index) => {
                self.tracks[index] = track;
                true
            }
            None => false,
        }
    }

    pub fn set_audio_file(&mut self, id: &str, audio_file: AudioFile) -> bool {
        match self.tracks.iter_mut().find(|track| track.id == id) {
            Some(track) => {
                track.audio_file = audio_file;
                true
            }
            None => false,
        }
    }

    /// Removes a track and every piece of transient state keyed by its id.
    /// Returns the former position with the track so it can be restored.
    pub fn remove(&mut self, id: &str) -> Option<(usize, Track)> {
        let index = self.position(id)?;
        let track = self.tracks.remove(index);
        self.selected.remove(id);
        self.pending_files.remove(id);
        self.page = self.current_page();
        Some((index, track))
    }

    pub fn restore(&mut self, index: usize, track: Track) {
        if self.position(&track.id).is_some() {
            return;
        }
        let index = index.min(self.tracks.len());
        self.tracks.insert(index, track);
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn set_search_input(&mut self, raw: &str) {
        self.search_input = raw.to_string();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn apply_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
        self.page = 1;
    }

    pub fn genre_filter(&self) -> &GenreFilter {
        &self.genre
    }

    pub fn set_genre_filter(&mut self, genre: GenreFilter) {
        self.genre = genre;
        self.page = 1;
    }

    pub fn filtered(&self) -> Vec<&Track> {
        let needle = self.query.to_lowercase();
        self.tracks
            .iter()
            .filter(|track| self.genre.matches(track) && track.matches_query(&needle))
            .collect()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(PAGE_SIZE)
    }

    pub fn current_page(&self) -> usize {
        self.page.clamp(1, self.total_pages().max(1))
    }

    pub fn set_page(&mut self, page: usize) -> usize {
        self.page = page;
        self.page = self.current_page();
        self.page
    }

    pub fn next_page(&mut self) -> usize {
        self.set_page(self.current_page() + 1)
    }

    pub fn prev_page(&mut self) -> usize {
        self.set_page(self.current_page().saturating_sub(1))
    }

    pub fn view(&self) -> PageView {
        let filtered = self.filtered();
        let total_matches = filtered.len();
        let total_pages = total_matches.div_ceil(PAGE_SIZE);
        let page = self.page.clamp(1, total_pages.max(1));
        let items = filtered
            .into_iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .cloned()
            .collect();
        PageView {
            items,
            page,
            total_pages,
            total_matches,
        }
    }

    pub fn visible_ids(&self) -> Vec<String> {
        self.view().items.into_iter().map(|track| track.id).collect()
    }

    pub fn toggle_selected(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    /// Selects every id on the visible page, or deselects them all if they
    /// already are. Ids on other pages are left alone.
    pub fn toggle_select_page(&mut self) -> bool {
        let visible = self.visible_ids();
        let all_selected =
            !visible.is_empty() && visible.iter().all(|id| self.selected.contains(id));
        if all_selected {
            for id in &visible {
                self.selected.remove(id);
            }
            false
        } else {
            self.selected.extend(visible);
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.tracks
            .iter()
            .filter(|track| self.selected.contains(&track.id))
            .map(|track| track.id.clone())
            .collect()
    }

    pub fn set_pending_file(&mut self, id: &str, upload: AudioUpload) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.pending_files.insert(id.to_string(), upload);
        true
    }

    pub fn pending_file(&self, id: &str) -> Option<&AudioUpload> {
        self.pending_files.get(id)
    }

    pub fn clear_pending_file(&mut self, id: &str) -> Option<AudioUpload> {
        self.pending_files.remove(id)
    }
}
