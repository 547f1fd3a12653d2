use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct Playback {
    active: Option<String>,
    playing: bool,
    positions: HashMap<String, Duration>,
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or resumes) playback of `id`. A different element that was
    /// active is paused and rewound to zero; its id is returned.
    pub fn play(&mut self, id: &str) -> Option<String> {
        let previous = match self.active.take() {
            Some(previous) if previous != id => {
                self.positions.insert(previous.clone(), Duration::ZERO);
                Some(previous)
            }
            _ => None,
        };
        self.active = Some(id.to_string());
        self.playing = true;
        previous
    }

    pub fn pause(&mut self, id: &str) -> bool {
        if self.active.as_deref() == Some(id) && self.playing {
            self.playing = false;
            true
        } else {
            false
        }
    }

    pub fn advance(&mut self, id: &str, elapsed: Duration) {
        if self.is_playing(id) {
            let position = self.positions.entry(id.to_string()).or_default();
            *position += elapsed;
        }
    }

    pub fn position(&self, id: &str) -> Duration {
        self.positions.get(id).copied().unwrap_or_default()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.playing && self.active.as_deref() == Some(id)
    }

    pub fn forget(&mut self, id: &str) {
        if self.active.as_deref() == Some(id) {
            self.active = None;
            self.playing = false;
        }
        self.positions.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playing_another_track_pauses_and_rewinds_the_previous_one() {
        let mut playback = Playback::new();
        assert_eq!(playback.play("y"), None);
        playback.advance("y", Duration::from_secs(42));
        assert_eq!(playback.position("y"), Duration::from_secs(42));

        assert_eq!(playback.play("x"), Some("y".to_string()));
        assert!(playback.is_playing("x"));
        assert!(!playback.is_playing("y"));
        assert_eq!(playback.position("y"), Duration::ZERO);
    }

    #[test]
    fn pause_then_resume_keeps_position() {
        let mut playback = Playback::new();
        playback.play("x");
        playback.advance("x", Duration::from_secs(5));
        assert!(playback.pause("x"));
        playback.advance("x", Duration::from_secs(5));
        assert_eq!(playback.play("x"), None);
        assert_eq!(playback.position("x"), Duration::from_secs(5));
    }

    #[test]
    fn pausing_an_inactive_element_is_a_no_op() {
        let mut playback = Playback::new();
        playback.play("x");
        assert!(!playback.pause("y"));
        assert!(playback.is_playing("x"));
    }

    #[test]
    fn forgetting_the_active_track_stops_playback() {
        let mut playback = Playback::new();
        playback.play("x");
        playback.forget("x");
        assert_eq!(playback.active(), None);
    }
}
