use bytes::Bytes;

use crate::ApiError;

pub const ALLOWED_AUDIO_MIME_TYPES: &[&str] = &["audio/mpeg", "audio/wav"];
pub const MAX_AUDIO_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AudioUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl AudioUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub fn validate_audio_upload(upload: &AudioUpload) -> Result<(), ApiError> {
    validate_audio_meta(&upload.mime_type, upload.size())
}

pub fn validate_audio_meta(mime_type: &str, size_bytes: u64) -> Result<(), ApiError> {
    let mime_type = mime_type.trim().to_ascii_lowercase();
    if !ALLOWED_AUDIO_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "Unsupported file type {}; only MP3 and WAV are allowed",
            if mime_type.is_empty() { "(unknown)" } else { &mime_type }
        )));
    }
    if size_bytes == 0 {
        return Err(ApiError::Validation("File is empty".to_string()));
    }
    if size_bytes > MAX_AUDIO_BYTES {
        return Err(ApiError::Validation(format!(
            "File is too large ({:.1} MiB); the limit is 10 MiB",
            size_bytes as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mp3_and_wav_within_limit() {
        assert!(validate_audio_meta("audio/mpeg", 1024).is_ok());
        assert!(validate_audio_meta("audio/wav", MAX_AUDIO_BYTES).is_ok());
        assert!(validate_audio_meta("Audio/MPEG", 1).is_ok());
    }

    #[test]
    fn rejects_plain_text() {
        let err = validate_audio_meta("text/plain", 10).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn rejects_eleven_mebibytes() {
        let upload = AudioUpload::new(
            "big.mp3",
            "audio/mpeg",
            Bytes::from(vec![0u8; 11 * 1024 * 1024]),
        );
        let err = validate_audio_upload(&upload).unwrap_err();
        assert!(err.message().contains("10 MiB"));
    }

    #[test]
    fn rejects_empty_file() {
        assert!(validate_audio_meta("audio/wav", 0).is_err());
    }
}
