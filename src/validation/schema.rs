//! Per-endpoint request schemas.
//!
//! Every gated endpoint declares its fields here once. `from_payload`
//! consumes a `Payload`, rejects unknown fields before looking at values,
//! then validates and sanitizes each field in a fixed order.

use base64::Engine;
use serde::Serialize;
use url::Url;

use crate::http::error::{ApiError, ErrorKind};
use crate::validation::payload::Payload;
use crate::validation::rules::{self, char_len};
use crate::validation::sanitize::{strip_angle_brackets, strip_tags};

pub const IMAGE_MODELS: [&str; 3] = ["flux", "turbo", "kontext"];
pub const MIN_IMAGE_SIZE: u32 = 64;
pub const MAX_IMAGE_SIZE: u32 = 2048;
pub const DEFAULT_IMAGE_SIZE: u32 = 1024;

pub const TEXT_MODELS: [&str; 13] = [
    "gpt-5-nano",
    "llama-fast-roblox",
    "llama-roblox",
    "llamascout",
    "mistral",
    "mistral-nemo-roblox",
    "mistral-roblox",
    "nova-fast",
    "openai",
    "openai-fast",
    "openai-roblox",
    "midijourney",
    "mirexa",
];
pub const MAX_TEXT_TOKENS: u32 = 1000;

pub const VOICES: [&str; 6] = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"];
pub const SPEECH_LANGUAGES: [&str; 4] = ["zh", "en", "ja", "ko"];

pub const AUDIO_FORMATS: [&str; 4] = ["mp3", "wav", "m4a", "webm"];
pub const AUDIO_MIME_TYPES: [&str; 6] = [
    "audio/mp3",
    "audio/mpeg",
    "audio/wav",
    "audio/x-wav",
    "audio/m4a",
    "audio/webm",
];
pub const TRANSCRIPTION_LANGUAGES: [&str; 5] = ["zh-CN", "en-US", "ja-JP", "ko-KR", "auto"];
pub const MAX_AUDIO_BYTES: usize = 50 * 1024 * 1024;
pub const MAX_AUDIO_SECONDS: u64 = 300;

pub const CUSTOM_DIMENSION_MAX: usize = 10;

const SUBJECTS: [&str; 10] = [
    "portrait",
    "landscape",
    "animal",
    "architectural",
    "still life",
    "fantasy creature",
    "sci-fi robot",
    "historical figure",
    "mythical beast",
    "abstract form",
];
const STYLES: [&str; 10] = [
    "realistic",
    "oil painting",
    "watercolor",
    "pencil sketch",
    "digital art",
    "anime",
    "cyberpunk",
    "impressionist",
    "surrealist",
    "pixel art",
];
const QUALITIES: [&str; 10] = [
    "high resolution",
    "4K",
    "ultra detailed",
    "sharp focus",
    "masterpiece",
    "professional",
    "cinematic",
    "octane render",
    "unreal engine",
    "HDR",
];
const COMPOSITIONS: [&str; 10] = [
    "front view",
    "side view",
    "aerial view",
    "close up",
    "wide angle",
    "macro",
    "panoramic",
    "symmetrical",
    "rule of thirds",
    "centered",
];
const LIGHTING: [&str; 10] = [
    "natural light",
    "studio lighting",
    "golden hour",
    "neon lighting",
    "dramatic lighting",
    "backlighting",
    "soft lighting",
    "hard lighting",
    "volumetric lighting",
    "rim lighting",
];
const COLORS: [&str; 10] = [
    "vibrant",
    "pastel",
    "monochrome",
    "warm colors",
    "cool colors",
    "complementary colors",
    "neon palette",
    "earthy tones",
    "jewel tones",
    "matte colors",
];
const MOODS: [&str; 10] = [
    "serene",
    "dramatic",
    "mysterious",
    "joyful",
    "melancholic",
    "energetic",
    "romantic",
    "epic",
    "peaceful",
    "chaotic",
];
const ENVIRONMENTS: [&str; 10] = [
    "forest",
    "ocean",
    "mountain",
    "cityscape",
    "desert",
    "space",
    "underwater",
    "castle",
    "futuristic city",
    "dreamlike realm",
];

/// Dimension name, its custom-value field, and the allowed presets.
const DIMENSIONS: [(&str, &str, &[&str]); 8] = [
    ("subject", "customSubject", &SUBJECTS),
    ("style", "customStyle", &STYLES),
    ("quality", "customQuality", &QUALITIES),
    ("composition", "customComposition", &COMPOSITIONS),
    ("lighting", "customLighting", &LIGHTING),
    ("color", "customColor", &COLORS),
    ("mood", "customMood", &MOODS),
    ("environment", "customEnvironment", &ENVIRONMENTS),
];

const OTHER: &str = "other";

/// Shared prompt rule: required, sanitized, bounded.
fn prompt_field(value: Option<String>, max: usize) -> Result<String, ApiError> {
    let raw = rules::required(value, "prompt", "prompt parameter cannot be empty")?;
    let prompt = strip_angle_brackets(&raw);
    if prompt.is_empty() {
        return Err(ApiError::new(ErrorKind::InvalidPrompt, "Invalid prompt").with_field("prompt"));
    }
    if char_len(&prompt) > max {
        return Err(ApiError::prompt_too_long(max));
    }
    Ok(prompt)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextToImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub model: String,
    pub seed: u32,
}

impl TextToImageRequest {
    pub const MAX_PROMPT: usize = 1000;

    pub fn from_payload(mut payload: Payload) -> Result<Self, ApiError> {
        let prompt = payload.take_text("prompt")?;
        let width = payload.take_scalar("width")?;
        let height = payload.take_scalar("height")?;
        let model = payload.take_text("model")?;
        let seed = payload.take_scalar("seed")?;
        payload.finish()?;

        let prompt = prompt_field(prompt, Self::MAX_PROMPT)?;
        let width = rules::image_dimension(width, "width", MIN_IMAGE_SIZE, MAX_IMAGE_SIZE, DEFAULT_IMAGE_SIZE)?;
        let height = rules::image_dimension(height, "height", MIN_IMAGE_SIZE, MAX_IMAGE_SIZE, DEFAULT_IMAGE_SIZE)?;
        let model = rules::one_of(model, &IMAGE_MODELS, "flux", || {
            ApiError::validation("Unsupported image model").with_field("model")
        })?;

        Ok(Self {
            prompt,
            width,
            height,
            model,
            seed: rules::seed_or_random(seed),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageToImageRequest {
    pub prompt: String,
    pub image_url: Url,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub seed: u32,
    pub strength: f64,
}

impl ImageToImageRequest {
    pub const MAX_PROMPT: usize = 500;
    pub const DEFAULT_STRENGTH: f64 = 0.5;

    pub fn from_payload(mut payload: Payload) -> Result<Self, ApiError> {
        let prompt = payload.take_text("prompt")?;
        let image_url = payload.take_text("imageUrl")?;
        let width = payload.take_scalar("width")?;
        let height = payload.take_scalar("height")?;
        let seed = payload.take_scalar("seed")?;
        let strength = payload.take_scalar("strength")?;
        payload.finish()?;

        let prompt = prompt_field(prompt, Self::MAX_PROMPT)?;
        let image_url = rules::required(image_url, "imageUrl", "imageUrl parameter cannot be empty")?;
        let image_url = rules::http_url(&image_url, "imageUrl")?;

        let optional_dimension = |value: Option<String>, field: &str| match value {
            Some(v) if !v.trim().is_empty() => {
                rules::image_dimension(Some(v), field, 1, MAX_IMAGE_SIZE, 0).map(Some)
            }
            _ => Ok(None),
        };
        let width = optional_dimension(width, "width")?;
        let height = optional_dimension(height, "height")?;

        let strength = rules::float_in_range(strength, 0.0, 1.0, Self::DEFAULT_STRENGTH, || {
            ApiError::validation("strength must be between 0 and 1").with_field("strength")
        })?;

        Ok(Self {
            prompt,
            image_url,
            width,
            height,
            seed: rules::seed_or_random(seed),
            strength,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextToTextRequest {
    pub text: String,
    pub max_tokens: u32,
    pub model: String,
}

impl TextToTextRequest {
    pub const MAX_TEXT: usize = 5000;

    pub fn from_payload(mut payload: Payload) -> Result<Self, ApiError> {
        let text = payload.take_text("text")?;
        let max_length = payload.take_scalar("maxLength")?;
        let model = payload.take_text("model")?;
        payload.finish()?;

        let raw = rules::required(text, "text", "Text cannot be empty")?;
        let text = strip_angle_brackets(&raw);
        if char_len(&text) > Self::MAX_TEXT {
            return Err(ApiError::text_too_long(Self::MAX_TEXT));
        }

        let max_tokens = match max_length {
            None => MAX_TEXT_TOKENS,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 1.0 => (v.floor() as u64).min(MAX_TEXT_TOKENS as u64) as u32,
                _ => {
                    return Err(ApiError::validation("maxLength must be a positive integer")
                        .with_field("maxLength"))
                }
            },
        };

        let model = rules::one_of(model, &TEXT_MODELS, "openai", || {
            ApiError::validation("Unsupported model").with_field("model")
        })?;

        Ok(Self {
            text,
            max_tokens,
            model,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextToSpeechRequest {
    pub text: String,
    pub voice: String,
    pub language: String,
    pub speed: f64,
}

impl TextToSpeechRequest {
    pub const MAX_TEXT: usize = 1000;

    pub fn from_payload(mut payload: Payload) -> Result<Self, ApiError> {
        let text = payload.take_text("text")?;
        let voice = payload.take_text("voice")?;
        let language = payload.take_text("language")?;
        let speed = payload.take_scalar("speed")?;
        payload.finish()?;

        let raw = rules::required(text, "text", "Text cannot be empty")?;
        let text = strip_tags(&raw);
        if text.is_empty() {
            return Err(ApiError::validation("Text cannot be empty").with_field("text"));
        }
        if char_len(&text) > Self::MAX_TEXT {
            return Err(ApiError::text_too_long(Self::MAX_TEXT));
        }

        let speed = rules::float_in_range(speed, 0.5, 2.0, 1.0, || {
            ApiError::validation("Speech speed must be between 0.5 and 2.0").with_field("speed")
        })?;
        let language = rules::one_of(language, &SPEECH_LANGUAGES, "zh", || {
            ApiError::validation("Unsupported language type").with_field("language")
        })?;
        let voice = rules::one_of(voice, &VOICES, "alloy", || {
            ApiError::validation(format!("Voice must be one of: {}", VOICES.join(", ")))
                .with_field("voice")
        })?;

        Ok(Self {
            text,
            voice,
            language,
            speed,
        })
    }

    /// Rough spoken length: eight characters per second.
    pub fn estimated_duration_secs(&self) -> u64 {
        (char_len(&self.text) as u64).div_ceil(8)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechToTextRequest {
    /// Base64 payload without the data-URL prefix.
    pub audio_base64: String,
    pub mime_type: String,
    pub format: String,
    pub language: String,
    pub decoded_bytes: usize,
    pub estimated_duration_secs: u64,
}

impl SpeechToTextRequest {
    pub fn from_payload(mut payload: Payload) -> Result<Self, ApiError> {
        let audio = payload.take_text("audioData")?;
        let format = payload.take_text("format")?;
        let language = payload.take_text("language")?;
        payload.finish()?;

        let audio = rules::required(audio, "audioData", "Audio data cannot be empty")?;

        let format = rules::one_of(format, &AUDIO_FORMATS, "mp3", || {
            ApiError::new(
                ErrorKind::InvalidAudioFormat,
                "Audio format must be mp3, wav, m4a, or webm",
            )
            .with_field("format")
        })?;

        let bad_data = |message: &str| ApiError::validation(message).with_field("audioData");

        let Some(rest) = audio.strip_prefix("data:") else {
            return Err(bad_data(
                "Incorrect audio data format, please use base64 encoded audio data",
            ));
        };
        if !rest.starts_with("audio/") {
            return Err(bad_data(
                "Incorrect audio data format, please use base64 encoded audio data",
            ));
        }
        let Some((mime_type, _)) = rest.split_once(';') else {
            return Err(bad_data("Incorrect audio data format"));
        };
        if !AUDIO_MIME_TYPES.contains(&mime_type) {
            return Err(ApiError::new(
                ErrorKind::InvalidAudioFormat,
                "Unsupported audio format, please use MP3, WAV, M4A, or WebM format",
            )
            .with_field("audioData"));
        }

        let parts: Vec<&str> = audio.split(',').collect();
        if parts.len() != 2 {
            return Err(bad_data("Incorrect audio data format"));
        }
        let encoded = parts[1];

        let too_large = || {
            ApiError::new(ErrorKind::AudioTooLarge, "Audio file size cannot exceed 50MB")
                .with_field("audioData")
        };
        // Reject oversized payloads before decoding them.
        if encoded.len() > MAX_AUDIO_BYTES / 3 * 4 + 4 {
            return Err(too_large());
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| bad_data("Audio data is not valid base64"))?;
        if decoded.len() > MAX_AUDIO_BYTES {
            return Err(too_large());
        }

        let estimated_duration_secs = estimate_duration_secs(decoded.len(), &format);
        if estimated_duration_secs > MAX_AUDIO_SECONDS {
            return Err(bad_data("Audio duration cannot exceed 5 minutes"));
        }

        let language = rules::one_of(language, &TRANSCRIPTION_LANGUAGES, "auto", || {
            ApiError::validation("Unsupported language type").with_field("language")
        })?;

        Ok(Self {
            audio_base64: encoded.to_string(),
            mime_type: mime_type.to_string(),
            format,
            language,
            decoded_bytes: decoded.len(),
            estimated_duration_secs,
        })
    }

    /// Language reported back to the caller; `auto` is reported as en-US.
    pub fn reported_language(&self) -> &str {
        if self.language == "auto" {
            "en-US"
        } else {
            &self.language
        }
    }
}

/// Duration estimate from typical bitrates per container.
pub fn estimate_duration_secs(bytes: usize, format: &str) -> u64 {
    let bytes = bytes as f64;
    let secs = match format {
        "wav" => bytes / (2.0 * 44_100.0),
        "m4a" => bytes * 8.0 / 96_000.0,
        "webm" => bytes * 8.0 / 64_000.0,
        _ => bytes * 8.0 / 128_000.0,
    };
    secs.round() as u64
}

/// Resolved image-prompt dimensions (custom values substituted for `other`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptDimensions {
    pub subject: Option<String>,
    pub style: Option<String>,
    pub quality: Option<String>,
    pub composition: Option<String>,
    pub lighting: Option<String>,
    pub color: Option<String>,
    pub mood: Option<String>,
    pub environment: Option<String>,
}

impl PromptDimensions {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "subject" => Some(&mut self.subject),
            "style" => Some(&mut self.style),
            "quality" => Some(&mut self.quality),
            "composition" => Some(&mut self.composition),
            "lighting" => Some(&mut self.lighting),
            "color" => Some(&mut self.color),
            "mood" => Some(&mut self.mood),
            "environment" => Some(&mut self.environment),
            _ => None,
        }
    }

    fn values(&self) -> [&Option<String>; 8] {
        [
            &self.subject,
            &self.style,
            &self.quality,
            &self.composition,
            &self.lighting,
            &self.color,
            &self.mood,
            &self.environment,
        ]
    }

    /// Comma-joined selected values, skipping unresolved `other`.
    pub fn base_prompt(&self) -> String {
        self.values()
            .into_iter()
            .filter_map(|v| v.as_deref())
            .filter(|v| !v.is_empty() && *v != OTHER)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePromptRequest {
    pub dimensions: PromptDimensions,
}

impl ImagePromptRequest {
    pub fn from_payload(mut payload: Payload) -> Result<Self, ApiError> {
        let mut selected = Vec::with_capacity(DIMENSIONS.len());
        for (name, custom_field, _) in DIMENSIONS {
            let value = payload.take_text(name)?;
            let custom = payload.take_text(custom_field)?;
            selected.push((value, custom));
        }
        payload.finish()?;

        for ((name, _, presets), (value, _)) in DIMENSIONS.iter().zip(&selected) {
            if let Some(v) = value.as_deref() {
                if !(v.is_empty() || v == OTHER || presets.contains(&v)) {
                    return Err(ApiError::validation(format!("Invalid {} value", name)).with_field(*name));
                }
            }
        }

        if selected
            .iter()
            .all(|(value, _)| value.as_deref().map_or(true, str::is_empty))
        {
            return Err(ApiError::validation("Please select at least one dimension"));
        }

        let mut dimensions = PromptDimensions::default();
        for ((name, custom_field, _), (value, custom)) in DIMENSIONS.iter().zip(selected) {
            let custom = custom.map(|c| strip_angle_brackets(&c));
            if let Some(c) = custom.as_deref() {
                if char_len(c) > CUSTOM_DIMENSION_MAX {
                    return Err(ApiError::validation(format!(
                        "Custom {} cannot exceed {} characters",
                        name, CUSTOM_DIMENSION_MAX
                    ))
                    .with_field(*custom_field));
                }
            }
            let resolved = match (value, custom) {
                (Some(v), Some(c)) if v == OTHER && !c.is_empty() => Some(c),
                (Some(v), _) if v.is_empty() => None,
                (value, _) => value,
            };
            if let Some(slot) = dimensions.slot(name) {
                *slot = resolved;
            }
        }

        Ok(Self { dimensions })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizePromptRequest {
    pub prompt: String,
}

impl OptimizePromptRequest {
    pub const MAX_PROMPT: usize = 500;

    pub fn from_payload(mut payload: Payload) -> Result<Self, ApiError> {
        let prompt = payload.take_text("prompt")?;
        payload.finish()?;
        Ok(Self {
            prompt: prompt_field(prompt, Self::MAX_PROMPT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_value(value).unwrap()
    }

    fn audio_data_url(mime: &str, bytes: usize) -> String {
        format!("data:{};base64,{}", mime, STANDARD.encode(vec![0u8; bytes]))
    }

    #[test]
    fn test_prompt_over_limit() {
        let err = TextToImageRequest::from_payload(payload(json!({"prompt": "a".repeat(1001)})))
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, ErrorKind::PromptTooLong);
        assert_eq!(err.field.as_deref(), Some("prompt"));

        let ok = TextToImageRequest::from_payload(payload(json!({"prompt": "a".repeat(1000)})));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_text_to_image_defaults_and_strings() {
        let req = TextToImageRequest::from_payload(payload(json!({
            "prompt": " <cat> ", "width": "512", "height": 768, "seed": "7"
        })))
        .unwrap();
        assert_eq!(req.prompt, "cat");
        assert_eq!((req.width, req.height), (512, 768));
        assert_eq!(req.model, "flux");
        assert_eq!(req.seed, 7);
    }

    #[test]
    fn test_unknown_field_reported_before_values() {
        let err = TextToImageRequest::from_payload(payload(json!({
            "prompt": "cat", "width": "512", "height": "512", "unexpectedField": "x"
        })))
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("unexpectedField"));
    }

    #[test]
    fn test_image_to_image_requires_http_url() {
        let err = ImageToImageRequest::from_payload(payload(json!({
            "prompt": "cat", "imageUrl": "file:///etc/passwd"
        })))
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("imageUrl"));

        let req = ImageToImageRequest::from_payload(payload(json!({
            "prompt": "cat", "imageUrl": "https://example.com/a.png", "width": "300"
        })))
        .unwrap();
        assert_eq!(req.width, Some(300));
        assert_eq!(req.height, None);
        assert_eq!(req.strength, 0.5);
    }

    #[test]
    fn test_text_to_text_clamps_tokens() {
        let req = TextToTextRequest::from_payload(payload(json!({"text": "hi", "maxLength": 4000})))
            .unwrap();
        assert_eq!(req.max_tokens, 1000);
        assert_eq!(req.model, "openai");

        let err = TextToTextRequest::from_payload(payload(json!({"text": "x".repeat(5001)})))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TextTooLong);

        assert!(TextToTextRequest::from_payload(payload(json!({"text": "hi", "model": "gpt-99"}))).is_err());
    }

    #[test]
    fn test_speech_rules() {
        let req = TextToSpeechRequest::from_payload(payload(json!({
            "text": "<b>Hello</b> there", "speed": 1.5
        })))
        .unwrap();
        assert_eq!(req.text, "Hello there");
        assert_eq!(req.voice, "alloy");
        assert_eq!(req.language, "zh");
        assert_eq!(req.estimated_duration_secs(), 2);

        let err = TextToSpeechRequest::from_payload(payload(json!({"text": "hi", "speed": "3"})))
            .unwrap_err();
        assert_eq!(err.message, "Speech speed must be between 0.5 and 2.0");
        assert!(TextToSpeechRequest::from_payload(payload(json!({"text": "hi", "voice": "robot"}))).is_err());
        assert!(TextToSpeechRequest::from_payload(payload(json!({"text": "hi", "language": "fr"}))).is_err());
    }

    #[test]
    fn test_unsupported_audio_format() {
        let err = SpeechToTextRequest::from_payload(payload(json!({
            "audioData": audio_data_url("audio/mpeg", 16),
            "format": "ogg"
        })))
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, ErrorKind::InvalidAudioFormat);
        assert_eq!(err.message, "Audio format must be mp3, wav, m4a, or webm");
    }

    #[test]
    fn test_audio_data_url_checks() {
        let req = SpeechToTextRequest::from_payload(payload(json!({
            "audioData": audio_data_url("audio/wav", 88_200), "format": "wav"
        })))
        .unwrap();
        assert_eq!(req.mime_type, "audio/wav");
        assert_eq!(req.estimated_duration_secs, 1);
        assert_eq!(req.reported_language(), "en-US");

        let err = SpeechToTextRequest::from_payload(payload(json!({
            "audioData": audio_data_url("audio/ogg", 16)
        })))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAudioFormat);

        assert!(SpeechToTextRequest::from_payload(payload(json!({"audioData": "AAAA"}))).is_err());
        assert!(SpeechToTextRequest::from_payload(payload(json!({
            "audioData": "data:audio/mp3;base64,!!!"
        })))
        .is_err());
    }

    #[test]
    fn test_audio_duration_limit() {
        // 128 kbps mp3: 16000 bytes per second, so 301 seconds exceeds the cap.
        let err = SpeechToTextRequest::from_payload(payload(json!({
            "audioData": audio_data_url("audio/mp3", 16_000 * 301)
        })))
        .unwrap_err();
        assert_eq!(err.message, "Audio duration cannot exceed 5 minutes");
    }

    #[test]
    fn test_image_prompt_dimensions() {
        let req = ImagePromptRequest::from_payload(payload(json!({
            "subject": "other", "customSubject": "dragon", "style": "anime", "mood": ""
        })))
        .unwrap();
        assert_eq!(req.dimensions.subject.as_deref(), Some("dragon"));
        assert_eq!(req.dimensions.mood, None);
        assert_eq!(req.dimensions.base_prompt(), "dragon, anime");

        let none = ImagePromptRequest::from_payload(payload(json!({"subject": ""}))).unwrap_err();
        assert_eq!(none.message, "Please select at least one dimension");

        let bad = ImagePromptRequest::from_payload(payload(json!({"style": "crayon"}))).unwrap_err();
        assert_eq!(bad.message, "Invalid style value");

        let long = ImagePromptRequest::from_payload(payload(json!({
            "subject": "other", "customSubject": "a very long subject"
        })))
        .unwrap_err();
        assert_eq!(long.message, "Custom subject cannot exceed 10 characters");
    }

    #[test]
    fn test_unresolved_other_left_out_of_base_prompt() {
        let req = ImagePromptRequest::from_payload(payload(json!({"subject": "other", "color": "pastel"})))
            .unwrap();
        assert_eq!(req.dimensions.base_prompt(), "pastel");
    }
}
