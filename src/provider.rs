use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::model::{
    AppSettings, CharacterDesign, CharacterStats, ChatRole, ChatTurn, DesignField, FieldUpdate,
    Quality,
};

pub const TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// Every provider call is one-shot: no retry, no backoff. The timeout is the
// only bound on a hung request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const PROMPT_ENHANCERS: &str = "masterpiece, top-tier quality, highly detailed, 8k resolution, \
     cinematic lighting, vibrant colors, sharp focus, volumetric fog, \
     trending on pixiv and artstation.";

const SENSEI_SYSTEM: &str =
    "You are the Omni-Sensei of AARUTO_ANIME.AI, the most advanced character generation terminal.";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("incomplete design: {0}")]
    Incomplete(String),

    #[error("Materialization failed. The void did not respond.")]
    NoImage,

    #[error("Audio resonance failed.")]
    NoAudio,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVariant {
    Character,
    Environment,
}

impl ImageVariant {
    fn aspect_ratio(&self) -> &'static str {
        match self {
            ImageVariant::Character => "3:4",
            ImageVariant::Environment => "16:9",
        }
    }
}

/// The capability boundary the session controller talks through. One
/// implementation speaks to Gemini; tests substitute their own.
#[async_trait]
pub trait GenerationBackend {
    async fn generate_design(&self, prompt: &str) -> Result<CharacterDesign>;

    async fn evolve_design(&self, current: &CharacterDesign) -> Result<CharacterDesign>;

    async fn generate_image(
        &self,
        design: &CharacterDesign,
        quality: Quality,
        settings: &AppSettings,
        variant: ImageVariant,
    ) -> Result<String>;

    /// Returns base64 PCM16 at 24 kHz; decoding is the caller's concern.
    async fn generate_theme_audio(&self, design: &CharacterDesign) -> Result<String>;

    async fn update_field(
        &self,
        design: &CharacterDesign,
        field: DesignField,
    ) -> Result<FieldUpdate>;

    async fn lore_chat(&self, design: &CharacterDesign, question: &str) -> Result<String>;

    async fn sensei_advice(&self, transcript: &[ChatTurn]) -> Result<String>;
}

/// Thin client over the Gemini `generateContent` REST endpoints.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        GeminiClient {
            http,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    async fn generate(&self, model: &str, body: Value) -> Result<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            model,
            self.api_key
        );

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{}: {}", status, error_text)));
        }

        Ok(response.json().await?)
    }

    fn response_text(response: &Value) -> Result<&str> {
        response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("no text part in response".to_string()))
    }

    /// First inline binary payload in the response, if any.
    fn inline_data(response: &Value) -> Option<&str> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;
        parts.iter().find_map(|p| p["inlineData"]["data"].as_str())
    }

    fn parse_design(text: &str) -> Result<CharacterDesign> {
        let mut design: CharacterDesign = serde_json::from_str(text)
            .map_err(|e| ProviderError::Malformed(format!("design JSON: {}", e)))?;
        design
            .ensure_complete()
            .map_err(|e| ProviderError::Incomplete(e.to_string()))?;
        Ok(design)
    }
}

fn stats_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "strength": { "type": "INTEGER" },
            "agility": { "type": "INTEGER" },
            "intelligence": { "type": "INTEGER" },
            "stamina": { "type": "INTEGER" }
        },
        "required": ["strength", "agility", "intelligence", "stamina"]
    })
}

fn design_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "title": { "type": "STRING" },
            "personality": { "type": "STRING" },
            "aesthetic": { "type": "STRING" },
            "powers": { "type": "ARRAY", "items": { "type": "STRING" } },
            "lore": { "type": "STRING" },
            "visualTraits": { "type": "STRING" },
            "homeworld": { "type": "STRING" },
            "evolutionStage": { "type": "INTEGER" },
            "stats": stats_schema()
        },
        "required": [
            "name", "title", "personality", "aesthetic", "powers",
            "lore", "visualTraits", "stats", "homeworld", "evolutionStage"
        ]
    })
}

/// Schema for a single-field rewrite; the payload shape follows the field.
fn field_schema(field: DesignField) -> Value {
    let new_value = match field {
        DesignField::Powers => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
        DesignField::Stats => stats_schema(),
        _ => json!({ "type": "STRING" }),
    };
    json!({
        "type": "OBJECT",
        "properties": { "newValue": new_value },
        "required": ["newValue"]
    })
}

/// Converts the provider's `newValue` payload into a typed update for the
/// requested field.
fn field_update_from_value(field: DesignField, value: Value) -> Result<FieldUpdate> {
    let text = |value: Value| -> Result<String> {
        value
            .as_str()
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed(format!("empty '{}' value", field.wire_name())))
    };

    match field {
        DesignField::Name => Ok(FieldUpdate::Name(text(value)?)),
        DesignField::Title => Ok(FieldUpdate::Title(text(value)?)),
        DesignField::Personality => Ok(FieldUpdate::Personality(text(value)?)),
        DesignField::Aesthetic => Ok(FieldUpdate::Aesthetic(text(value)?)),
        DesignField::Lore => Ok(FieldUpdate::Lore(text(value)?)),
        DesignField::VisualTraits => Ok(FieldUpdate::VisualTraits(text(value)?)),
        DesignField::Homeworld => Ok(FieldUpdate::Homeworld(text(value)?)),
        DesignField::Powers => {
            let mut powers: Vec<String> = serde_json::from_value(value)
                .map_err(|e| ProviderError::Malformed(format!("powers: {}", e)))?;
            powers.retain(|p| !p.trim().is_empty());
            if powers.is_empty() {
                return Err(ProviderError::Malformed("empty powers list".to_string()));
            }
            Ok(FieldUpdate::Powers(powers))
        }
        DesignField::Stats => {
            let mut stats: CharacterStats = serde_json::from_value(value)
                .map_err(|e| ProviderError::Malformed(format!("stats: {}", e)))?;
            stats.clamp_all();
            Ok(FieldUpdate::Stats(stats))
        }
    }
}

/// The service owes us a strictly increasing stage; if it under-delivers we
/// bump it locally instead of failing the whole evolution.
fn ensure_stage_progress(current_stage: u32, evolved: &mut CharacterDesign) {
    if evolved.evolution_stage <= current_stage {
        evolved.evolution_stage = current_stage + 1;
    }
}

fn image_prompt(design: &CharacterDesign, settings: &AppSettings, variant: ImageVariant) -> String {
    match variant {
        ImageVariant::Character => format!(
            "{} masterpiece. {}. Character: {} ({}). traits: {}. Lighting: {}. Background: {}. {}",
            settings.art_style,
            settings.composition,
            design.name,
            design.title,
            design.visual_traits,
            settings.lighting,
            design.homeworld,
            PROMPT_ENHANCERS
        ),
        ImageVariant::Environment => format!(
            "Cinematic {} environment background. Wide angle. Location: {}. Lighting: {}. \
             Atmospheric world-building, high-fidelity textures. {}",
            settings.art_style, design.homeworld, settings.lighting, PROMPT_ENHANCERS
        ),
    }
}

fn theme_narration(design: &CharacterDesign) -> String {
    format!(
        "Heed the call of {}, the {}! Originating from {}, their presence reshapes reality \
         itself. Power levels are peaking at stage {}. Let the chronicle begin!",
        design.name, design.title, design.homeworld, design.evolution_stage
    )
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate_design(&self, prompt: &str) -> Result<CharacterDesign> {
        let contents = format!(
            "You are the Master Architect of AARUTO_ANIME.AI. Design an apex-tier anime \
             character based on: \"{}\".\n\n\
             Requirements:\n\
             1. 'visualTraits': Describe with supreme detail (e.g., 'eyes burning with \
             celestial supernova energy', 'armor forged from the core of a dying star').\n\
             2. 'homeworld': An environment that dictates their biology and power.\n\
             3. 'stats': 1-100 values for Strength, Agility, Intelligence, Stamina.\n\
             4. 'evolutionStage': Start at 1.",
            prompt
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": contents }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": design_schema()
            }
        });

        let response = self.generate(TEXT_MODEL, body).await?;
        Self::parse_design(Self::response_text(&response)?)
    }

    async fn evolve_design(&self, current: &CharacterDesign) -> Result<CharacterDesign> {
        let current_json = serde_json::to_string(current)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let contents = format!(
            "Perform a God-Tier Ascension for: {}.\n\n\
             Rules:\n\
             1. Dramatically upgrade stats.\n\
             2. Update 'visualTraits' to reflect supreme power (e.g., aura of localized \
             space-time distortion, hair turning into pure light, growing spectral wings).\n\
             3. Increment 'evolutionStage'.\n\
             4. Enhance lore to describe this mythic transformation.",
            current_json
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": contents }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": design_schema()
            }
        });

        let response = self.generate(TEXT_MODEL, body).await?;
        let mut evolved = Self::parse_design(Self::response_text(&response)?)?;
        ensure_stage_progress(current.evolution_stage, &mut evolved);
        Ok(evolved)
    }

    async fn generate_image(
        &self,
        design: &CharacterDesign,
        _quality: Quality,
        settings: &AppSettings,
        variant: ImageVariant,
    ) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": image_prompt(design, settings, variant) }] }],
            "generationConfig": {
                "imageConfig": { "aspectRatio": variant.aspect_ratio() }
            }
        });

        let response = self.generate(IMAGE_MODEL, body).await?;
        match Self::inline_data(&response) {
            Some(data) => Ok(format!("data:image/png;base64,{}", data)),
            None => Err(ProviderError::NoImage),
        }
    }

    async fn generate_theme_audio(&self, design: &CharacterDesign) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": theme_narration(design) }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": "Kore" }
                    }
                }
            }
        });

        let response = self.generate(TTS_MODEL, body).await?;
        match Self::inline_data(&response) {
            Some(data) => Ok(data.to_string()),
            None => Err(ProviderError::NoAudio),
        }
    }

    async fn update_field(
        &self,
        design: &CharacterDesign,
        field: DesignField,
    ) -> Result<FieldUpdate> {
        let design_json = serde_json::to_string(design)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let contents = format!(
            "Current state: {}.\n\
             Rewrite the \"{}\" with god-tier creativity. Maintain the {} theme and \
             homeworld lore.",
            design_json,
            field.wire_name(),
            design.aesthetic
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": contents }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": field_schema(field)
            }
        });

        let response = self.generate(TEXT_MODEL, body).await?;
        let text = Self::response_text(&response)?;
        let mut parsed: Value = serde_json::from_str(text)
            .map_err(|e| ProviderError::Malformed(format!("field JSON: {}", e)))?;
        let new_value = parsed
            .get_mut("newValue")
            .map(Value::take)
            .ok_or_else(|| ProviderError::Malformed("missing 'newValue'".to_string()))?;
        field_update_from_value(field, new_value)
    }

    async fn lore_chat(&self, design: &CharacterDesign, question: &str) -> Result<String> {
        let design_json = serde_json::to_string(design)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let contents = format!(
            "Identity Context: {}.\n\
             Oracle Inquiry: \"{}\".\n\n\
             Instruction: You are the Akashic Oracle. Provide a response that feels like an \
             organic expansion of this character's mythos.\n\
             CRITICAL: You must explicitly weave together their visual appearance \
             ('visualTraits') and their origin ('homeworld') into your answer.\n\
             Every answer should explain how their physical form or their environment \
             influences the information you are providing.\n\
             Maintain a tone of mythic weight and god-tier immersion.",
            design_json, question
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": contents }] }]
        });

        let response = self.generate(TEXT_MODEL, body).await?;
        Ok(Self::response_text(&response)?.to_string())
    }

    async fn sensei_advice(&self, transcript: &[ChatTurn]) -> Result<String> {
        let contents: Vec<Value> = transcript
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Sensei => "model",
                };
                json!({ "role": role, "parts": [{ "text": turn.text }] })
            })
            .collect();
        let body = json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": SENSEI_SYSTEM }] }
        });

        let response = self.generate(TEXT_MODEL, body).await?;
        Ok(Self::response_text(&response)?.to_string())
    }
}
