use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Manifestation quality tier selected before a summon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "GENIN")]
    Genin,
    #[serde(rename = "CHUNIN")]
    Chunin,
    #[serde(rename = "JONIN")]
    Jonin,
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Genin => write!(f, "GENIN"),
            Quality::Chunin => write!(f, "CHUNIN"),
            Quality::Jonin => write!(f, "JONIN"),
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GENIN" => Ok(Quality::Genin),
            "CHUNIN" => Ok(Quality::Chunin),
            "JONIN" => Ok(Quality::Jonin),
            _ => Err(anyhow!("Unknown quality tier: {}", s)),
        }
    }
}

/// The nine aesthetic tags offered by the sheet's manual picker. Generated
/// designs may carry any free-form aesthetic string; this enum only bounds
/// what the user can select by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aesthetic {
    Cyberpunk,
    Steampunk,
    Gothic,
    HighFantasy,
    DarkFantasy,
    SpaceOpera,
    Solarpunk,
    ArtNouveau,
    Grimdark,
}

impl Aesthetic {
    pub const ALL: [Aesthetic; 9] = [
        Aesthetic::Cyberpunk,
        Aesthetic::Steampunk,
        Aesthetic::Gothic,
        Aesthetic::HighFantasy,
        Aesthetic::DarkFantasy,
        Aesthetic::SpaceOpera,
        Aesthetic::Solarpunk,
        Aesthetic::ArtNouveau,
        Aesthetic::Grimdark,
    ];
}

impl std::fmt::Display for Aesthetic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Aesthetic::Cyberpunk => "Cyberpunk",
            Aesthetic::Steampunk => "Steampunk",
            Aesthetic::Gothic => "Gothic",
            Aesthetic::HighFantasy => "High Fantasy",
            Aesthetic::DarkFantasy => "Dark Fantasy",
            Aesthetic::SpaceOpera => "Space Opera",
            Aesthetic::Solarpunk => "Solarpunk",
            Aesthetic::ArtNouveau => "Art Nouveau",
            Aesthetic::Grimdark => "Grimdark",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Aesthetic {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase().replace([' ', '-', '_'], "");
        Aesthetic::ALL
            .iter()
            .copied()
            .find(|a| a.to_string().to_lowercase().replace(' ', "") == normalized)
            .ok_or_else(|| anyhow!("Unknown aesthetic: {}", s))
    }
}

/// Core attribute block. Every value lives in [1, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub strength: u32,
    pub agility: u32,
    pub intelligence: u32,
    pub stamina: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Strength,
    Agility,
    Intelligence,
    Stamina,
}

impl StatKind {
    pub const ALL: [StatKind; 4] = [
        StatKind::Strength,
        StatKind::Agility,
        StatKind::Intelligence,
        StatKind::Stamina,
    ];
}

impl std::fmt::Display for StatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatKind::Strength => write!(f, "strength"),
            StatKind::Agility => write!(f, "agility"),
            StatKind::Intelligence => write!(f, "intelligence"),
            StatKind::Stamina => write!(f, "stamina"),
        }
    }
}

impl std::str::FromStr for StatKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strength" | "str" => Ok(StatKind::Strength),
            "agility" | "agi" => Ok(StatKind::Agility),
            "intelligence" | "int" => Ok(StatKind::Intelligence),
            "stamina" | "sta" => Ok(StatKind::Stamina),
            _ => Err(anyhow!("Unknown stat: {}", s)),
        }
    }
}

pub fn clamp_stat(value: i64) -> u32 {
    value.clamp(1, 100) as u32
}

impl CharacterStats {
    pub fn get(&self, kind: StatKind) -> u32 {
        match kind {
            StatKind::Strength => self.strength,
            StatKind::Agility => self.agility,
            StatKind::Intelligence => self.intelligence,
            StatKind::Stamina => self.stamina,
        }
    }

    pub fn set(&mut self, kind: StatKind, value: i64) {
        let value = clamp_stat(value);
        match kind {
            StatKind::Strength => self.strength = value,
            StatKind::Agility => self.agility = value,
            StatKind::Intelligence => self.intelligence = value,
            StatKind::Stamina => self.stamina = value,
        }
    }

    pub fn clamp_all(&mut self) {
        self.strength = clamp_stat(self.strength as i64);
        self.agility = clamp_stat(self.agility as i64);
        self.intelligence = clamp_stat(self.intelligence as i64);
        self.stamina = clamp_stat(self.stamina as i64);
    }
}

/// Structured character artifact returned by the generation service.
///
/// Field names serialize in camelCase so persisted records keep the same
/// shape as the data the service is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDesign {
    pub name: String,
    pub title: String,
    pub personality: String,
    pub aesthetic: String,
    pub powers: Vec<String>,
    pub lore: String,
    pub visual_traits: String,
    pub stats: CharacterStats,
    pub homeworld: String,
    pub evolution_stage: u32,
}

impl CharacterDesign {
    /// Validates that every field a complete design requires is present and
    /// non-empty, clamping stats and the evolution stage into range.
    pub fn ensure_complete(&mut self) -> Result<()> {
        let text_fields = [
            ("name", &self.name),
            ("title", &self.title),
            ("personality", &self.personality),
            ("aesthetic", &self.aesthetic),
            ("lore", &self.lore),
            ("visualTraits", &self.visual_traits),
            ("homeworld", &self.homeworld),
        ];
        for (label, value) in text_fields {
            if value.trim().is_empty() {
                return Err(anyhow!("design is missing '{}'", label));
            }
        }
        self.powers.retain(|p| !p.trim().is_empty());
        if self.powers.is_empty() {
            return Err(anyhow!("design has no powers"));
        }
        self.stats.clamp_all();
        self.evolution_stage = self.evolution_stage.max(1);
        Ok(())
    }

    /// Short display tag shown on the sheet footer, e.g. `KAI-1738200`.
    pub fn id_tag(&self, timestamp: i64) -> String {
        let prefix: String = self.name.chars().take(3).collect::<String>().to_uppercase();
        format!("{}-{}", prefix, timestamp / 1_000_000)
    }
}

/// A design field addressable by reroll requests. Closed set: unknown field
/// names are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignField {
    Name,
    Title,
    Personality,
    Aesthetic,
    Powers,
    Lore,
    VisualTraits,
    Homeworld,
    Stats,
}

impl DesignField {
    /// The field name as it appears in the design's serialized form; used to
    /// address the field in provider prompts.
    pub fn wire_name(&self) -> &'static str {
        match self {
            DesignField::Name => "name",
            DesignField::Title => "title",
            DesignField::Personality => "personality",
            DesignField::Aesthetic => "aesthetic",
            DesignField::Powers => "powers",
            DesignField::Lore => "lore",
            DesignField::VisualTraits => "visualTraits",
            DesignField::Homeworld => "homeworld",
            DesignField::Stats => "stats",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DesignField::Name => "Name",
            DesignField::Title => "Title",
            DesignField::Personality => "Personality",
            DesignField::Aesthetic => "Aesthetic",
            DesignField::Powers => "Powers",
            DesignField::Lore => "Lore",
            DesignField::VisualTraits => "Visual traits",
            DesignField::Homeworld => "Homeworld",
            DesignField::Stats => "Stats",
        }
    }
}

impl std::str::FromStr for DesignField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "name" => Ok(DesignField::Name),
            "title" => Ok(DesignField::Title),
            "personality" => Ok(DesignField::Personality),
            "aesthetic" => Ok(DesignField::Aesthetic),
            "powers" => Ok(DesignField::Powers),
            "lore" => Ok(DesignField::Lore),
            "visualtraits" | "visuals" | "traits" => Ok(DesignField::VisualTraits),
            "homeworld" => Ok(DesignField::Homeworld),
            "stats" => Ok(DesignField::Stats),
            _ => Err(anyhow!("Unknown design field: {}", s)),
        }
    }
}

/// A typed replacement value for exactly one design field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Name(String),
    Title(String),
    Personality(String),
    Aesthetic(String),
    Powers(Vec<String>),
    Lore(String),
    VisualTraits(String),
    Homeworld(String),
    Stats(CharacterStats),
}

impl FieldUpdate {
    pub fn field(&self) -> DesignField {
        match self {
            FieldUpdate::Name(_) => DesignField::Name,
            FieldUpdate::Title(_) => DesignField::Title,
            FieldUpdate::Personality(_) => DesignField::Personality,
            FieldUpdate::Aesthetic(_) => DesignField::Aesthetic,
            FieldUpdate::Powers(_) => DesignField::Powers,
            FieldUpdate::Lore(_) => DesignField::Lore,
            FieldUpdate::VisualTraits(_) => DesignField::VisualTraits,
            FieldUpdate::Homeworld(_) => DesignField::Homeworld,
            FieldUpdate::Stats(_) => DesignField::Stats,
        }
    }

    pub fn apply(self, design: &mut CharacterDesign) {
        match self {
            FieldUpdate::Name(v) => design.name = v,
            FieldUpdate::Title(v) => design.title = v,
            FieldUpdate::Personality(v) => design.personality = v,
            FieldUpdate::Aesthetic(v) => design.aesthetic = v,
            FieldUpdate::Powers(v) => design.powers = v,
            FieldUpdate::Lore(v) => design.lore = v,
            FieldUpdate::VisualTraits(v) => design.visual_traits = v,
            FieldUpdate::Homeworld(v) => design.homeworld = v,
            FieldUpdate::Stats(mut v) => {
                v.clamp_all();
                design.stats = v;
            }
        }
    }
}

/// One realized manifestation: design plus rendered artifacts and the
/// parameters it was produced under. `timestamp` is the identity key inside
/// History and the Archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResult {
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    pub design: CharacterDesign,
    pub timestamp: i64,
    pub quality: Quality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub art_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "512")]
    R512,
    #[serde(rename = "1024")]
    R1024,
    #[serde(rename = "2048")]
    R2048,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::R512 => write!(f, "512"),
            Resolution::R1024 => write!(f, "1024"),
            Resolution::R2048 => write!(f, "2048"),
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_end_matches("px") {
            "512" => Ok(Resolution::R512),
            "1024" => Ok(Resolution::R1024),
            "2048" => Ok(Resolution::R2048),
            _ => Err(anyhow!("Unknown resolution: {}", s)),
        }
    }
}

macro_rules! style_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($name::$variant => write!(f, $text),)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self> {
                let normalized = s.to_lowercase().replace([' ', '-', '_'], "");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.to_string().to_lowercase().replace([' ', '-'], "") == normalized)
                    .ok_or_else(|| anyhow!(concat!("Unknown ", stringify!($name), ": {}"), s))
            }
        }
    };
}

style_enum!(ArtStyle {
    ClassicAnime => "Classic Anime",
    UfotableStyle => "Ufotable Style",
    StudioGhibli => "Studio Ghibli",
    CyberpunkEdge => "Cyberpunk Edge",
    Retro90s => "Retro 90s",
    InkWash => "Ink Wash",
    Realistic => "Realistic",
    DigitalConcept => "Digital Concept",
    FantasyOil => "Fantasy Oil",
    HighImpactShonen => "High-Impact Shonen",
    VintageManga => "Vintage Manga",
});

style_enum!(Lighting {
    Cinematic => "Cinematic",
    Ethereal => "Ethereal",
    Dramatic => "Dramatic",
    Neon => "Neon",
    GoldenHour => "Golden Hour",
    CyberNoir => "Cyber-Noir",
});

style_enum!(Composition {
    DynamicPose => "Dynamic Pose",
    Portrait => "Portrait",
    WideShot => "Wide Shot",
    EpicLowAngle => "Epic Low Angle",
    CloseUpDetail => "Close-up Detail",
});

/// Process-wide engine parameters, persisted on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub auto_save: bool,
    pub resolution: Resolution,
    pub art_style: ArtStyle,
    pub lighting: Lighting,
    pub composition: Composition,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            auto_save: true,
            resolution: Resolution::R1024,
            art_style: ArtStyle::ClassicAnime,
            lighting: Lighting::Cinematic,
            composition: Composition::DynamicPose,
        }
    }
}

/// Partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsPatch {
    pub auto_save: Option<bool>,
    pub resolution: Option<Resolution>,
    pub art_style: Option<ArtStyle>,
    pub lighting: Option<Lighting>,
    pub composition: Option<Composition>,
}

impl AppSettings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.auto_save {
            self.auto_save = v;
        }
        if let Some(v) = patch.resolution {
            self.resolution = v;
        }
        if let Some(v) = patch.art_style {
            self.art_style = v;
        }
        if let Some(v) = patch.lighting {
            self.lighting = v;
        }
        if let Some(v) = patch.composition {
            self.composition = v;
        }
    }
}

/// The authenticated user, or rather the record of one; there is no real
/// verification behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Sensei,
}

/// One turn of the sensei advice transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        ChatTurn {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn sensei(text: impl Into<String>) -> Self {
        ChatTurn {
            role: ChatRole::Sensei,
            text: text.into(),
        }
    }
}

pub const SENSEI_WELCOME: &str =
    "Welcome to AARUTO_ANIME.AI. Manifest your vision with god-tier precision.";

/// One lore Q&A exchange. The question is kept apart from the answer so
/// search can match either side.
#[derive(Debug, Clone, PartialEq)]
pub struct LoreEntry {
    pub question: String,
    pub answer: String,
}

/// Per-design lore transcript. In-memory only; cleared whenever the sheet
/// switches to a different result.
#[derive(Debug, Clone, Default)]
pub struct LoreLog {
    entries: Vec<LoreEntry>,
}

impl LoreLog {
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push(LoreEntry {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn entries(&self) -> &[LoreEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Case-insensitive substring search over questions and answers.
    pub fn search(&self, term: &str) -> Vec<&LoreEntry> {
        let term = term.to_lowercase();
        if term.trim().is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|e| {
                e.question.to_lowercase().contains(&term) || e.answer.to_lowercase().contains(&term)
            })
            .collect()
    }
}

/// Encodes a design as a portable share token.
pub fn export_share_code(design: &CharacterDesign) -> Result<String> {
    let json = serde_json::to_string(design)?;
    Ok(BASE64.encode(json.as_bytes()))
}

/// Decodes a share token back into a design, validating completeness.
pub fn import_share_code(code: &str) -> Result<CharacterDesign> {
    let bytes = BASE64
        .decode(code.trim())
        .map_err(|e| anyhow!("invalid share code: {}", e))?;
    let mut design: CharacterDesign = serde_json::from_slice(&bytes)?;
    design.ensure_complete()?;
    Ok(design)
}

#[cfg(test)]
pub fn sample_design() -> CharacterDesign {
    CharacterDesign {
        name: "Raiden Kusanagi".to_string(),
        title: "Storm Sovereign".to_string(),
        personality: "Calm until the sky is not".to_string(),
        aesthetic: "Cyberpunk".to_string(),
        powers: vec!["Lightning Step".to_string(), "Ion Veil".to_string()],
        lore: "Forged in the static between two dying worlds.".to_string(),
        visual_traits: "Eyes like arc-light, a coat of woven stormcloud".to_string(),
        stats: CharacterStats {
            strength: 62,
            agility: 91,
            intelligence: 77,
            stamina: 58,
        },
        homeworld: "A ring-city suspended inside a permanent thunderhead".to_string(),
        evolution_stage: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_clamping() {
        let mut stats = sample_design().stats;
        stats.set(StatKind::Strength, 150);
        assert_eq!(stats.strength, 100);
        stats.set(StatKind::Agility, -5);
        assert_eq!(stats.agility, 1);
        stats.set(StatKind::Stamina, 55);
        assert_eq!(stats.stamina, 55);
    }

    #[test]
    fn test_ensure_complete_rejects_empty_fields() {
        let mut design = sample_design();
        design.lore = "  ".to_string();
        assert!(design.ensure_complete().is_err());

        let mut design = sample_design();
        design.powers = vec!["".to_string()];
        assert!(design.ensure_complete().is_err());
    }

    #[test]
    fn test_ensure_complete_clamps() {
        let mut design = sample_design();
        design.stats.strength = 400;
        design.evolution_stage = 0;
        design.ensure_complete().unwrap();
        assert_eq!(design.stats.strength, 100);
        assert_eq!(design.evolution_stage, 1);
    }

    #[test]
    fn test_field_update_applies_one_field() {
        let mut design = sample_design();
        let before = design.clone();
        FieldUpdate::Homeworld("A glass desert under three moons".to_string()).apply(&mut design);
        assert_ne!(design.homeworld, before.homeworld);
        assert_eq!(design.name, before.name);
        assert_eq!(design.powers, before.powers);
    }

    #[test]
    fn test_field_update_clamps_stats() {
        let mut design = sample_design();
        FieldUpdate::Stats(CharacterStats {
            strength: 999,
            agility: 1,
            intelligence: 50,
            stamina: 100,
        })
        .apply(&mut design);
        assert_eq!(design.stats.strength, 100);
    }

    #[test]
    fn test_design_field_round_trips_names() {
        for field in [
            DesignField::Name,
            DesignField::Powers,
            DesignField::VisualTraits,
            DesignField::Stats,
        ] {
            let parsed: DesignField = field.wire_name().to_lowercase().parse().unwrap();
            assert_eq!(parsed, field);
        }
        assert!("chakra".parse::<DesignField>().is_err());
    }

    #[test]
    fn test_settings_patch() {
        let mut settings = AppSettings::default();
        settings.apply(SettingsPatch {
            auto_save: Some(false),
            lighting: Some(Lighting::Neon),
            ..Default::default()
        });
        assert!(!settings.auto_save);
        assert_eq!(settings.lighting, Lighting::Neon);
        assert_eq!(settings.art_style, ArtStyle::ClassicAnime);
    }

    #[test]
    fn test_settings_serialized_shape() {
        let json = serde_json::to_value(AppSettings::default()).unwrap();
        assert_eq!(json["autoSave"], true);
        assert_eq!(json["resolution"], "1024");
        assert_eq!(json["artStyle"], "Classic Anime");
        assert_eq!(json["composition"], "Dynamic Pose");
    }

    #[test]
    fn test_style_enum_parsing() {
        assert_eq!("golden hour".parse::<Lighting>().unwrap(), Lighting::GoldenHour);
        assert_eq!("cyber-noir".parse::<Lighting>().unwrap(), Lighting::CyberNoir);
        assert_eq!(
            "high-impact shonen".parse::<ArtStyle>().unwrap(),
            ArtStyle::HighImpactShonen
        );
        assert!("watercolor".parse::<ArtStyle>().is_err());
    }

    #[test]
    fn test_lore_log_search() {
        let mut log = LoreLog::default();
        log.push("What do they fear?", "Only the silence between storms.");
        log.push("Where were they born?", "In the ring-city's lowest tier.");

        assert_eq!(log.search("storms").len(), 1);
        assert_eq!(log.search("RING-CITY").len(), 1);
        assert_eq!(log.search("fear").len(), 1);
        assert_eq!(log.search("").len(), 2);
        assert!(log.search("dragons").is_empty());
    }

    #[test]
    fn test_share_code_round_trip() {
        let design = sample_design();
        let code = export_share_code(&design).unwrap();
        let restored = import_share_code(&code).unwrap();
        assert_eq!(restored, design);
        assert!(import_share_code("not base64!!!").is_err());
    }

    #[test]
    fn test_id_tag() {
        let design = sample_design();
        assert_eq!(design.id_tag(1_738_000_000_123), "RAI-1738000");
    }
}
