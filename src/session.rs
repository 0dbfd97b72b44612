use std::time::{Duration, Instant};

use chrono::Utc;

use crate::auth::{self, AuthError};
use crate::model::{
    AppSettings, ChatTurn, DesignField, FieldUpdate, GeneratedResult, Identity, LoreLog, Quality,
    SettingsPatch, StatKind, SENSEI_WELCOME,
};
use crate::provider::{self, GenerationBackend, ImageVariant};
use crate::store::{keys, Store};

const HISTORY_CAP: usize = 30;
const ARCHIVE_CAP: usize = 50;

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(60);

/// The one active state of the console. Generation-class phases are entered
/// only from `Idle` and always fall back to `Idle`, success or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unauthenticated,
    Idle,
    GeneratingDesign,
    GeneratingImage,
    GeneratingEnvironment,
    GeneratingAudio,
    Evolving,
    UpdatingField,
    AssistantThinking,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Unauthenticated => "Sealed",
            Phase::Idle => "Idle",
            Phase::GeneratingDesign => "Reading Fate...",
            Phase::GeneratingImage => "Realizing Form...",
            Phase::GeneratingEnvironment => "Constructing World...",
            Phase::GeneratingAudio => "Tuning Resonance...",
            Phase::Evolving => "Transmuting...",
            Phase::UpdatingField => "Re-manifesting...",
            Phase::AssistantThinking => "Consulting the Archive...",
        }
    }
}

/// What happened to a requested operation at the dispatch gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The operation ran to completion (possibly unsuccessfully; the notice
    /// carries the outcome).
    Done,
    /// Another generation-class operation was in flight; dropped, not queued.
    Busy,
    /// Preconditions failed; nothing was dispatched.
    Rejected(String),
}

enum Rewrite {
    Applied(DesignField),
    Failed(DesignField),
    Busy,
    NoDraft,
}

/// Central controller: owns identity, draft, collections, settings and the
/// generation phase, and mediates every transition between them.
pub struct Session<B> {
    backend: B,
    store: Store,
    identity: Option<Identity>,
    phase: Phase,
    quality: Quality,
    draft: Option<GeneratedResult>,
    history: Vec<GeneratedResult>,
    archive: Vec<GeneratedResult>,
    settings: AppSettings,
    sensei_log: Vec<ChatTurn>,
    lore_log: LoreLog,
    lore_busy: bool,
    notice: Option<String>,
    last_timestamp: i64,
    last_autosave: Instant,
    autosave_interval: Duration,
}

impl<B: GenerationBackend> Session<B> {
    pub fn new(backend: B, store: Store) -> Self {
        let identity: Option<Identity> = store.get(keys::IDENTITY);
        let history: Vec<GeneratedResult> = store.get(keys::HISTORY).unwrap_or_default();
        let archive: Vec<GeneratedResult> = store.get(keys::ARCHIVE).unwrap_or_default();
        let settings: AppSettings = store.get(keys::SETTINGS).unwrap_or_default();
        let draft: Option<GeneratedResult> = store.get(keys::DRAFT);

        let last_timestamp = history
            .iter()
            .chain(archive.iter())
            .chain(draft.iter())
            .map(|r| r.timestamp)
            .max()
            .unwrap_or(0);
        let phase = if identity.is_some() {
            Phase::Idle
        } else {
            Phase::Unauthenticated
        };

        Session {
            backend,
            store,
            identity,
            phase,
            quality: Quality::Genin,
            draft,
            history,
            archive,
            settings,
            sensei_log: vec![ChatTurn::sensei(SENSEI_WELCOME)],
            lore_log: LoreLog::default(),
            lore_busy: false,
            notice: None,
            last_timestamp,
            last_autosave: Instant::now(),
            autosave_interval: AUTOSAVE_INTERVAL,
        }
    }

    // ---- read surface ----

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn draft(&self) -> Option<&GeneratedResult> {
        self.draft.as_ref()
    }

    pub fn history(&self) -> &[GeneratedResult] {
        &self.history
    }

    pub fn archive(&self) -> &[GeneratedResult] {
        &self.archive
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn sensei_log(&self) -> &[ChatTurn] {
        &self.sensei_log
    }

    pub fn lore_log(&self) -> &LoreLog {
        &self.lore_log
    }

    /// Drains the pending transient notification, if any.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    // ---- authentication ----

    pub fn login(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        let identity = auth::login(&self.store, email, password)?;
        self.store.set(keys::IDENTITY, &identity);
        self.identity = Some(identity);
        self.phase = Phase::Idle;
        Ok(())
    }

    pub fn signup(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        let identity = auth::signup(&self.store, email, password)?;
        self.store.set(keys::IDENTITY, &identity);
        self.identity = Some(identity);
        self.phase = Phase::Idle;
        Ok(())
    }

    pub fn logout(&mut self) {
        self.store.remove(keys::IDENTITY);
        self.identity = None;
        self.phase = Phase::Unauthenticated;
    }

    // ---- generation flows ----

    /// The summon flow: design, then portrait, then a fresh History entry
    /// that becomes the current draft.
    pub async fn summon(&mut self, prompt: &str) -> Dispatch {
        if self.identity.is_none() {
            return Dispatch::Rejected("Unseal entry first.".to_string());
        }
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Dispatch::Rejected("The void needs a whisper first.".to_string());
        }
        if self.phase != Phase::Idle {
            return Dispatch::Busy;
        }

        self.phase = Phase::GeneratingDesign;
        let outcome = self.run_summon(&prompt).await;
        self.phase = Phase::Idle;

        match outcome {
            Ok(()) => self.notify("Manifestation successful."),
            Err(e) => {
                log::warn!("summon failed: {}", e);
                self.notify("Manifestation failed.");
            }
        }
        Dispatch::Done
    }

    async fn run_summon(&mut self, prompt: &str) -> provider::Result<()> {
        let design = self.backend.generate_design(prompt).await?;
        self.phase = Phase::GeneratingImage;
        let image_url = self
            .backend
            .generate_image(&design, self.quality, &self.settings, ImageVariant::Character)
            .await?;

        let result = GeneratedResult {
            image_url,
            env_image_url: None,
            audio_data: None,
            design,
            timestamp: self.next_timestamp(),
            quality: self.quality,
            resolution: Some(self.settings.resolution.to_string()),
            art_style: Some(self.settings.art_style.to_string()),
            lighting: Some(self.settings.lighting.to_string()),
            composition: Some(self.settings.composition.to_string()),
        };
        self.lore_log.clear();
        self.draft = Some(result.clone());
        self.push_history(result);
        Ok(())
    }

    /// Ascension: rewrite the draft's design at a higher stage, render a new
    /// portrait, re-timestamp and re-insert into History.
    pub async fn evolve(&mut self) -> Dispatch {
        let Some(draft) = self.draft.clone() else {
            return Dispatch::Rejected("No manifestation to evolve.".to_string());
        };
        if self.phase != Phase::Idle {
            return Dispatch::Busy;
        }

        self.phase = Phase::Evolving;
        let outcome = self.run_evolve(draft).await;
        self.phase = Phase::Idle;

        match outcome {
            Ok(()) => self.notify("Ascension complete."),
            Err(e) => {
                log::warn!("evolve failed: {}", e);
                self.notify("Evolution failed.");
            }
        }
        Dispatch::Done
    }

    async fn run_evolve(&mut self, mut draft: GeneratedResult) -> provider::Result<()> {
        let evolved = self.backend.evolve_design(&draft.design).await?;
        self.phase = Phase::GeneratingImage;
        let image_url = self
            .backend
            .generate_image(&evolved, self.quality, &self.settings, ImageVariant::Character)
            .await?;

        draft.design = evolved;
        draft.image_url = image_url;
        draft.timestamp = self.next_timestamp();
        self.draft = Some(draft.clone());
        self.push_history(draft);
        Ok(())
    }

    /// Renders the draft's homeworld as a wide environment shot and attaches
    /// it, updating the matching History entry in place.
    pub async fn generate_environment(&mut self) -> Dispatch {
        let Some(draft) = self.draft.clone() else {
            return Dispatch::Rejected("No manifestation to expand.".to_string());
        };
        if self.phase != Phase::Idle {
            return Dispatch::Busy;
        }

        self.phase = Phase::GeneratingEnvironment;
        let outcome = self.run_environment(draft).await;
        self.phase = Phase::Idle;

        match outcome {
            Ok(()) => self.notify("World manifested."),
            Err(e) => {
                log::warn!("environment generation failed: {}", e);
                self.notify("World manifestation failed.");
            }
        }
        Dispatch::Done
    }

    async fn run_environment(&mut self, mut draft: GeneratedResult) -> provider::Result<()> {
        let env_image_url = self
            .backend
            .generate_image(
                &draft.design,
                self.quality,
                &self.settings,
                ImageVariant::Environment,
            )
            .await?;
        draft.env_image_url = Some(env_image_url);
        self.draft = Some(draft.clone());
        self.sync_history_entry(&draft);
        Ok(())
    }

    /// Generates and decodes the theme jingle. Ephemeral: neither History
    /// nor the store is touched.
    pub async fn play_theme(&mut self) -> Dispatch {
        let Some(draft) = self.draft.clone() else {
            return Dispatch::Rejected("No manifestation to voice.".to_string());
        };
        if self.phase != Phase::Idle {
            return Dispatch::Busy;
        }

        self.phase = Phase::GeneratingAudio;
        let outcome = self.run_theme(&draft).await;
        self.phase = Phase::Idle;

        match outcome {
            Ok(duration) => self.notify(format!("Theme resonating ({:.1}s).", duration)),
            Err(e) => {
                log::warn!("theme generation failed: {}", e);
                self.notify("Audio resonance failed.");
            }
        }
        Dispatch::Done
    }

    async fn run_theme(&mut self, draft: &GeneratedResult) -> provider::Result<f32> {
        let payload = self.backend.generate_theme_audio(&draft.design).await?;
        let samples = crate::audio::decode_pcm16(&payload).map_err(|e| {
            log::warn!("audio decode failed: {}", e);
            provider::ProviderError::NoAudio
        })?;
        Ok(crate::audio::duration_secs(&samples))
    }

    // ---- field rework ----

    /// Rerolls one design field on the draft. Shares the top-level guard
    /// with the generation flows; History entries keep their old design.
    pub async fn reroll_field(&mut self, field: DesignField) -> Dispatch {
        match self.rewrite_field(field).await {
            Rewrite::Applied(field) => {
                self.notify(format!("{} re-manifested.", field.label()));
                Dispatch::Done
            }
            Rewrite::Failed(field) => {
                self.notify(format!("{} re-manifestation failed.", field.label()));
                Dispatch::Done
            }
            Rewrite::Busy => Dispatch::Busy,
            Rewrite::NoDraft => Dispatch::Rejected("No manifestation to rework.".to_string()),
        }
    }

    /// Aspect-labeled shortcut over a visual-traits reroll (Eyes, Fabric,
    /// Armor, Scars, Aura).
    pub async fn refine_visuals(&mut self, aspect: &str) -> Dispatch {
        match self.rewrite_field(DesignField::VisualTraits).await {
            Rewrite::Applied(_) => {
                self.notify(format!("{} optimized.", aspect));
                Dispatch::Done
            }
            Rewrite::Failed(_) => {
                self.notify(format!("{} refinement failed.", aspect));
                Dispatch::Done
            }
            Rewrite::Busy => Dispatch::Busy,
            Rewrite::NoDraft => Dispatch::Rejected("No manifestation to refine.".to_string()),
        }
    }

    async fn rewrite_field(&mut self, field: DesignField) -> Rewrite {
        let Some(mut draft) = self.draft.clone() else {
            return Rewrite::NoDraft;
        };
        if self.phase != Phase::Idle {
            return Rewrite::Busy;
        }

        self.phase = Phase::UpdatingField;
        let outcome = self.backend.update_field(&draft.design, field).await;
        self.phase = Phase::Idle;

        match outcome {
            Ok(update) => {
                update.apply(&mut draft.design);
                if let Err(e) = draft.design.ensure_complete() {
                    log::warn!("rerolled design incomplete: {}", e);
                    return Rewrite::Failed(field);
                }
                self.draft = Some(draft);
                Rewrite::Applied(field)
            }
            Err(e) => {
                log::warn!("field reroll failed: {}", e);
                Rewrite::Failed(field)
            }
        }
    }

    // ---- manual edits (no provider involvement) ----

    pub fn edit_field(&mut self, update: FieldUpdate) -> Dispatch {
        let Some(draft) = self.draft.as_mut() else {
            return Dispatch::Rejected("No manifestation to edit.".to_string());
        };
        update.apply(&mut draft.design);
        Dispatch::Done
    }

    pub fn set_stat(&mut self, stat: StatKind, value: i64) -> Dispatch {
        let Some(draft) = self.draft.as_mut() else {
            return Dispatch::Rejected("No manifestation to edit.".to_string());
        };
        draft.design.stats.set(stat, value);
        Dispatch::Done
    }

    /// Exchanges the portrait and environment images on the draft.
    pub fn swap_environment_view(&mut self) -> Dispatch {
        let Some(draft) = self.draft.as_mut() else {
            return Dispatch::Rejected("No manifestation in view.".to_string());
        };
        let Some(env) = draft.env_image_url.take() else {
            return Dispatch::Rejected("No world image to swap.".to_string());
        };
        let portrait = std::mem::replace(&mut draft.image_url, env);
        draft.env_image_url = Some(portrait);
        Dispatch::Done
    }

    // ---- chat flows ----

    /// Sensei advice. Runs under the top-level guard; the exchange is
    /// recorded even when the provider fails.
    pub async fn sensei_message(&mut self, text: &str) -> Dispatch {
        if self.identity.is_none() {
            return Dispatch::Rejected("Unseal entry first.".to_string());
        }
        let text = text.trim().to_string();
        if text.is_empty() {
            return Dispatch::Rejected("Silence carries no question.".to_string());
        }
        if self.phase != Phase::Idle {
            return Dispatch::Busy;
        }

        self.phase = Phase::AssistantThinking;
        self.sensei_log.push(ChatTurn::user(text));
        let reply = match self.backend.sensei_advice(&self.sensei_log).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("sensei advice failed: {}", e);
                "Spirit signal destabilized. Try again.".to_string()
            }
        };
        self.sensei_log.push(ChatTurn::sensei(reply));
        self.phase = Phase::Idle;
        Dispatch::Done
    }

    /// Lore Q&A for the current draft. Carries its own single-flight flag
    /// and may run alongside the top-level flow.
    pub async fn lore_question(&mut self, question: &str) -> Dispatch {
        let Some(draft) = self.draft.clone() else {
            return Dispatch::Rejected("No manifestation to consult about.".to_string());
        };
        let question = question.trim().to_string();
        if question.is_empty() {
            return Dispatch::Rejected("The Oracle needs a question.".to_string());
        }
        if self.lore_busy {
            return Dispatch::Busy;
        }

        self.lore_busy = true;
        let outcome = self.backend.lore_chat(&draft.design, &question).await;
        self.lore_busy = false;

        match outcome {
            Ok(answer) => self.lore_log.push(question, answer),
            Err(e) => log::warn!("lore expansion failed: {}", e),
        }
        Dispatch::Done
    }

    // ---- collections ----

    /// Makes the History or Archive entry with this timestamp the current
    /// draft. Switching sheets resets the lore transcript.
    pub fn select_result(&mut self, timestamp: i64) -> bool {
        let found = self
            .history
            .iter()
            .find(|r| r.timestamp == timestamp)
            .or_else(|| self.archive.iter().find(|r| r.timestamp == timestamp))
            .cloned();
        match found {
            Some(result) => {
                if self.draft.as_ref().map(|d| d.timestamp) != Some(result.timestamp) {
                    self.lore_log.clear();
                }
                self.draft = Some(result);
                true
            }
            None => false,
        }
    }

    pub fn save_to_archive(&mut self) -> Dispatch {
        let Some(draft) = self.draft.clone() else {
            return Dispatch::Rejected("Nothing to archive.".to_string());
        };
        // Re-saving the same manifestation refreshes it instead of creating
        // a twin timestamp.
        self.archive.retain(|r| r.timestamp != draft.timestamp);
        self.archive.insert(0, draft);
        self.archive.truncate(ARCHIVE_CAP);
        self.store.set(keys::ARCHIVE, &self.archive);
        self.notify("Archived.");
        Dispatch::Done
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.store.remove(keys::HISTORY);
        self.notify("History purged.");
    }

    fn push_history(&mut self, result: GeneratedResult) {
        self.history.insert(0, result);
        self.history.truncate(HISTORY_CAP);
        self.store.set(keys::HISTORY, &self.history);
    }

    fn sync_history_entry(&mut self, result: &GeneratedResult) {
        if let Some(entry) = self
            .history
            .iter_mut()
            .find(|r| r.timestamp == result.timestamp)
        {
            *entry = result.clone();
        } else {
            self.history.insert(0, result.clone());
            self.history.truncate(HISTORY_CAP);
        }
        self.store.set(keys::HISTORY, &self.history);
    }

    // ---- settings / misc ----

    pub fn update_settings(&mut self, patch: SettingsPatch) {
        self.settings.apply(patch);
        self.store.set(keys::SETTINGS, &self.settings);
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    /// Cooperative auto-save: persists the draft at most once per interval,
    /// only while auto-save is on and a draft exists.
    pub fn autosave_tick(&mut self) {
        if !self.settings.auto_save {
            return;
        }
        let Some(draft) = &self.draft else {
            return;
        };
        if self.last_autosave.elapsed() < self.autosave_interval {
            return;
        }
        self.store.set(keys::DRAFT, draft);
        self.last_autosave = Instant::now();
    }

    /// Millisecond clock read, bumped past the last issued value so no two
    /// results in a session can collide.
    fn next_timestamp(&mut self) -> i64 {
        let mut ts = Utc::now().timestamp_millis();
        if ts <= self.last_timestamp {
            ts = self.last_timestamp + 1;
        }
        self.last_timestamp = ts;
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{sample_design, CharacterDesign, CharacterStats};
    use crate::provider::{ProviderError, Result as ProviderResult};
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        design: AtomicUsize,
        evolve: AtomicUsize,
        image: AtomicUsize,
        audio: AtomicUsize,
        field: AtomicUsize,
        lore: AtomicUsize,
        advice: AtomicUsize,
    }

    #[derive(Default)]
    struct StubBackend {
        counters: Arc<Counters>,
        fail_design: bool,
        fail_image: bool,
        fail_audio: bool,
        fail_field: bool,
        fail_lore: bool,
        fail_advice: bool,
    }

    fn pcm_payload() -> String {
        let mut bytes = Vec::new();
        for s in [0i16, 1000, -1000, 32000] {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        BASE64.encode(bytes)
    }

    #[async_trait]
    impl GenerationBackend for StubBackend {
        async fn generate_design(&self, prompt: &str) -> ProviderResult<CharacterDesign> {
            self.counters.design.fetch_add(1, Ordering::SeqCst);
            if self.fail_design {
                return Err(ProviderError::Api("boom".to_string()));
            }
            let mut design = sample_design();
            design.lore = format!("Summoned from: {}", prompt);
            Ok(design)
        }

        async fn evolve_design(&self, current: &CharacterDesign) -> ProviderResult<CharacterDesign> {
            self.counters.evolve.fetch_add(1, Ordering::SeqCst);
            let mut evolved = current.clone();
            evolved.evolution_stage = current.evolution_stage + 1;
            evolved.stats.strength = (evolved.stats.strength + 10).min(100);
            Ok(evolved)
        }

        async fn generate_image(
            &self,
            _design: &CharacterDesign,
            _quality: Quality,
            _settings: &AppSettings,
            variant: ImageVariant,
        ) -> ProviderResult<String> {
            self.counters.image.fetch_add(1, Ordering::SeqCst);
            if self.fail_image {
                return Err(ProviderError::NoImage);
            }
            Ok(match variant {
                ImageVariant::Character => "data:image/png;base64,cGljdHVyZQ==".to_string(),
                ImageVariant::Environment => "data:image/png;base64,d29ybGQ=".to_string(),
            })
        }

        async fn generate_theme_audio(&self, _design: &CharacterDesign) -> ProviderResult<String> {
            self.counters.audio.fetch_add(1, Ordering::SeqCst);
            if self.fail_audio {
                return Err(ProviderError::NoAudio);
            }
            Ok(pcm_payload())
        }

        async fn update_field(
            &self,
            _design: &CharacterDesign,
            field: DesignField,
        ) -> ProviderResult<FieldUpdate> {
            self.counters.field.fetch_add(1, Ordering::SeqCst);
            if self.fail_field {
                return Err(ProviderError::Api("boom".to_string()));
            }
            Ok(match field {
                DesignField::Powers => {
                    FieldUpdate::Powers(vec!["Static Requiem".to_string()])
                }
                DesignField::Stats => FieldUpdate::Stats(CharacterStats {
                    strength: 80,
                    agility: 80,
                    intelligence: 80,
                    stamina: 80,
                }),
                DesignField::Lore => FieldUpdate::Lore("A rewritten chronicle.".to_string()),
                DesignField::VisualTraits => {
                    FieldUpdate::VisualTraits("Re-imagined silhouette".to_string())
                }
                other => FieldUpdate::Name(format!("rewrite of {}", other.wire_name())),
            })
        }

        async fn lore_chat(
            &self,
            design: &CharacterDesign,
            question: &str,
        ) -> ProviderResult<String> {
            self.counters.lore.fetch_add(1, Ordering::SeqCst);
            if self.fail_lore {
                return Err(ProviderError::Api("boom".to_string()));
            }
            Ok(format!(
                "Because of {} and {}, the answer to '{}' is yes.",
                design.visual_traits, design.homeworld, question
            ))
        }

        async fn sensei_advice(&self, transcript: &[ChatTurn]) -> ProviderResult<String> {
            self.counters.advice.fetch_add(1, Ordering::SeqCst);
            if self.fail_advice {
                return Err(ProviderError::Api("boom".to_string()));
            }
            Ok(format!("Wisdom after {} turns.", transcript.len()))
        }
    }

    fn new_session(backend: StubBackend) -> (tempfile::TempDir, Session<StubBackend>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut session = Session::new(backend, store);
        session.signup("kai@example.com", "hunter2").unwrap();
        (dir, session)
    }

    fn counted_session() -> (tempfile::TempDir, Session<StubBackend>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let backend = StubBackend {
            counters: counters.clone(),
            ..Default::default()
        };
        let (dir, session) = new_session(backend);
        (dir, session, counters)
    }

    #[tokio::test]
    async fn test_summon_prepends_history_and_sets_draft() {
        let (_dir, mut session, _) = counted_session();

        assert_eq!(session.summon("a lightning-fast rogue").await, Dispatch::Done);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.phase(), Phase::Idle);

        let draft = session.draft().unwrap();
        assert_eq!(draft.quality, Quality::Genin);
        assert!(!draft.image_url.is_empty());
        assert!(draft.design.powers.iter().all(|p| !p.is_empty()));
        for stat in StatKind::ALL {
            let v = draft.design.stats.get(stat);
            assert!((1..=100).contains(&v));
        }
        assert_eq!(draft.timestamp, session.history()[0].timestamp);
        assert_eq!(session.take_notice().unwrap(), "Manifestation successful.");
    }

    #[tokio::test]
    async fn test_summon_respects_selected_quality() {
        let (_dir, mut session, _) = counted_session();
        session.set_quality(Quality::Chunin);
        session.summon("a chunin").await;
        assert_eq!(session.history()[0].quality, Quality::Chunin);
    }

    #[tokio::test]
    async fn test_history_caps_at_30() {
        let (_dir, mut session, _) = counted_session();
        for i in 0..33 {
            session.summon(&format!("hero {}", i)).await;
        }
        assert_eq!(session.history().len(), 30);
        // Most recent first.
        assert!(session.history()[0].timestamp > session.history()[29].timestamp);
    }

    #[tokio::test]
    async fn test_summon_rejects_empty_prompt() {
        let (_dir, mut session, counters) = counted_session();
        assert!(matches!(session.summon("   ").await, Dispatch::Rejected(_)));
        assert_eq!(counters.design.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_busy_guard_drops_generation_requests() {
        let (_dir, mut session, counters) = counted_session();
        session.summon("first").await;
        let before = counters.design.load(Ordering::SeqCst);

        session.phase = Phase::GeneratingImage;
        assert_eq!(session.summon("second").await, Dispatch::Busy);
        assert_eq!(session.evolve().await, Dispatch::Busy);
        assert_eq!(session.generate_environment().await, Dispatch::Busy);
        assert_eq!(session.play_theme().await, Dispatch::Busy);
        assert_eq!(session.reroll_field(DesignField::Lore).await, Dispatch::Busy);
        assert_eq!(session.phase, Phase::GeneratingImage);

        assert_eq!(counters.design.load(Ordering::SeqCst), before);
        assert_eq!(counters.evolve.load(Ordering::SeqCst), 0);
        assert_eq!(counters.audio.load(Ordering::SeqCst), 0);
        assert_eq!(counters.field.load(Ordering::SeqCst), 0);
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_summon_leaves_history_untouched() {
        let counters = Arc::new(Counters::default());
        let backend = StubBackend {
            counters: counters.clone(),
            fail_image: true,
            ..Default::default()
        };
        let (_dir, mut session) = new_session(backend);

        assert_eq!(session.summon("doomed").await, Dispatch::Done);
        assert!(session.history().is_empty());
        assert!(session.draft().is_none());
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.take_notice().unwrap(), "Manifestation failed.");
    }

    #[tokio::test]
    async fn test_evolution_raises_stage_and_retimestamps() {
        let (_dir, mut session, _) = counted_session();
        session.summon("a sprout").await;
        let before = session.draft().unwrap().clone();

        assert_eq!(session.evolve().await, Dispatch::Done);
        let after = session.draft().unwrap();
        assert!(after.design.evolution_stage >= before.design.evolution_stage + 1);
        assert!(after.timestamp > before.timestamp);
        // Both the old and the evolved entry live in History.
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.take_notice().unwrap(), "Ascension complete.");
    }

    #[tokio::test]
    async fn test_evolve_without_draft_rejected() {
        let (_dir, mut session, counters) = counted_session();
        assert!(matches!(session.evolve().await, Dispatch::Rejected(_)));
        assert_eq!(counters.evolve.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_environment_updates_history_in_place() {
        let (_dir, mut session, _) = counted_session();
        session.summon("a wanderer").await;

        assert_eq!(session.generate_environment().await, Dispatch::Done);
        assert_eq!(session.history().len(), 1);
        assert!(session.history()[0].env_image_url.is_some());
        assert!(session.draft().unwrap().env_image_url.is_some());
    }

    #[tokio::test]
    async fn test_environment_without_draft_makes_no_provider_call() {
        let (_dir, mut session, counters) = counted_session();
        assert!(matches!(
            session.generate_environment().await,
            Dispatch::Rejected(_)
        ));
        assert_eq!(counters.image.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_theme_is_ephemeral() {
        let (_dir, mut session, counters) = counted_session();
        session.summon("a bard").await;
        let history_before = session.history().to_vec();

        assert_eq!(session.play_theme().await, Dispatch::Done);
        assert_eq!(counters.audio.load(Ordering::SeqCst), 1);
        assert_eq!(session.history(), &history_before[..]);
        assert!(session.take_notice().unwrap().starts_with("Theme resonating"));
    }

    #[tokio::test]
    async fn test_theme_failure_notice() {
        let counters = Arc::new(Counters::default());
        let backend = StubBackend {
            counters,
            fail_audio: true,
            ..Default::default()
        };
        let (_dir, mut session) = new_session(backend);
        session.summon("a mute").await;
        session.take_notice();

        session.play_theme().await;
        assert_eq!(session.take_notice().unwrap(), "Audio resonance failed.");
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_timestamps_are_unique() {
        let (_dir, mut session, _) = counted_session();
        for i in 0..5 {
            session.summon(&format!("clone {}", i)).await;
        }
        let mut seen: Vec<i64> = session.history().iter().map(|r| r.timestamp).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_archive_caps_and_deduplicates() {
        let (_dir, mut session, _) = counted_session();

        session.summon("keeper").await;
        session.save_to_archive();
        session.save_to_archive();
        assert_eq!(session.archive().len(), 1);

        for i in 0..52 {
            session.summon(&format!("scroll {}", i)).await;
            session.save_to_archive();
        }
        assert_eq!(session.archive().len(), 50);
        assert!(session.archive()[0].timestamp > session.archive()[49].timestamp);
    }

    #[tokio::test]
    async fn test_clear_history_spares_archive() {
        let (_dir, mut session, _) = counted_session();
        session.summon("fleeting").await;
        session.save_to_archive();

        session.clear_history();
        assert!(session.history().is_empty());
        assert_eq!(session.archive().len(), 1);
    }

    #[tokio::test]
    async fn test_reroll_updates_draft_but_not_history() {
        let (_dir, mut session, _) = counted_session();
        session.summon("mutable").await;
        let original_lore = session.history()[0].design.lore.clone();

        assert_eq!(session.reroll_field(DesignField::Lore).await, Dispatch::Done);
        assert_eq!(session.draft().unwrap().design.lore, "A rewritten chronicle.");
        assert_eq!(session.history()[0].design.lore, original_lore);
        assert_eq!(session.take_notice().unwrap(), "Lore re-manifested.");
    }

    #[tokio::test]
    async fn test_reroll_failure_keeps_draft() {
        let counters = Arc::new(Counters::default());
        let backend = StubBackend {
            counters,
            fail_field: true,
            ..Default::default()
        };
        let (_dir, mut session) = new_session(backend);
        session.summon("stubborn").await;
        let before = session.draft().unwrap().clone();

        session.reroll_field(DesignField::Powers).await;
        assert_eq!(session.draft().unwrap(), &before);
        assert_eq!(
            session.take_notice().unwrap(),
            "Powers re-manifestation failed."
        );
    }

    #[tokio::test]
    async fn test_refine_visuals_labels_the_notice() {
        let (_dir, mut session, _) = counted_session();
        session.summon("stylish").await;
        session.take_notice();

        session.refine_visuals("Aura").await;
        assert_eq!(session.take_notice().unwrap(), "Aura optimized.");
        assert_eq!(
            session.draft().unwrap().design.visual_traits,
            "Re-imagined silhouette"
        );
    }

    #[tokio::test]
    async fn test_sensei_transcript_grows_even_on_failure() {
        let counters = Arc::new(Counters::default());
        let backend = StubBackend {
            counters,
            fail_advice: true,
            ..Default::default()
        };
        let (_dir, mut session) = new_session(backend);

        assert_eq!(session.sensei_log().len(), 1); // welcome seed
        session.sensei_message("guide me").await;
        assert_eq!(session.sensei_log().len(), 3);
        assert_eq!(
            session.sensei_log()[2].text,
            "Spirit signal destabilized. Try again."
        );
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_lore_chat_appends_and_searches() {
        let (_dir, mut session, _) = counted_session();
        session.summon("oracle-bound").await;

        session.lore_question("What do they dream of?").await;
        assert_eq!(session.lore_log().entries().len(), 1);
        assert_eq!(session.lore_log().search("dream").len(), 1);
    }

    #[tokio::test]
    async fn test_lore_busy_flag_drops_requests() {
        let (_dir, mut session, counters) = counted_session();
        session.summon("popular").await;

        session.lore_busy = true;
        assert_eq!(session.lore_question("anyone there?").await, Dispatch::Busy);
        assert_eq!(counters.lore.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lore_failure_records_nothing() {
        let counters = Arc::new(Counters::default());
        let backend = StubBackend {
            counters,
            fail_lore: true,
            ..Default::default()
        };
        let (_dir, mut session) = new_session(backend);
        session.summon("silent").await;

        session.lore_question("speak!").await;
        assert!(session.lore_log().entries().is_empty());
    }

    #[tokio::test]
    async fn test_select_result_switches_draft_and_resets_lore() {
        let (_dir, mut session, _) = counted_session();
        session.summon("first").await;
        let first_ts = session.draft().unwrap().timestamp;
        session.lore_question("about the first").await;

        session.summon("second").await;
        assert!(session.lore_log().entries().is_empty());

        assert!(session.select_result(first_ts));
        assert_eq!(session.draft().unwrap().timestamp, first_ts);
        assert!(session.lore_log().entries().is_empty());
        assert!(!session.select_result(123456789));
    }

    #[tokio::test]
    async fn test_select_finds_archive_entries() {
        let (_dir, mut session, _) = counted_session();
        session.summon("archived one").await;
        let ts = session.draft().unwrap().timestamp;
        session.save_to_archive();
        session.clear_history();
        session.draft = None;

        assert!(session.select_result(ts));
        assert_eq!(session.draft().unwrap().timestamp, ts);
    }

    #[tokio::test]
    async fn test_swap_environment_view() {
        let (_dir, mut session, _) = counted_session();
        session.summon("two-faced").await;
        assert!(matches!(
            session.swap_environment_view(),
            Dispatch::Rejected(_)
        ));

        session.generate_environment().await;
        let portrait = session.draft().unwrap().image_url.clone();
        let env = session.draft().unwrap().env_image_url.clone().unwrap();

        assert_eq!(session.swap_environment_view(), Dispatch::Done);
        assert_eq!(session.draft().unwrap().image_url, env);
        assert_eq!(session.draft().unwrap().env_image_url.as_deref(), Some(portrait.as_str()));
    }

    #[tokio::test]
    async fn test_manual_edits_clamp() {
        let (_dir, mut session, _) = counted_session();
        session.summon("edited").await;

        session.set_stat(StatKind::Strength, 150);
        assert_eq!(session.draft().unwrap().design.stats.strength, 100);
        session.set_stat(StatKind::Agility, -5);
        assert_eq!(session.draft().unwrap().design.stats.agility, 1);

        session.edit_field(FieldUpdate::Name("Renamed".to_string()));
        assert_eq!(session.draft().unwrap().design.name, "Renamed");
    }

    #[tokio::test]
    async fn test_autosave_respects_toggle() {
        let (dir, mut session, _) = counted_session();
        session.autosave_interval = Duration::ZERO;
        session.summon("precious").await;

        session.update_settings(SettingsPatch {
            auto_save: Some(false),
            ..Default::default()
        });
        session.autosave_tick();
        assert!(!dir.path().join("draft.json").exists());
        // History persisted regardless of the draft toggle.
        assert!(dir.path().join("history.json").exists());

        session.update_settings(SettingsPatch {
            auto_save: Some(true),
            ..Default::default()
        });
        session.autosave_tick();
        assert!(dir.path().join("draft.json").exists());
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = StubBackend::default();
            let mut session = Session::new(backend, Store::new(dir.path()));
            session.signup("kai@example.com", "hunter2").unwrap();
            session.set_quality(Quality::Jonin);
            session.summon("persistent").await;
            session.save_to_archive();
            session.update_settings(SettingsPatch {
                resolution: Some(crate::model::Resolution::R2048),
                ..Default::default()
            });
            session.autosave_interval = Duration::ZERO;
            session.autosave_tick();
        }

        let backend = StubBackend::default();
        let session = Session::new(backend, Store::new(dir.path()));
        assert_eq!(session.identity().unwrap().email, "kai@example.com");
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.archive().len(), 1);
        assert_eq!(session.settings().resolution, crate::model::Resolution::R2048);
        let draft = session.draft().unwrap();
        assert_eq!(draft.quality, Quality::Jonin);
        assert_eq!(draft.timestamp, session.history()[0].timestamp);
    }

    #[tokio::test]
    async fn test_restart_timestamps_stay_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let first_ts;
        {
            let mut session = Session::new(StubBackend::default(), Store::new(dir.path()));
            session.signup("kai@example.com", "hunter2").unwrap();
            session.summon("early").await;
            first_ts = session.history()[0].timestamp;
        }
        let mut session = Session::new(StubBackend::default(), Store::new(dir.path()));
        session.summon("late").await;
        assert!(session.history()[0].timestamp > first_ts);
    }

    #[tokio::test]
    async fn test_admin_login_and_logout() {
        let (_dir, mut session, _) = counted_session();
        session.logout();
        assert_eq!(session.phase(), Phase::Unauthenticated);
        assert!(matches!(session.summon("locked out").await, Dispatch::Rejected(_)));

        session
            .login(crate::auth::ADMIN_EMAIL, crate::auth::ADMIN_PASS)
            .unwrap();
        assert!(session.identity().unwrap().is_admin);
        assert_eq!(session.phase(), Phase::Idle);

        assert_eq!(
            session.login("ghost@example.com", "boo"),
            Err(AuthError::Mismatch)
        );
    }
}
