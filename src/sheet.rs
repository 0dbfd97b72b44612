use crate::model::{ChatRole, ChatTurn, CharacterDesign, GeneratedResult, LoreEntry};

/// Terminal renderer for character records.
pub struct SheetFormatter;

impl SheetFormatter {
    /// Full character sheet for the current manifestation.
    pub fn format_sheet(result: &GeneratedResult) -> String {
        let design = &result.design;
        let mut out = String::new();

        out.push_str(&format!(
            r#"
╔══════════════════════════════════════════════════════════════╗
║  {:<58}  ║
╚══════════════════════════════════════════════════════════════╝
"#,
            Self::truncate(&format!("{} — {}", design.name, design.title), 55)
        ));

        out.push_str(&format!(
            "⚡ RECORD TYPE: ASCENDED FORM {} | {} MANIFEST",
            design.evolution_stage, result.quality
        ));
        if let Some(resolution) = &result.resolution {
            out.push_str(&format!(" | {}px", resolution));
        }
        out.push('\n');

        out.push_str("\n🎯 Core Attribute Matrix\n");
        out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        out.push_str(&format!(
            "💪 Strength:      {}\n",
            Self::format_stat_bar(design.stats.strength)
        ));
        out.push_str(&format!(
            "🍃 Agility:       {}\n",
            Self::format_stat_bar(design.stats.agility)
        ));
        out.push_str(&format!(
            "🧠 Intelligence:  {}\n",
            Self::format_stat_bar(design.stats.intelligence)
        ));
        out.push_str(&format!(
            "🔥 Stamina:       {}\n",
            Self::format_stat_bar(design.stats.stamina)
        ));

        out.push_str("\n✨ Manifested Abilities\n");
        out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        for power in &design.powers {
            out.push_str(&format!("  ◆ {}\n", power));
        }

        out.push_str("\n🌍 Homeworld Signature\n");
        out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        out.push_str(&format!("{}\n", design.homeworld));

        out.push_str("\n👁 Morphological Specs\n");
        out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        out.push_str(&format!("{}\n", design.visual_traits));

        out.push_str("\n🎭 Personality\n");
        out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        out.push_str(&format!("{}\n", design.personality));

        out.push_str("\n📜 Chronicle\n");
        out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        out.push_str(&format!("{}\n", design.lore));

        out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        let mut artifacts = vec!["portrait"];
        if result.env_image_url.is_some() {
            artifacts.push("world");
        }
        out.push_str(&format!(
            "🖼 Artifacts: {} | Aesthetic: {} | AARUTO_ID: {}\n",
            artifacts.join(" + "),
            design.aesthetic,
            design.id_tag(result.timestamp)
        ));

        out
    }

    /// Compact sheet for a design alone (share previews).
    pub fn format_design_preview(design: &CharacterDesign) -> String {
        format!(
            "{} — {} (stage {})\n  Aesthetic: {}\n  Powers: {}\n  Homeworld: {}\n",
            design.name,
            design.title,
            design.evolution_stage,
            design.aesthetic,
            design.powers.join(", "),
            design.homeworld
        )
    }

    pub fn format_history(entries: &[GeneratedResult], current: Option<i64>) -> String {
        if entries.is_empty() {
            return "⏳ History empty.\n".to_string();
        }
        let mut out = String::from("🕐 Temporal History\n");
        out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        for (i, entry) in entries.iter().enumerate() {
            let marker = if current == Some(entry.timestamp) {
                "▶"
            } else {
                " "
            };
            out.push_str(&format!(
                "{} {:>2}. {} — {} [{} | stage {}]\n",
                marker,
                i + 1,
                Self::truncate(&entry.design.name, 24),
                Self::truncate(&entry.design.title, 28),
                entry.quality,
                entry.design.evolution_stage
            ));
        }
        out
    }

    pub fn format_archive(entries: &[GeneratedResult]) -> String {
        if entries.is_empty() {
            return "📭 Eternal Archive empty.\n".to_string();
        }
        let mut out = format!("📚 Eternal Archive ({})\n", entries.len());
        out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        for (i, entry) in entries.iter().enumerate() {
            out.push_str(&format!(
                "  {:>2}. {} — {} Manifest\n",
                i + 1,
                Self::truncate(&entry.design.name, 28),
                entry.quality
            ));
        }
        out
    }

    pub fn format_lore(entries: &[&LoreEntry]) -> String {
        if entries.is_empty() {
            return "The Oracle awaits your whisper.\n".to_string();
        }
        let mut out = String::new();
        for entry in entries {
            out.push_str(&format!("❓ Inquiry: {}\n", entry.question));
            out.push_str(&format!("📖 {}\n\n", entry.answer));
        }
        out
    }

    pub fn format_sensei(log: &[ChatTurn]) -> String {
        let mut out = String::new();
        for turn in log {
            let speaker = match turn.role {
                ChatRole::User => "You   ",
                ChatRole::Sensei => "Sensei",
            };
            out.push_str(&format!("{} │ {}\n", speaker, turn.text));
        }
        out
    }

    fn format_stat_bar(value: u32) -> String {
        let filled = (value as usize) / 10;
        let empty = 10 - filled;
        format!("[{}{}] {:>3}/100", "█".repeat(filled), "░".repeat(empty), value)
    }

    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let cut: String = s.chars().take(max_len).collect();
            format!("{}...", cut)
        }
    }
}
