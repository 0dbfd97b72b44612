use std::path::PathBuf;

use anyhow::Result;
use colored::*;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};

use crate::config::Config;
use crate::model::{
    export_share_code, import_share_code, Aesthetic, DesignField, FieldUpdate, Quality,
    SettingsPatch, StatKind,
};
use crate::provider::GeminiClient;
use crate::session::{Dispatch, Session};
use crate::sheet::SheetFormatter;
use crate::store::Store;

pub async fn handle_shell(data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let api_key = config.resolved_api_key().unwrap_or_default();
    if api_key.is_empty() {
        eprintln!(
            "{}",
            "⚠ No Gemini key configured; generation will fail. Set GEMINI_API_KEY or edit config.json."
                .yellow()
        );
    }
    let backend = GeminiClient::new(api_key, config.base_url.clone());
    let store = Store::new(config.data_dir.clone());
    let session = Session::new(backend, store);

    let mut shell = ShellMode::new(session, &config)?;
    shell.run().await
}

pub struct ShellMode {
    session: Session<GeminiClient>,
    editor: Editor<ShellCompleter, DefaultHistory>,
    history_file: PathBuf,
}

struct ShellCompleter {
    completer: FilenameCompleter,
}

const COMMANDS: &[&str] = &[
    "/help", "/status", "/sheet", "/history", "/archive", "/select", "/save", "/clear",
    "/evolve", "/env", "/theme", "/reroll", "/refine", "/lore", "/search", "/sensei",
    "/quality", "/settings", "/set", "/edit", "/stat", "/swap", "/share", "/import",
    "/login", "/signup", "/logout", "/whoami", "/exit",
];

impl ShellCompleter {
    fn new() -> Self {
        ShellCompleter {
            completer: FilenameCompleter::new(),
        }
    }
}

impl Helper for ShellCompleter {}

impl Hinter for ShellCompleter {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellCompleter {}

impl Validator for ShellCompleter {}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if line.starts_with('/') {
            let word_start = line.rfind(' ').map_or(0, |i| i + 1);
            let word = &line[word_start..pos];

            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(word))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();

            return Ok((word_start, matches));
        }

        self.completer.complete(line, pos, ctx)
    }
}

impl ShellMode {
    pub fn new(session: Session<GeminiClient>, config: &Config) -> Result<Self> {
        let completer = ShellCompleter::new();
        let mut editor = Editor::with_config(rustyline::Config::builder().tab_stop(4).build())?;
        editor.set_helper(Some(completer));

        let history_file = config.data_dir.join("shell_history.txt");
        if history_file.exists() {
            let _ = editor.load_history(&history_file);
        }

        Ok(ShellMode {
            session,
            editor,
            history_file,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("{}", "AARUTO_ANIME.AI — Akashic Terminal".truecolor(255, 107, 0).bold());
        println!("{}", "Whisper a legend to summon; /help lists commands.".dimmed());
        if self.session.identity().is_none() {
            println!(
                "{}",
                "Sealed terminal. /login <email> <passkey> or /signup <email> <passkey> to begin."
                    .yellow()
            );
        }

        loop {
            self.session.autosave_tick();

            match self.editor.readline("aaruto> ") {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(&line);
                    if !self.dispatch(&line).await {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("Input error: {}", e);
                    break;
                }
            }
        }

        let _ = self.editor.save_history(&self.history_file);
        println!("{}", "Terminal sealed.".dimmed());
        Ok(())
    }

    /// Routes one input line. Returns false when the shell should exit.
    async fn dispatch(&mut self, line: &str) -> bool {
        if !line.starts_with('/') {
            self.summon(line).await;
            return true;
        }

        let (command, rest) = match line.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match command {
            "/exit" | "/quit" => return false,
            "/help" => self.show_help(),
            "/status" => self.show_status(),
            "/sheet" => self.show_sheet(),
            "/history" => println!(
                "{}",
                SheetFormatter::format_history(
                    self.session.history(),
                    self.session.draft().map(|d| d.timestamp)
                )
            ),
            "/archive" => println!("{}", SheetFormatter::format_archive(self.session.archive())),
            "/select" => self.select(rest),
            "/save" => {
                let dispatch = self.session.save_to_archive();
                self.finish(dispatch);
            }
            "/clear" => {
                self.session.clear_history();
                self.print_notice();
            }
            "/evolve" => self.evolve().await,
            "/env" => {
                let dispatch = self.session.generate_environment().await;
                self.finish(dispatch);
            }
            "/theme" => {
                let dispatch = self.session.play_theme().await;
                self.finish(dispatch);
            }
            "/reroll" => self.reroll(rest).await,
            "/refine" => self.refine(rest).await,
            "/lore" => self.lore(rest).await,
            "/search" => self.search_lore(rest),
            "/sensei" => self.sensei(rest).await,
            "/quality" => self.set_quality(rest),
            "/settings" => self.show_settings(),
            "/set" => self.set_setting(rest),
            "/edit" => self.edit(rest),
            "/stat" => self.set_stat(rest),
            "/swap" => {
                let dispatch = self.session.swap_environment_view();
                self.finish(dispatch);
            }
            "/share" => self.share(),
            "/import" => self.import(rest),
            "/login" => self.login(rest, false),
            "/signup" => self.login(rest, true),
            "/logout" => {
                self.session.logout();
                println!("{}", "Sealed. Until next time.".dimmed());
            }
            "/whoami" => self.whoami(),
            _ => println!("{} {}", "Unknown command:".red(), command),
        }
        true
    }

    async fn summon(&mut self, prompt: &str) {
        let before = self.session.draft().map(|d| d.timestamp);
        let dispatch = self.session.summon(prompt).await;
        self.finish(dispatch);
        self.render_if_new_draft(before);
    }

    async fn evolve(&mut self) {
        let before = self.session.draft().map(|d| d.timestamp);
        let dispatch = self.session.evolve().await;
        self.finish(dispatch);
        self.render_if_new_draft(before);
    }

    async fn reroll(&mut self, field: &str) {
        let field: DesignField = match field.parse() {
            Ok(field) => field,
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                println!("Fields: name title personality aesthetic powers lore visuals homeworld stats");
                return;
            }
        };
        let dispatch = self.session.reroll_field(field).await;
        self.finish(dispatch);
    }

    async fn refine(&mut self, aspect: &str) {
        if aspect.is_empty() {
            println!("Aspects: Eyes Fabric Armor Scars Aura");
            return;
        }
        let dispatch = self.session.refine_visuals(aspect).await;
        self.finish(dispatch);
    }

    async fn lore(&mut self, question: &str) {
        if question.is_empty() {
            println!(
                "{}",
                SheetFormatter::format_lore(&self.session.lore_log().search(""))
            );
            return;
        }
        let dispatch = self.session.lore_question(question).await;
        self.report(dispatch);
        if let Some(entry) = self.session.lore_log().entries().last() {
            if entry.question == question {
                println!("📖 {}", entry.answer);
            }
        }
    }

    fn search_lore(&self, term: &str) {
        let matches = self.session.lore_log().search(term);
        if matches.is_empty() && !self.session.lore_log().entries().is_empty() {
            println!("{}", "No matching resonance found.".dimmed());
            return;
        }
        println!("{}", SheetFormatter::format_lore(&matches));
    }

    async fn sensei(&mut self, message: &str) {
        if message.is_empty() {
            println!("{}", SheetFormatter::format_sensei(self.session.sensei_log()));
            return;
        }
        let dispatch = self.session.sensei_message(message).await;
        if dispatch == Dispatch::Done {
            if let Some(turn) = self.session.sensei_log().last() {
                println!("{} {}", "Sensei │".cyan(), turn.text);
            }
        } else {
            self.report(dispatch);
        }
    }

    fn set_quality(&mut self, tier: &str) {
        match tier.parse::<Quality>() {
            Ok(quality) => {
                self.session.set_quality(quality);
                println!("Quality tier: {}", quality.to_string().green());
            }
            Err(_) => println!("Tiers: GENIN CHUNIN JONIN"),
        }
    }

    fn set_setting(&mut self, rest: &str) {
        let Some((key, value)) = rest.split_once(' ').map(|(k, v)| (k, v.trim())) else {
            println!("Usage: /set <autosave|resolution|style|lighting|composition> <value>");
            return;
        };

        let mut patch = SettingsPatch::default();
        let parsed = match key.to_lowercase().as_str() {
            "autosave" => match value {
                "on" | "true" => {
                    patch.auto_save = Some(true);
                    Ok(())
                }
                "off" | "false" => {
                    patch.auto_save = Some(false);
                    Ok(())
                }
                _ => Err(anyhow::anyhow!("expected on/off")),
            },
            "resolution" => value.parse().map(|v| patch.resolution = Some(v)),
            "style" | "artstyle" => value.parse().map(|v| patch.art_style = Some(v)),
            "lighting" => value.parse().map(|v| patch.lighting = Some(v)),
            "composition" => value.parse().map(|v| patch.composition = Some(v)),
            other => Err(anyhow::anyhow!("unknown setting '{}'", other)),
        };

        match parsed {
            Ok(()) => {
                self.session.update_settings(patch);
                self.show_settings();
            }
            Err(e) => println!("{} {}", "✗".red(), e),
        }
    }

    fn edit(&mut self, rest: &str) {
        let Some((field, value)) = rest.split_once(' ').map(|(f, v)| (f, v.trim())) else {
            println!("Usage: /edit <name|title|aesthetic> <value>");
            return;
        };
        if value.is_empty() {
            println!("Usage: /edit <name|title|aesthetic> <value>");
            return;
        }

        let update = match field.to_lowercase().as_str() {
            "name" => FieldUpdate::Name(value.to_string()),
            "title" => FieldUpdate::Title(value.to_string()),
            "aesthetic" => match value.parse::<Aesthetic>() {
                Ok(aesthetic) => FieldUpdate::Aesthetic(aesthetic.to_string()),
                Err(_) => {
                    let options: Vec<String> =
                        Aesthetic::ALL.iter().map(|a| a.to_string()).collect();
                    println!("Aesthetics: {}", options.join(", "));
                    return;
                }
            },
            other => {
                println!("{} cannot edit '{}' by hand; try /reroll", "✗".red(), other);
                return;
            }
        };
        let dispatch = self.session.edit_field(update);
        self.finish(dispatch);
    }

    fn set_stat(&mut self, rest: &str) {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let (stat, value) = match parts.as_slice() {
            [stat, value] => (stat.parse::<StatKind>(), value.parse::<i64>()),
            _ => {
                println!("Usage: /stat <strength|agility|intelligence|stamina> <1-100>");
                return;
            }
        };
        match (stat, value) {
            (Ok(stat), Ok(value)) => {
                let dispatch = self.session.set_stat(stat, value);
                self.finish(dispatch);
                if let Some(draft) = self.session.draft() {
                    println!("{}: {}/100", stat, draft.design.stats.get(stat));
                }
            }
            _ => println!("Usage: /stat <strength|agility|intelligence|stamina> <1-100>"),
        }
    }

    fn select(&mut self, rest: &str) {
        let entry = if let Some(index) = rest.strip_prefix('a').and_then(|n| n.parse::<usize>().ok())
        {
            (index >= 1)
                .then(|| self.session.archive().get(index - 1).cloned())
                .flatten()
        } else if let Ok(n) = rest.parse::<u64>() {
            // Small numbers address the history listing; anything larger is
            // treated as a raw timestamp.
            if (1..=self.session.history().len() as u64).contains(&n) {
                self.session.history().get(n as usize - 1).cloned()
            } else {
                self.session
                    .history()
                    .iter()
                    .chain(self.session.archive())
                    .find(|r| r.timestamp == n as i64)
                    .cloned()
            }
        } else {
            None
        };

        match entry {
            Some(result) => {
                self.session.select_result(result.timestamp);
                self.show_sheet();
            }
            None => println!(
                "{}",
                "Usage: /select <history #> or /select a<archive #>".dimmed()
            ),
        }
    }

    fn share(&self) {
        let Some(draft) = self.session.draft() else {
            println!("{}", "Nothing to share.".dimmed());
            return;
        };
        match export_share_code(&draft.design) {
            Ok(code) => {
                println!("Share code (import with /import):");
                println!("{}", code);
            }
            Err(e) => println!("{} {}", "✗".red(), e),
        }
    }

    fn import(&self, code: &str) {
        match import_share_code(code) {
            Ok(design) => {
                println!("{}", "Imported design preview:".green());
                println!("{}", SheetFormatter::format_design_preview(&design));
            }
            Err(e) => println!("{} {}", "✗".red(), e),
        }
    }

    fn login(&mut self, rest: &str, signup: bool) {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let &[email, password] = parts.as_slice() else {
            let verb = if signup { "/signup" } else { "/login" };
            println!("Usage: {} <email> <passkey>", verb);
            return;
        };

        let outcome = if signup {
            self.session.signup(email, password)
        } else {
            self.session.login(email, password)
        };
        match outcome {
            Ok(()) => self.whoami(),
            Err(e) => println!("{} {}", "✗".red(), e.to_string().red()),
        }
    }

    fn whoami(&self) {
        match self.session.identity() {
            Some(identity) => {
                let rank = if identity.is_admin {
                    "MASTER ARCHITECT".truecolor(255, 107, 0)
                } else {
                    "SUMMONER".cyan()
                };
                println!("{} — {}", rank.bold(), identity.email);
            }
            None => println!("{}", "Unsealed. No identity bound.".dimmed()),
        }
    }

    fn show_sheet(&self) {
        match self.session.draft() {
            Some(draft) => println!("{}", SheetFormatter::format_sheet(draft)),
            None => println!(
                "{}",
                "Akashic Terminal ready. Whisper a legend to pull existence from the Multiverse."
                    .dimmed()
            ),
        }
    }

    fn show_settings(&self) {
        let settings = self.session.settings();
        println!("{}", "Engine Parameters".cyan().bold());
        println!(
            "Temporal Sync (autosave): {}",
            if settings.auto_save { "on".green() } else { "off".yellow() }
        );
        println!("Spectral Resolution: {}px", settings.resolution);
        println!("Artistic Paradigm: {}", settings.art_style);
        println!("Lighting Frequency: {}", settings.lighting);
        println!("Lens Composition: {}", settings.composition);
    }

    fn show_status(&self) {
        println!("{}", "aaruto Status".cyan().bold());
        self.whoami();
        println!("Phase: {}", self.session.phase().label());
        println!("Quality: {}", self.session.quality());
        println!(
            "History: {} | Archive: {}",
            self.session.history().len(),
            self.session.archive().len()
        );
        match self.session.draft() {
            Some(draft) => println!(
                "Current: {} — {} (stage {})",
                draft.design.name, draft.design.title, draft.design.evolution_stage
            ),
            None => println!("Current: none"),
        }
    }

    fn show_help(&self) {
        println!("{}", "Commands".cyan().bold());
        println!("  <text>              Summon a manifestation from a prompt");
        println!("  /evolve             Unleash evolution on the current manifestation");
        println!("  /env                Expand the homeworld into a wide shot");
        println!("  /theme              Generate the character's theme jingle");
        println!("  /reroll <field>     Re-manifest one design field");
        println!("  /refine <aspect>    Refine visuals (Eyes Fabric Armor Scars Aura)");
        println!("  /lore [question]    Consult the Oracle (no arg: show transcript)");
        println!("  /search <term>      Search past lore fragments");
        println!("  /sensei [message]   Seek the Omni-Sensei's advice");
        println!("  /sheet /status      Show the current sheet / console status");
        println!("  /history /archive   List collections; /select <n> or a<n>");
        println!("  /save /clear        Archive the draft / purge history");
        println!("  /quality <tier>     GENIN CHUNIN JONIN");
        println!("  /settings /set      Show or change engine parameters");
        println!("  /edit /stat /swap   Manual sheet edits");
        println!("  /share /import      Share codes for designs");
        println!("  /login /signup /logout /whoami /exit");
    }

    /// Prints dispatch-level rejections; the notice carries op outcomes.
    fn report(&mut self, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Done => {}
            Dispatch::Busy => println!(
                "{}",
                "The engine is occupied. Await the current manifestation.".yellow()
            ),
            Dispatch::Rejected(reason) => println!("{}", reason.red()),
        }
    }

    fn finish(&mut self, dispatch: Dispatch) {
        self.report(dispatch);
        self.print_notice();
    }

    fn print_notice(&mut self) {
        if let Some(notice) = self.session.take_notice() {
            println!("{}", notice.truecolor(255, 107, 0).bold());
        }
    }

    fn render_if_new_draft(&mut self, before: Option<i64>) {
        let after = self.session.draft().map(|d| d.timestamp);
        if after != before {
            if let Some(draft) = self.session.draft() {
                println!("{}", SheetFormatter::format_sheet(draft));
            }
        }
    }
}
