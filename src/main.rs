//! ModHaven - Blasphemous Mod Manager
//!
//! Command-line front end: every subcommand is one discrete action on the
//! catalog or on a single mod.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use modhaven::config::AppConfig;
use modhaven::games::Game;
use modhaven::logging::{init_logger, log_error, log_info, set_console_echo};
use modhaven::manager::{ModCommand, ModManager};
use modhaven::skins::SkinManager;
use modhaven::utils::HttpTransfer;
use modhaven::{ModError, Result};

#[derive(Parser, Debug)]
#[clap(name = "modhaven", version, about = "Mod manager for Blasphemous and Blasphemous 2")]
struct Cli {
    /// Game to operate on (blas1 or blas2)
    #[clap(long, short, default_value = "blas1", value_parser = parse_game)]
    game: Game,

    /// Only print command output, not log lines
    #[clap(long, short)]
    quiet: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List catalogued mods with their state
    List,

    /// Fetch the remote catalog and check for updates
    Refresh,

    /// Show everything known about one mod
    Info { name: String },

    /// Download and install the latest release of a mod
    Install { name: String },

    /// Remove every file a mod owns
    Uninstall { name: String },

    /// Move a mod's plugin back into the plugins directory
    Enable { name: String },

    /// Move a mod's plugin into the disabled directory
    Disable { name: String },

    /// Reinstall a mod at its latest release (every outdated mod if omitted)
    Update { name: Option<String> },

    /// Manage Blasphemous skins
    Skins {
        #[clap(subcommand)]
        command: SkinCommand,
    },

    /// Set the game installation directory
    SetRoot { path: PathBuf },

    /// Install the game's modding tools
    Tools,

    /// Show configured roots and tool status
    Status,
}

#[derive(Subcommand, Debug)]
enum SkinCommand {
    List,
    Refresh,
    Info { id: String },
    Install { id: String },
    Uninstall { id: String },
    Update { id: String },
}

fn parse_game(key: &str) -> std::result::Result<Game, String> {
    Game::from_key(key).ok_or_else(|| format!("unknown game '{}' (expected blas1 or blas2)", key))
}

fn print_progress(fraction: f32) {
    print!("\r  {:>3.0}%", fraction * 100.0);
    let _ = std::io::stdout().flush();
}

fn run_mod_command(manager: &ModManager, name: &str, command: ModCommand) -> Result<()> {
    let state = manager.execute_with_progress(name, command, &print_progress)?;
    println!("\r{}: {}", name, state.label());
    Ok(())
}

fn list_mods(manager: &ModManager) {
    for (record, state) in manager.list() {
        println!(
            "{:<28} {:<10} {:<10} {}{}",
            record.name,
            record.installed().unwrap_or("-"),
            record.latest_version.as_deref().unwrap_or("?"),
            state.label(),
            if record.update_available() { " (update available)" } else { "" }
        );
    }
}

fn show_mod(manager: &ModManager, name: &str) -> Result<()> {
    let record = manager
        .find(name)
        .ok_or_else(|| ModError::UnknownMod(name.to_string()))?;
    let state = manager.state(name)?;

    println!("{} by {}", record.name, record.author);
    if !record.description.is_empty() {
        println!("  {}", record.description);
    }
    println!("  repository: {}", record.repo_url());
    println!("  plugin:     {}", record.plugin_file);
    println!("  state:      {}", state.label());
    println!("  installed:  {}", record.installed().unwrap_or("-"));
    println!("  latest:     {}", record.latest_version.as_deref().unwrap_or("?"));
    if let Some(date) = record.release_date {
        println!("  released:   {}", date.format("%Y-%m-%d"));
    }
    if !record.required_dlls.is_empty() {
        println!("  requires:   {}", record.required_dlls.join(", "));
    }
    Ok(())
}

fn tools_label(game: Game, root: &Path) -> &'static str {
    if !game.modding_tools_installed(root) {
        "missing"
    } else if game.modding_tools_outdated(root) {
        "outdated"
    } else {
        "installed"
    }
}

fn refresh_mods(manager: &ModManager) -> Result<()> {
    let report = manager.refresh_default()?;
    println!(
        "{} new, {} skipped, {} updates available",
        report.added.len(),
        report.skipped.len(),
        report.updates.len()
    );
    for (name, reason) in &report.skipped {
        println!("  skipped {}: {}", name, reason);
    }
    match report.persist_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Update every outdated mod; one failure does not stop the rest
fn update_all(manager: &ModManager) -> Result<()> {
    let pending = manager.pending_updates();
    if pending.is_empty() {
        println!("Everything is up to date");
    }

    let mut first_error = None;
    for name in pending {
        if let Err(e) = run_mod_command(manager, &name, ModCommand::Update) {
            eprintln!("{}: {}", name, e);
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load();
    let game = cli.game;

    match cli.command {
        Command::SetRoot { path } => {
            config.set_game_root(game, path)?;
            config.save()?;
            println!("{} root set", game);
        }
        Command::Status => {
            for game in Game::ALL {
                match config.game_root(game) {
                    Some(root) => println!(
                        "{}: {} (modding tools {})",
                        game,
                        root.display(),
                        tools_label(game, root)
                    ),
                    None => match game.guess_root() {
                        Some(guess) => println!("{}: not set (found {})", game, guess.display()),
                        None => println!("{}: not set", game),
                    },
                }
            }
        }
        Command::Tools => {
            let root = config.require_root(game)?;
            let transfer = HttpTransfer::new(config.request_timeout());
            if game.install_modding_tools(
                &root,
                &transfer,
                &AppConfig::get_downloads_path(),
                &print_progress,
            )? {
                println!("\r{} modding tools installed", game);
            } else {
                println!("{} has no separate modding tools", game);
            }
        }
        Command::Skins { command } => {
            let skins = SkinManager::open(&config)?;
            match command {
                SkinCommand::List => {
                    for status in skins.list() {
                        println!(
                            "{:<24} {:<10} by {:<16} {}{}",
                            status.skin.name,
                            status.skin.version,
                            status.skin.author,
                            if status.installed { "installed" } else { "-" },
                            if status.update_available { " (update available)" } else { "" }
                        );
                    }
                }
                SkinCommand::Refresh => {
                    if let Some(url) = Game::Blasphemous.skins_catalog_url() {
                        println!("{} skins available", skins.refresh(&url)?);
                    }
                }
                SkinCommand::Info { id } => {
                    let skin = skins.find(&id)?;
                    println!("{} {} by {}", skin.name, skin.version, skin.author);
                    println!("  idle:    {}", skin.idle_preview_url());
                    println!("  charged: {}", skin.charged_preview_url());
                }
                SkinCommand::Install { id } => skins.install(&id)?,
                SkinCommand::Uninstall { id } => skins.uninstall(&id)?,
                SkinCommand::Update { id } => skins.update(&id)?,
            }
        }
        Command::List => list_mods(&ModManager::open(&config, game)?),
        Command::Refresh => refresh_mods(&ModManager::open(&config, game)?)?,
        Command::Info { name } => show_mod(&ModManager::open(&config, game)?, &name)?,
        Command::Install { name } => {
            run_mod_command(&ModManager::open(&config, game)?, &name, ModCommand::Install)?
        }
        Command::Uninstall { name } => {
            run_mod_command(&ModManager::open(&config, game)?, &name, ModCommand::Uninstall)?
        }
        Command::Enable { name } => {
            run_mod_command(&ModManager::open(&config, game)?, &name, ModCommand::Enable)?
        }
        Command::Disable { name } => {
            run_mod_command(&ModManager::open(&config, game)?, &name, ModCommand::Disable)?
        }
        Command::Update { name: Some(name) } => {
            run_mod_command(&ModManager::open(&config, game)?, &name, ModCommand::Update)?
        }
        Command::Update { name: None } => update_all(&ModManager::open(&config, game)?)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    set_console_echo(!cli.quiet);
    init_logger();
    log_info("ModHaven starting up...");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error(&e.to_string());
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
