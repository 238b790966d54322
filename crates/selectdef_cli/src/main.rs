use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use selectdef_core::config::{AppConfig, ConfigStore};
use selectdef_core::core_api::{CoreError, Engine, Session};
use selectdef_core::defs::{self, GameLayout};
use selectdef_core::grid::GridDimensions;
use selectdef_core::scan;
use selectdef_render::{
    JsonStyle, render_document_json, render_document_text, render_grid_text, render_scan_json,
    render_scan_text, render_slot_json, render_slot_text,
};
use serde_json::Value as JsonValue;
use tracing_subscriber::EnvFilter;

/// Parameter key that edits a character's positional stage list.
const STAGE_PARAM_KEY: &str = "stage";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Game directory containing chars/, stages/ and data/.
    #[arg(long, value_name = "DIR", global = true)]
    root: Option<PathBuf>,
    /// Roster file to edit; overrides --root.
    #[arg(long = "select", value_name = "SELECT.DEF", global = true)]
    select_def: Option<PathBuf>,
    /// Settings file to use instead of ./selectdef.toml and the user config.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Do not copy the roster aside before overwriting it.
    #[arg(long = "no-backup", global = true)]
    no_backup: bool,
    /// Write an edited roster here instead of overwriting it.
    #[arg(long, value_name = "PATH", global = true)]
    output: Option<PathBuf>,
    /// Print an edited roster to stdout without writing anything.
    #[arg(long = "dry-run", global = true, conflicts_with = "output")]
    dry_run: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summary, grid and extra stages.
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Details of one slot.
    Slot {
        index: usize,
        #[arg(long)]
        json: bool,
    },
    /// Grid only.
    Grid,
    /// Put a character in a slot, padding the roster with `empty` if needed.
    Set { index: usize, character: String },
    /// Make a slot `randomselect`.
    Random { index: usize },
    /// Make a slot `empty`.
    Clear { index: usize },
    /// Replace a character's whole parameter string; an empty string clears it.
    Params { index: usize, raw: String },
    /// Read or set one character parameter; `stage` edits the stage list.
    Param {
        index: usize,
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: Option<String>,
    },
    /// Move a slot, shifting the ones in between.
    Move { from: usize, to: usize },
    Swap { a: usize, b: usize },
    Remove { index: usize },
    /// Drop trailing empty slots.
    Trim,
    /// Turn a slot into a slot group.
    Group {
        index: usize,
        #[arg(required = true, num_args = 1..)]
        characters: Vec<String>,
    },
    #[command(name = "group-add")]
    GroupAdd { index: usize, character: String },
    #[command(name = "group-remove")]
    GroupRemove { index: usize, member: usize },
    #[command(name = "group-move")]
    GroupMove { index: usize, from: usize, to: usize },
    /// Set next, previous or select of a group member.
    Member {
        index: usize,
        member: usize,
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Keep only a group's primary character.
    Ungroup { index: usize },
    #[command(name = "stage-add")]
    StageAdd { line: String },
    #[command(name = "stage-remove")]
    StageRemove { index: usize },
    #[command(name = "stage-path")]
    StagePath { index: usize, path: String },
    #[command(name = "stage-param")]
    StageParam {
        index: usize,
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: Option<String>,
    },
    /// List characters and stages found under the game directory.
    Scan {
        #[arg(long)]
        json: bool,
    },
    /// Remember a game directory and roster from its system.def.
    Setup {
        #[arg(long, value_name = "SYSTEM.DEF")]
        system: Option<PathBuf>,
    },
    /// Show or change stored settings.
    Config {
        #[arg(long, value_name = "BOOL")]
        backup: Option<bool>,
        #[arg(long = "use-local", value_name = "BOOL")]
        use_local: Option<bool>,
    },
}

#[derive(Debug)]
struct RosterPaths {
    root: PathBuf,
    data_dir: PathBuf,
    select_def: PathBuf,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path, None),
        None => ConfigStore::discover(),
    };
    let config = store.load().unwrap_or_else(|e| {
        eprintln!("Error loading settings: {}", e.message);
        process::exit(1);
    });

    match &cli.command {
        Command::Scan { json } => {
            run_scan(&cli, &config, *json);
            return;
        }
        Command::Setup { system } => {
            run_setup(&cli, &store, config, system.as_deref());
            return;
        }
        Command::Config { backup, use_local } => {
            run_config(&store, config, *backup, *use_local);
            return;
        }
        _ => {}
    }

    let paths = resolve_roster(&cli, &config);
    let backups = !cli.no_backup && config.options.backup;
    let mut session = Engine::new()
        .with_backups(backups)
        .open_path(&paths.select_def)
        .unwrap_or_else(|e| {
            eprintln!("Error opening roster: {}", e.message);
            process::exit(1);
        });
    let grid = GridDimensions::resolve(&paths.root, &paths.data_dir);
    tracing::debug!(rows = grid.rows, cols = grid.cols, "grid dimensions");

    let Some(message) = run_roster_command(&cli.command, &mut session, grid) else {
        return;
    };

    if cli.dry_run {
        eprintln!("{message}");
        print!("{}", session.to_text());
        return;
    }

    let target = cli.output.clone().unwrap_or(paths.select_def);
    let written = match &cli.output {
        Some(path) => session.save_as(path),
        None => session.save(),
    };
    written.unwrap_or_else(|e| {
        eprintln!("Error writing {}: {}", target.display(), e.message);
        process::exit(1);
    });
    println!("{message}");
    println!("Wrote roster to {}", target.display());
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// Roster commands
// ---------------------------------------------------------------------------

/// Prints views and applies edits. Returns a description of the edit, or
/// `None` when nothing changed.
fn run_roster_command(
    command: &Command,
    session: &mut Session,
    grid: GridDimensions,
) -> Option<String> {
    let message = match command {
        Command::Show { json } => {
            if *json {
                print_json(&render_document_json(session, grid, JsonStyle::CanonicalV1));
            } else {
                print!("{}", render_document_text(session, grid));
            }
            return None;
        }
        Command::Slot { index, json } => {
            let rendered = if *json {
                render_slot_json(session, grid, *index, JsonStyle::CanonicalV1)
                    .map(|value| print_json(&value))
            } else {
                render_slot_text(session, grid, *index).map(|text| print!("{text}"))
            };
            if rendered.is_none() {
                eprintln!(
                    "Slot {index} does not exist ({} slots)",
                    session.slots().len()
                );
                process::exit(1);
            }
            return None;
        }
        Command::Grid => {
            print!("{}", render_grid_text(session, grid));
            return None;
        }
        Command::Param {
            index,
            key,
            value: None,
        } => {
            let params = check(session.character_params(*index), "parameter lookup");
            if key.eq_ignore_ascii_case(STAGE_PARAM_KEY) {
                println!("{}", params.positional.join(", "));
            } else {
                println!("{}", params.get(key).unwrap_or_default());
            }
            return None;
        }
        Command::StageParam {
            index,
            key,
            value: None,
        } => {
            let params = check(session.stage_params(*index), "stage parameter lookup");
            println!("{}", params.get(key).unwrap_or_default());
            return None;
        }

        Command::Set { index, character } => {
            check(session.assign_character(*index, character), "slot edit");
            format!("Slot {index} set to {}", character.trim())
        }
        Command::Random { index } => {
            check(session.set_random(*index), "slot edit");
            format!("Slot {index} set to random select")
        }
        Command::Clear { index } => {
            check(session.clear_slot(*index), "slot edit");
            format!("Slot {index} cleared")
        }
        Command::Params { index, raw } if raw.trim().is_empty() => {
            check(session.clear_params(*index), "parameter edit");
            format!("Slot {index} parameters cleared")
        }
        Command::Params { index, raw } => {
            check(session.set_raw_params(*index, raw), "parameter edit");
            format!("Slot {index} parameters replaced")
        }
        Command::Param {
            index,
            key,
            value: Some(value),
        } => {
            if key.eq_ignore_ascii_case(STAGE_PARAM_KEY) {
                let stages: Vec<String> = value.split(',').map(str::to_string).collect();
                check(session.set_character_stages(*index, &stages), "parameter edit");
            } else {
                check(session.set_character_param(*index, key, value), "parameter edit");
            }
            format!("Slot {index} {key} updated")
        }
        Command::Move { from, to } => {
            check(session.move_slot(*from, *to), "move");
            format!("Slot {from} moved to {to}")
        }
        Command::Swap { a, b } => {
            check(session.swap_slots(*a, *b), "swap");
            format!("Slots {a} and {b} swapped")
        }
        Command::Remove { index } => {
            let removed = check(session.remove_slot(*index), "remove");
            format!(
                "Removed slot {index} ({})",
                removed.primary_character().unwrap_or("empty")
            )
        }
        Command::Trim => {
            let removed = session.truncate_empty_tail();
            format!("Removed {removed} trailing empty slot(s)")
        }
        Command::Group { index, characters } => {
            check(session.make_group(*index, characters), "group edit");
            let count = session.slot(*index).map_or(0, |slot| slot.characters().len());
            format!("Slot {index} is now a group of {count}")
        }
        Command::GroupAdd { index, character } => {
            check(session.add_group_member(*index, character), "group edit");
            format!("Added {} to slot {index}", character.trim())
        }
        Command::GroupRemove { index, member } => {
            let removed = check(session.remove_group_member(*index, *member), "group edit");
            format!("Removed {} from slot {index}", removed.character)
        }
        Command::GroupMove { index, from, to } => {
            check(session.move_group_member(*index, *from, *to), "group edit");
            format!("Slot {index} member {from} moved to {to}")
        }
        Command::Member {
            index,
            member,
            key,
            value,
        } => {
            check(
                session.set_group_member_field(*index, *member, key, value),
                "member edit",
            );
            format!("Slot {index} member {member} {key} updated")
        }
        Command::Ungroup { index } => {
            check(session.convert_to_single(*index), "group edit");
            format!("Slot {index} is now a single character")
        }
        Command::StageAdd { line } => {
            check(session.add_stage(line), "stage edit");
            format!("Added stage {}", line.trim())
        }
        Command::StageRemove { index } => {
            let removed = check(session.remove_stage(*index), "stage edit");
            format!("Removed stage {}", removed.path())
        }
        Command::StagePath { index, path } => {
            check(session.set_stage_path(*index, path), "stage edit");
            format!("Stage {index} path set to {}", path.trim())
        }
        Command::StageParam {
            index,
            key,
            value: Some(value),
        } => {
            check(session.set_stage_param(*index, key, value), "stage edit");
            format!("Stage {index} {key} updated")
        }
        Command::Scan { .. } | Command::Setup { .. } | Command::Config { .. } => return None,
    };
    Some(message)
}

fn check<T>(result: Result<T, CoreError>, action: &str) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("Error applying {action}: {}", e.message);
        process::exit(1);
    })
}

fn print_json(value: &JsonValue) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

// ---------------------------------------------------------------------------
// Paths and settings
// ---------------------------------------------------------------------------

/// `--select`, then `--root`, then the stored roster, then the stored root.
fn resolve_roster(cli: &Cli, config: &AppConfig) -> RosterPaths {
    let select_def = if let Some(select) = &cli.select_def {
        select.clone()
    } else if let Some(root) = &cli.root {
        roster_for_root(root)
    } else if let Some(select) = config.existing_select_def() {
        select.to_path_buf()
    } else if let Some(root) = config.existing_root() {
        roster_for_root(root)
    } else {
        eprintln!("No roster given: pass --select <SELECT.DEF> or --root <DIR>, or run `selectdef setup`");
        process::exit(2);
    };

    let data_dir = select_def
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let root = resolve_root(cli, config).unwrap_or_else(|| root_above(&data_dir));
    RosterPaths {
        root,
        data_dir,
        select_def,
    }
}

/// `--root`; the stored root unless `--select` points elsewhere; otherwise
/// the parent of the roster's directory.
fn resolve_root(cli: &Cli, config: &AppConfig) -> Option<PathBuf> {
    if let Some(root) = &cli.root {
        return Some(root.clone());
    }
    if let Some(select) = &cli.select_def {
        let data_dir = select.parent().unwrap_or_else(|| Path::new("."));
        return Some(root_above(data_dir));
    }
    config.existing_root().map(Path::to_path_buf)
}

fn roster_for_root(root: &Path) -> PathBuf {
    let layout = GameLayout::from_root(root);
    defs::locate_select_def(root, &layout.data_dir.join("system.def"))
}

fn root_above(data_dir: &Path) -> PathBuf {
    data_dir
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn run_scan(cli: &Cli, config: &AppConfig, json: bool) {
    let Some(root) = resolve_root(cli, config) else {
        eprintln!("No game directory given: pass --root <DIR> or run `selectdef setup`");
        process::exit(2);
    };
    let layout = GameLayout::from_root(&root);
    let characters = scan::scan_characters(&layout.chars_dir);
    let stages = scan::scan_stages(&layout.stages_dir);
    tracing::debug!(
        characters = characters.len(),
        stages = stages.len(),
        root = %root.display(),
        "scanned game directory"
    );

    if json {
        print_json(&render_scan_json(&characters, &stages, JsonStyle::CanonicalV1));
    } else {
        print!("{}", render_scan_text(&characters, &stages));
    }
}

fn run_setup(cli: &Cli, store: &ConfigStore, mut config: AppConfig, system: Option<&Path>) {
    let (root, system_def) = match (system, &cli.root) {
        (Some(system), _) => {
            let data_dir = system.parent().unwrap_or_else(|| Path::new("."));
            (root_above(data_dir), system.to_path_buf())
        }
        (None, Some(root)) => (root.clone(), GameLayout::from_root(root).data_dir.join("system.def")),
        (None, None) => {
            eprintln!("setup requires --system <SYSTEM.DEF> or --root <DIR>");
            process::exit(2);
        }
    };

    let select_def = match &cli.select_def {
        Some(select) => select.clone(),
        None => defs::locate_select_def(&root, &system_def),
    };
    if !select_def.is_file() {
        eprintln!("Could not find select.def at {}", select_def.display());
        process::exit(1);
    }

    config.paths.root = Some(root.clone());
    config.paths.select_def = Some(select_def.clone());
    let saved = store.save(&config).unwrap_or_else(|e| {
        eprintln!("Error saving settings: {}", e.message);
        process::exit(1);
    });
    println!("root={}", root.display());
    println!("select_def={}", select_def.display());
    println!("Saved settings to {}", saved.display());
}

fn run_config(
    store: &ConfigStore,
    mut config: AppConfig,
    backup: Option<bool>,
    use_local: Option<bool>,
) {
    if backup.is_some() || use_local.is_some() {
        if let Some(backup) = backup {
            config.options.backup = backup;
        }
        if let Some(use_local) = use_local {
            config.options.use_local = use_local;
        }
        let saved = store.save(&config).unwrap_or_else(|e| {
            eprintln!("Error saving settings: {}", e.message);
            process::exit(1);
        });
        println!("Saved settings to {}", saved.display());
    }

    println!("root={}", display_optional(config.paths.root.as_deref()));
    println!(
        "select_def={}",
        display_optional(config.paths.select_def.as_deref())
    );
    println!("backup={}", config.options.backup);
    println!("use_local={}", config.options.use_local);
}

fn display_optional(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}
