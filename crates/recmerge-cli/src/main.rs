use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use recmerge_core::config::Settings;
use recmerge_core::handler::{HandlerRegistry, MergeOrder};
use recmerge_core::logging::{init_logging, log_directory};
use recmerge_engine::{ChangeAndConflictAccumulator, ChangeReport, Conflict, Identity, Winner};
use recmerge_xml::RecordFileHandler;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "recmerge",
    about = "Record-aware three-way merge driver for version-controlled data files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to .recmerge data directory
    #[arg(long, global = true, default_value = ".recmerge")]
    data_dir: PathBuf,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Three-way merge; the result overwrites <OURS>
    Merge {
        ours: PathBuf,
        theirs: PathBuf,
        ancestor: PathBuf,
    },
    /// List records added, deleted or changed between two snapshots
    Diff { parent: PathBuf, child: PathBuf },
    /// Show each change between two snapshots in detail
    Present { parent: PathBuf, child: PathBuf },
    /// Show which handler would take a file
    Handlers { path: PathBuf },
    /// Run interactive setup wizard
    Setup,
    /// Show the effective configuration
    Status,
}

/// Envelope for `--json` output.
#[derive(Serialize)]
struct JsonReport<T: Serialize> {
    generated_at: DateTime<Utc>,
    command: &'static str,
    #[serde(flatten)]
    body: T,
}

fn print_json<T: Serialize>(command: &'static str, body: T) -> anyhow::Result<()> {
    let report = JsonReport {
        generated_at: Utc::now(),
        command,
        body,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn settings_path(cli: &Cli) -> PathBuf {
    cli.data_dir.join("settings.json")
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    Settings::load_or_default(&settings_path(cli))
}

fn registry(settings: &Settings) -> HandlerRegistry {
    HandlerRegistry::new().with_handler(Box::new(RecordFileHandler::new(settings.clone())))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Setup => cmd_setup(&cli),
        Commands::Status => cmd_status(&cli),
        Commands::Handlers { path } => cmd_handlers(&cli, path),
        Commands::Merge {
            ours,
            theirs,
            ancestor,
        } => cmd_merge(&cli, ours, theirs, ancestor),
        Commands::Diff { parent, child } => cmd_diff(&cli, parent, child),
        Commands::Present { parent, child } => cmd_present(&cli, parent, child),
    }
}

fn cmd_merge(cli: &Cli, ours: &Path, theirs: &Path, ancestor: &Path) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;
    let _guard = init_logging(&cli.data_dir, &settings.logging)?;

    let registry = registry(&settings);
    let handler = registry.handler_for_merging(ours);
    tracing::info!(handler = handler.name(), ours = %ours.display(), "merge requested");

    let order = MergeOrder::new(ours, theirs, ancestor);
    let mut acc = ChangeAndConflictAccumulator::new();
    handler.do_merge(&order, &mut acc)?;

    // Conflicts are resolved in the output; the exit status stays 0.
    if cli.json {
        #[derive(Serialize)]
        struct Body<'a> {
            handler: &'a str,
            merged: &'a Path,
            conflicts: &'a [Conflict],
        }
        return print_json(
            "merge",
            Body {
                handler: handler.name(),
                merged: ours,
                conflicts: &acc.conflicts,
            },
        );
    }

    let policy = settings.merge.policy();
    for conflict in &acc.conflicts {
        println!("CONFLICT {} ({})", conflict.kind, conflict.guid);
        println!("  {}", policy.render(conflict));
    }
    println!(
        "Merged {} with handler '{}': {} conflict(s)",
        ours.display(),
        handler.name(),
        acc.conflicts.len()
    );
    Ok(())
}

/// Run the diff handler for `child` and return the reports in order.
fn collect_changes(
    registry: &HandlerRegistry,
    parent: &Path,
    child: &Path,
) -> anyhow::Result<Vec<ChangeReport>> {
    let handler = registry.handler_for_diff(child);
    tracing::info!(handler = handler.name(), child = %child.display(), "diff requested");
    let mut acc = ChangeAndConflictAccumulator::new();
    handler.diff(parent, child, &mut acc)?;
    Ok(acc.changes)
}

fn change_line(report: &ChangeReport, identity: &dyn Identity) -> String {
    match report.record_id(identity) {
        Some(id) => format!("{:<8} {} {}", report.action_label(), id, report.description()),
        None => format!("{:<8} {}", report.action_label(), report.description()),
    }
}

fn cmd_diff(cli: &Cli, parent: &Path, child: &Path) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;
    let _guard = init_logging(&cli.data_dir, &settings.logging)?;

    let changes = collect_changes(&registry(&settings), parent, child)?;

    if cli.json {
        #[derive(Serialize)]
        struct Body<'a> {
            changes: &'a [ChangeReport],
        }
        return print_json("diff", Body { changes: &changes });
    }

    let identity = settings.records.identity();
    for report in &changes {
        println!("{}", change_line(report, &identity));
    }
    if changes.is_empty() {
        println!("No record changes.");
    }
    Ok(())
}

fn cmd_present(cli: &Cli, parent: &Path, child: &Path) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;
    let _guard = init_logging(&cli.data_dir, &settings.logging)?;

    let registry = registry(&settings);
    let changes = collect_changes(&registry, parent, child)?;
    let presenter = registry.handler_for_presentation(child);

    let mut rendered = Vec::with_capacity(changes.len());
    for report in &changes {
        rendered.push(presenter.present(report)?);
    }

    if cli.json {
        #[derive(Serialize)]
        struct Body<'a> {
            presenter: &'a str,
            presentations: &'a [String],
        }
        return print_json(
            "present",
            Body {
                presenter: presenter.name(),
                presentations: &rendered,
            },
        );
    }

    for text in &rendered {
        println!("{}", text);
        println!();
    }
    Ok(())
}

fn cmd_handlers(cli: &Cli, path: &Path) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;
    let registry = registry(&settings);

    let merge = registry.handler_for_merging(path).name();
    let diff = registry.handler_for_diff(path).name();
    let present = registry.handler_for_presentation(path).name();

    if cli.json {
        #[derive(Serialize)]
        struct Body<'a> {
            path: &'a Path,
            registered: Vec<&'a str>,
            merge: &'a str,
            diff: &'a str,
            present: &'a str,
        }
        return print_json(
            "handlers",
            Body {
                path,
                registered: registry.names(),
                merge,
                diff,
                present,
            },
        );
    }

    println!("Registered: {:?}", registry.names());
    println!("{}", path.display());
    println!("  merge:   {}", merge);
    println!("  diff:    {}", diff);
    println!("  present: {}", present);
    Ok(())
}

fn cmd_setup(cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.data_dir)?;
    let mut settings = load_settings(cli)?;

    println!();
    println!("recmerge - Setup Wizard");
    println!("=======================");
    println!();

    settings.records.record_element = dialoguer::Input::<String>::new()
        .with_prompt("Record element name")
        .default(settings.records.record_element.clone())
        .interact_text()?;

    let identity: String = dialoguer::Input::new()
        .with_prompt("Identity attributes (comma separated, first present wins)")
        .default(settings.records.identity_attributes.join(","))
        .interact_text()?;
    settings.records.identity_attributes = split_list(&identity);

    settings.records.tombstone_attribute = dialoguer::Input::<String>::new()
        .with_prompt("Tombstone attribute")
        .default(settings.records.tombstone_attribute.clone())
        .interact_text()?;

    let extensions: String = dialoguer::Input::new()
        .with_prompt("File extensions to handle (comma separated)")
        .default(settings.records.extensions.join(","))
        .interact_text()?;
    settings.records.extensions = split_list(&extensions);

    println!();
    let sides = ["ours", "theirs"];
    let current = match settings.merge.default_winner {
        Winner::Ours => 0,
        Winner::Theirs => 1,
    };
    let side = dialoguer::Select::new()
        .with_prompt("Side kept when both sides edited the same value")
        .items(&sides)
        .default(current)
        .interact()?;
    settings.merge.default_winner = if side == 0 { Winner::Ours } else { Winner::Theirs };

    println!();
    settings.logging.filter = dialoguer::Input::<String>::new()
        .with_prompt("Log filter")
        .default(settings.logging.filter.clone())
        .interact_text()?;

    let path = settings_path(cli);
    settings.save(&path)?;

    println!();
    println!("Configuration saved to {}", path.display());
    println!();
    println!("To use recmerge as a git merge driver, add to .git/config:");
    println!("  [merge \"recmerge\"]");
    println!("      driver = recmerge merge %A %B %O");
    println!("and to .gitattributes:");
    for ext in &settings.records.extensions {
        println!("  *.{} merge=recmerge", ext);
    }

    Ok(())
}

fn cmd_status(cli: &Cli) -> anyhow::Result<()> {
    let path = settings_path(cli);
    let found = path.exists();
    let settings = load_settings(cli)?;

    if cli.json {
        #[derive(Serialize)]
        struct Body<'a> {
            settings_path: &'a Path,
            found: bool,
            settings: &'a Settings,
            handlers: Vec<&'a str>,
        }
        let registry = registry(&settings);
        return print_json(
            "status",
            Body {
                settings_path: &path,
                found,
                settings: &settings,
                handlers: registry.names(),
            },
        );
    }

    println!("recmerge Status");
    println!("===============");
    println!();
    if found {
        println!("Configuration: Found ({})", path.display());
    } else {
        println!("Configuration: Not found, using defaults");
        println!("  Run 'recmerge setup' to configure");
    }
    println!("  Record element: {}", settings.records.record_element);
    println!("  Identity attributes: {:?}", settings.records.identity_attributes);
    println!("  Tombstone attribute: {}", settings.records.tombstone_attribute);
    println!("  Extensions: {:?}", settings.records.extensions);
    println!("  Default winner: {}", settings.merge.default_winner);
    println!(
        "  Logging: {} ({})",
        log_directory(&cli.data_dir, &settings.logging).display(),
        settings.logging.filter
    );

    Ok(())
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
