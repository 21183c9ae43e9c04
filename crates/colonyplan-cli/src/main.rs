//! colonyplan CLI - headless harness for the build-queue planner.
//!
//! - `colonyplan check` - load and validate a catalog
//! - `colonyplan classify` - print what a colony can build
//! - `colonyplan plan` - replay a queue-edit script

mod script;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use colonyplan_core::{
    load_catalog, Catalog, ColonySnapshot, PlannerConfig, PlannerSession, RawColonySnapshot,
    RulesSource,
};
use colonyplan_protocol::{Classification, ItemTypeId, QueueEntryView, Verdict};

use crate::script::{resolve, Script};

#[derive(Parser)]
#[command(name = "colonyplan")]
#[command(about = "Colony build-queue planner", version)]
struct Cli {
    /// Rules directory holding structures.yaml and units.yaml (embedded base rules if omitted)
    #[arg(short, long, global = true)]
    rules: Option<PathBuf>,

    /// Planner configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a catalog
    Check,

    /// Classify every item against a colony snapshot
    Classify {
        /// Colony snapshot (YAML)
        #[arg(long)]
        colony: PathBuf,

        /// Items already queued, in order
        #[arg(long, value_delimiter = ',')]
        queue: Vec<String>,
    },

    /// Replay a queue-edit script against a colony snapshot
    Plan {
        /// Colony snapshot (YAML)
        #[arg(long)]
        colony: PathBuf,

        /// Edit script (YAML)
        #[arg(long)]
        script: PathBuf,

        /// Print the committed queue as JSON instead of the annotated listing
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = PlannerConfig::load_or_default(cli.config.as_deref())?;
    let catalog = load_rules(cli.rules.as_deref())?;

    match cli.command {
        Commands::Check => check(&catalog),
        Commands::Classify { colony, queue } => classify(&catalog, config, &colony, &queue),
        Commands::Plan {
            colony,
            script,
            json,
        } => plan(&catalog, config, &colony, &script, json),
    }
}

fn load_rules(dir: Option<&Path>) -> Result<Catalog> {
    match dir {
        Some(dir) => load_catalog(RulesSource::Path(dir.to_path_buf()))
            .with_context(|| format!("Failed to load rules from {}", dir.display())),
        None => load_catalog(RulesSource::Embedded).context("Failed to load embedded rules"),
    }
}

fn load_colony(path: &Path, catalog: &Catalog) -> Result<ColonySnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read colony from {}", path.display()))?;
    let raw: RawColonySnapshot = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse colony from {}", path.display()))?;
    ColonySnapshot::compile(raw, catalog)
        .with_context(|| format!("Invalid colony snapshot {}", path.display()))
}

fn check(catalog: &Catalog) -> Result<()> {
    let structures = catalog.structures().count();
    let free = catalog
        .structures()
        .filter(|&id| catalog.item(id).is_free())
        .count();
    let units = catalog.units().count();

    println!("catalog {:016x}", catalog.catalog_hash);
    println!("  structures   {structures} ({free} free)");
    println!("  units        {units}");
    println!("  capabilities {}", catalog.capabilities.len());
    println!("  resources    {}", catalog.resources.len());
    Ok(())
}

fn classify(
    catalog: &Catalog,
    config: PlannerConfig,
    colony_path: &Path,
    queue: &[String],
) -> Result<()> {
    let colony = load_colony(colony_path, catalog)?;
    let mut session = PlannerSession::new(catalog, config);
    for data_id in queue {
        let item = resolve(catalog, data_id)?;
        let end = session.queue().len();
        session.insert(&colony, item, end).map_err(|err| {
            anyhow::anyhow!("Cannot queue {data_id}: {}", catalog.describe_refusal(&err))
        })?;
    }

    let classification = session.recompute(&colony).clone();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    print_classification(&mut out, catalog, &classification)?;
    if !session.queue().is_empty() {
        writeln!(out)?;
        print_entries(&mut out, catalog, &session.entries(&colony))?;
    }
    Ok(())
}

fn plan(
    catalog: &Catalog,
    config: PlannerConfig,
    colony_path: &Path,
    script_path: &Path,
    json: bool,
) -> Result<()> {
    let mut colony = load_colony(colony_path, catalog)?;
    let script = Script::load(script_path)?;
    let mut session = PlannerSession::new(catalog, config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if json {
        // Keep stdout clean for the JSON document.
        script.replay(&mut session, &mut colony, &mut std::io::sink())?;
        let committed = session.commit();
        serde_json::to_writer_pretty(&mut out, &committed)?;
        writeln!(out)?;
        return Ok(());
    }

    script.replay(&mut session, &mut colony, &mut out)?;
    writeln!(out)?;
    print_entries(&mut out, catalog, &session.entries(&colony))?;
    let committed = session.commit();
    tracing::info!(
        hash = committed.catalog_hash,
        entries = committed.items.len(),
        "plan finished"
    );
    Ok(())
}

fn print_classification(
    out: &mut impl Write,
    catalog: &Catalog,
    classification: &Classification,
) -> Result<()> {
    let sections: [(&str, fn(&Verdict) -> bool); 4] = [
        ("available", Verdict::is_available),
        ("locked", Verdict::is_locked),
        ("infeasible", Verdict::is_infeasible),
        ("satisfied", |v| matches!(v, Verdict::Satisfied)),
    ];

    for (title, pred) in sections {
        let items: Vec<(ItemTypeId, &Verdict)> = catalog
            .evaluation_order()
            .iter()
            .filter_map(|&id| classification.verdict(id).map(|v| (id, v)))
            .filter(|(_, v)| pred(v))
            .collect();
        writeln!(out, "{title} ({}):", items.len())?;
        for (id, verdict) in items {
            let item = catalog.item(id);
            match verdict.blocker() {
                Some(blocker) => writeln!(
                    out,
                    "  {:<22} {}",
                    item.data_id,
                    catalog.describe(blocker)
                )?,
                None => writeln!(out, "  {:<22} {}", item.data_id, item.name)?,
            }
        }
    }
    Ok(())
}

fn print_entries(
    out: &mut impl Write,
    catalog: &Catalog,
    entries: &[QueueEntryView],
) -> Result<()> {
    writeln!(out, "queue ({}):", entries.len())?;
    for entry in entries {
        let item = catalog.item(entry.item);
        match &entry.blocker {
            Some(blocker) => writeln!(
                out,
                "  {:>3}  {:<22} locked: {}",
                entry.index,
                item.data_id,
                catalog.describe(blocker)
            )?,
            None => writeln!(out, "  {:>3}  {}", entry.index, item.data_id)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        load_catalog(RulesSource::Embedded).unwrap()
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "colonyplan",
            "classify",
            "--colony",
            "colony.yaml",
            "--queue",
            "docks,caravel",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Classify { colony, queue } => {
                assert_eq!(colony, PathBuf::from("colony.yaml"));
                assert_eq!(queue, vec!["docks".to_string(), "caravel".to_string()]);
            }
            _ => panic!("expected classify"),
        }
    }

    #[test]
    fn load_colony_reports_unknown_structures() {
        let catalog = catalog();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "population: 3\nstructures: [observatory]").unwrap();

        let err = load_colony(file.path(), &catalog).unwrap_err();
        assert!(format!("{err:#}").contains("observatory"));
    }

    #[test]
    fn classification_listing_has_every_section() {
        let catalog = catalog();
        let mut colony = ColonySnapshot::new(4);
        colony.set_capability(catalog.capability_id("coastal").unwrap(), true);
        let mut session = PlannerSession::new(&catalog, PlannerConfig::default());
        let classification = session.recompute(&colony).clone();

        let mut out = Vec::new();
        print_classification(&mut out, &catalog, &classification).unwrap();
        let text = String::from_utf8(out).unwrap();
        for title in ["available (", "locked (", "infeasible (", "satisfied ("] {
            assert!(text.contains(title), "missing {title} in:\n{text}");
        }
        assert!(text.contains("custom_house"));
    }
}
