//! `kugraph resolve`: rank a manifest's entities into cohorts.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ku_graph::{CohortEntry, Mode, ResolutionStats};
use serde::Serialize;
use tracing::info;

use crate::cmd::graph_failure;
use crate::manifest::Manifest;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `kugraph resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Manifest file (TOML, or JSON with a `.json` extension).
    pub manifest: PathBuf,

    /// Override the manifest's mode (`ranking` or `strict-acyclic`).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<Mode>,

    /// Reject entities that depend on themselves.
    #[arg(long)]
    pub check_self_loops: bool,
}

#[derive(Debug, Serialize)]
struct ResolveOutput {
    mode: Mode,
    stats: ResolutionStats,
    cohorts: Vec<Vec<CohortEntry<String>>>,
    clusters: Vec<Vec<String>>,
    self_loops: Vec<String>,
}

/// Execute `kugraph resolve`.
pub fn run_resolve(args: &ResolveArgs, output: OutputMode) -> anyhow::Result<()> {
    let manifest = Manifest::load(&args.manifest)?;

    let mut options = manifest.settings;
    if let Some(mode) = args.mode {
        options.mode = mode;
    }
    options.check_self_loops |= args.check_self_loops;

    let resolution = match manifest.resolver(options)?.resolve() {
        Ok(resolution) => resolution,
        Err(err) => return graph_failure(output, &manifest, &err),
    };

    let payload = ResolveOutput {
        mode: options.mode,
        stats: resolution.stats(),
        cohorts: resolution.cohort_entries(),
        clusters: resolution.clusters(),
        self_loops: resolution.self_loops().cloned().collect(),
    };
    info!(
        cohorts = payload.stats.cohorts,
        clusters = payload.stats.clusters,
        "graph resolved"
    );

    render_mode(output, &payload, render_resolve_text, render_resolve_pretty)
}

fn entry_label(entry: &CohortEntry<String>) -> String {
    match entry {
        CohortEntry::Entity(id) => id.clone(),
        CohortEntry::Cluster(members) => format!("{{{}}}", members.join(",")),
    }
}

fn cohort_line(cohort: &[CohortEntry<String>]) -> String {
    cohort.iter().map(entry_label).collect::<Vec<_>>().join(" ")
}

fn render_resolve_text(payload: &ResolveOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for (rank, cohort) in payload.cohorts.iter().enumerate() {
        writeln!(w, "{rank}\t{}", cohort_line(cohort))?;
    }
    Ok(())
}

fn render_resolve_pretty(payload: &ResolveOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let stats = &payload.stats;
    pretty_kv(w, "Mode", payload.mode.as_str())?;
    pretty_kv(w, "Entities", stats.nodes.to_string())?;
    pretty_kv(w, "Edges", stats.edges.to_string())?;
    pretty_kv(
        w,
        "Components",
        format!("{} (+{} isolated)", stats.components, stats.isolated),
    )?;
    writeln!(w)?;

    pretty_section(w, &format!("Cohorts ({})", payload.cohorts.len()))?;
    for (rank, cohort) in payload.cohorts.iter().enumerate() {
        writeln!(w, "  {rank:>3}  {}", cohort_line(cohort))?;
    }

    if !payload.clusters.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Clusters ({})", payload.clusters.len()))?;
        for cluster in &payload.clusters {
            writeln!(w, "  {}", cluster.join(", "))?;
        }
    }

    if !payload.self_loops.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Self loops")?;
        for id in &payload.self_loops {
            writeln!(w, "  {id}")?;
        }
    }
    Ok(())
}
