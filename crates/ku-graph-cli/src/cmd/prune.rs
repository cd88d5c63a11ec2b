//! `kugraph prune`: list entities that later phases can skip.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ku_graph::{Mode, Prunable, ResolveOptions, prune_unreachable};
use serde::Serialize;
use tracing::info;

use crate::cmd::graph_failure;
use crate::manifest::Manifest;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `kugraph prune`.
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Manifest file (TOML, or JSON with a `.json` extension).
    pub manifest: PathBuf,

    /// Keep only what the public entities transitively depend on, instead
    /// of dropping whole components without a public entity.
    #[arg(long)]
    pub reachable: bool,

    /// Extra public entity ids, on top of those marked in the manifest.
    #[arg(long = "public", value_name = "ID")]
    pub public: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PruneOutput {
    strategy: &'static str,
    public: Vec<String>,
    prunable: Prunable<String>,
}

/// Execute `kugraph prune`.
pub fn run_prune(args: &PruneArgs, output: OutputMode) -> anyhow::Result<()> {
    let manifest = Manifest::load(&args.manifest)?;

    let mut public = manifest.public();
    public.extend(args.public.iter().cloned());
    let mut public_sorted: Vec<String> = public.iter().cloned().collect();
    public_sorted.sort_unstable();

    let (strategy, prunable) = if args.reachable {
        let table = manifest.table()?;
        ("reachable", prune_unreachable(&table, &public_sorted))
    } else {
        // Ranking mode never fails on cycles; only construction errors remain.
        let options = ResolveOptions {
            mode: Mode::Ranking,
            check_self_loops: false,
        };
        match manifest.resolver(options)?.resolve() {
            Ok(resolution) => ("private", resolution.prune(&public)),
            Err(err) => return graph_failure(output, &manifest, &err),
        }
    };
    info!(strategy, prunable = prunable.len(), "prune complete");

    let payload = PruneOutput {
        strategy,
        public: public_sorted,
        prunable,
    };
    render_mode(output, &payload, render_prune_text, render_prune_pretty)
}

fn render_prune_text(payload: &PruneOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for entity in &payload.prunable.entities {
        writeln!(w, "{entity}")?;
    }
    Ok(())
}

fn render_prune_pretty(payload: &PruneOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "Strategy", payload.strategy)?;
    pretty_kv(w, "Public", payload.public.join(", "))?;
    writeln!(w)?;
    pretty_section(w, &format!("Prunable ({})", payload.prunable.len()))?;
    for entity in &payload.prunable.entities {
        writeln!(w, "  {entity}")?;
    }
    Ok(())
}
