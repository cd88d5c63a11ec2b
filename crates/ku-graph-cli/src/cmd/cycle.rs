//! `kugraph cycle`: report one dependency cycle, if the graph has any.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ku_graph::{CycleReport, find_cycle};
use serde::Serialize;

use crate::manifest::Manifest;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `kugraph cycle`.
#[derive(Args, Debug)]
pub struct CycleArgs {
    /// Manifest file (TOML, or JSON with a `.json` extension).
    pub manifest: PathBuf,
}

#[derive(Debug, Serialize)]
struct CycleOutput {
    acyclic: bool,
    cycle: Option<CycleReport<String, String>>,
}

/// Execute `kugraph cycle`. Exits non-zero when a cycle is found.
pub fn run_cycle(args: &CycleArgs, output: OutputMode) -> anyhow::Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let table = manifest.table()?;

    let cycle = find_cycle(&table);
    let len = cycle.as_ref().map_or(0, ku_graph::Cycle::len);
    let payload = CycleOutput {
        acyclic: cycle.is_none(),
        cycle: cycle.map(|c| c.attach(|from, to| manifest.site_of(from, to).to_string())),
    };

    render_mode(output, &payload, render_cycle_text, render_cycle_pretty)?;
    if !payload.acyclic {
        anyhow::bail!("dependency cycle of {len} entities");
    }
    Ok(())
}

fn render_cycle_text(payload: &CycleOutput, w: &mut dyn Write) -> std::io::Result<()> {
    match &payload.cycle {
        Some(report) => writeln!(w, "{report}"),
        None => writeln!(w, "acyclic"),
    }
}

fn render_cycle_pretty(payload: &CycleOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let Some(report) = &payload.cycle else {
        return pretty_kv(w, "Status", "acyclic");
    };
    pretty_kv(w, "Status", "cycle")?;
    writeln!(w)?;
    pretty_section(w, &format!("Links ({})", report.links.len()))?;
    for link in &report.links {
        writeln!(w, "  {}", link.site)?;
        writeln!(w, "      {} imports {}", link.from, link.to)?;
    }
    Ok(())
}
