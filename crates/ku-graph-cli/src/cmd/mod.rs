//! Command handlers, one module per subcommand.

pub mod cycle;
pub mod prune;
pub mod resolve;

use ku_graph::GraphError;

use crate::manifest::Manifest;
use crate::output::{CliError, OutputMode, render_error};

/// Report a graph error on stderr and turn it into a command failure.
///
/// Cycles are listed link by link, with each link's source location taken
/// from the manifest.
pub fn graph_failure(
    output: OutputMode,
    manifest: &Manifest,
    err: &GraphError<String>,
) -> anyhow::Result<()> {
    let mut cli_error = CliError::from(err);
    if let Some(cycle) = err.cycle() {
        cli_error.message = format!("dependency cycle detected: {cycle}");
        cli_error.details = cycle
            .attach(|from, to| manifest.site_of(from, to).to_string())
            .links
            .iter()
            .map(|link| format!("{}: {} imports {}", link.site, link.from, link.to))
            .collect();
    }
    render_error(output, &cli_error)?;
    anyhow::bail!("{} {}", err.code(), err.code().message())
}
