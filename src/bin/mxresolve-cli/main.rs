mod args;
mod output;

use anyhow::{Context, Result};
use mxresolve_lib::{FailureKind, LocalAddresses, ResolvedSet, resolve};
use tracing_subscriber::EnvFilter;

use args::Cli;

// codes de sortie façon qmail-remote : 0 OK, 100 permanent, 111 temporaire
const EXIT_PERMANENT: i32 = 100;
const EXIT_TEMPORARY: i32 = 111;

fn exit_code(kind: FailureKind) -> i32 {
    match kind {
        FailureKind::Permanent => EXIT_PERMANENT,
        FailureKind::Temporary | FailureKind::Internal => EXIT_TEMPORARY,
    }
}

/// Message et code de sortie quand le résultat ne permet aucune livraison.
fn undeliverable(set: &ResolvedSet) -> Option<(&'static str, i32)> {
    if set.exchanger_count() == 0 {
        Some(("No suitable MX found for remote host", EXIT_PERMANENT))
    } else if set.is_empty() {
        Some(("No suitable IP addresses for the MX", EXIT_PERMANENT))
    } else {
        None
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let local = match &cli.ipme {
        Some(path) => LocalAddresses::from_file(path)
            .with_context(|| format!("read {}", path.display()))?,
        None => LocalAddresses::new(),
    };

    let set = match resolve(&cli.host, &cli.addresses, &local, &cli.options()) {
        Ok(set) => set,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(exit_code(err.kind()));
        }
    };

    output::print(&output::Report::new(&cli.host, &set), &cli.format)?;

    if let Some((message, code)) = undeliverable(&set) {
        eprintln!("{message}");
        std::process::exit(code);
    }
    Ok(())
}
