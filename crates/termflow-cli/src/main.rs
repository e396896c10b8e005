use clap::Parser as ClapParser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use termflow::report::{format_dataflow, format_fsm_candidates, format_loops, format_report};
use termflow::{AnalysisConfig, Dataflow, fsm_candidates, register_loops};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(
    name = "termflow",
    about = "Report which terminal bits drive every bit of every register"
)]
struct Cli {
    /// Dataflow dump (JSON) written by the extractor
    dump: PathBuf,

    /// Only analyze signals under this hierarchical scope
    #[arg(long)]
    top: Option<String>,

    /// Extra keyword for state-machine detection (repeatable)
    #[arg(long = "search", value_name = "KEYWORD")]
    search: Vec<String>,

    /// TOML file with analysis settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analyze the constant-resolved binds instead of the raw ones
    #[arg(long)]
    resolved: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Print the term and bind tables before the analysis
    #[arg(long)]
    print_dataflow: bool,

    /// Report register loops and state-machine candidates
    #[arg(long)]
    loops: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path).into_diagnostic()?,
        None => AnalysisConfig::default(),
    };
    let dataflow = Dataflow::load(&cli.dump).into_diagnostic()?;
    // --top wins over the config file, which wins over the dump.
    if cli.top.is_some() {
        config.top_module = cli.top.clone();
    } else if config.top_module.is_none() {
        config.top_module = dataflow.top_module.clone();
    }
    config.search_targets.extend(cli.search.iter().cloned());

    let (design, report) = if cli.resolved {
        (&dataflow.resolved, dataflow.analyze_resolved(&config))
    } else {
        (&dataflow.raw, dataflow.analyze_raw(&config))
    };
    log::info!(
        "{} driven bits, {} skipped signals, {} failed signals",
        report.maps.drivers_of().len(),
        report.skipped.len(),
        report.failures.len()
    );

    let loops = if cli.loops {
        register_loops(design, &report.maps)
    } else {
        Vec::new()
    };
    let candidates = fsm_candidates(&loops, &config);

    if cli.json {
        let mut output = serde_json::json!({ "report": report });
        if cli.loops {
            output["loops"] = serde_json::json!(loops);
            output["fsm_candidates"] = serde_json::json!(candidates);
        }
        let json = serde_json::to_string_pretty(&output).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    if cli.print_dataflow {
        print!("{}", format_dataflow(design));
    }
    print!("{}", format_report(&report));
    if cli.loops {
        print!("{}", format_loops(&loops));
        print!("{}", format_fsm_candidates(&candidates));
    }
    Ok(())
}
