use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cadena::arch::ArchitectureDoc;
use cadena::cli::{AnalysisOpts, Cli, Command};
use cadena::config::AnalysisConfig;
use cadena::correlation::correlate;
use cadena::model::{Application, PathRef};
use cadena::stats::DisplayConfig;
use cadena::trace_event::Trace;
use cadena::{dot_output, flame_output, json_output};

/// Initialize the tracing subscriber on stderr. `RUST_LOG` wins when set;
/// otherwise `-v` raises the default level to debug.
fn init_tracing(verbose: bool) {
    let default = if verbose { "cadena=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn to_config(opts: &AnalysisOpts) -> Result<AnalysisConfig> {
    opts.to_config()
        .map_err(|msg| anyhow::anyhow!("invalid analysis options: {msg}"))
}

fn build_application(arch: &Path, config: &AnalysisConfig) -> Result<Application> {
    let doc = ArchitectureDoc::load(arch)?;
    let app = Application::from_architecture(&doc, &config.ignore_topics)?;
    Ok(app)
}

/// Correlate the trace, trim transients and attach per-edge statistics.
fn analyze_application(
    app: &mut Application,
    trace_path: &Path,
    config: &AnalysisConfig,
) -> Result<()> {
    let trace = Trace::load(trace_path)?;
    correlate(app, &trace)?;
    if !config.transient.is_noop() {
        match trace.span_ms() {
            Some(span) => {
                config.transient.apply(app, span);
            }
            None => tracing::warn!("trace has no events, transient window ignored"),
        }
    }
    app.attach_statistics(config.bin_width_ms, config.max_bins)
}

fn find_named_path(app: &Application, name: &str) -> Result<PathRef> {
    app.find_path(name).ok_or_else(|| {
        anyhow::anyhow!("no path named '{name}'; `cadena paths` lists the derived names")
    })
}

fn run_paths(arch: &Path, opts: &AnalysisOpts) -> Result<()> {
    let config = to_config(opts)?;
    let app = build_application(arch, &config)?;
    for name in app.path_names() {
        println!("{name}");
    }
    Ok(())
}

fn run_analyze(
    arch: &Path,
    trace: &Path,
    out: Option<PathBuf>,
    path: Option<String>,
    normalize: bool,
    opts: &AnalysisOpts,
) -> Result<()> {
    let config = to_config(opts)?;
    let mut app = build_application(arch, &config)?;
    analyze_application(&mut app, trace, &config)?;

    let paths = match path.as_deref() {
        Some(name) => vec![find_named_path(&app, name)?],
        None => app.all_paths(),
    };
    let display = DisplayConfig { normalize };
    match out {
        Some(out) if out.is_dir() => {
            json_output::write_split_reports(&app, config.bin_width_ms, &display, &paths, &out)
        }
        Some(out) => {
            let report = json_output::build_report(&app, config.bin_width_ms, &display, &paths)?;
            json_output::write_report(&report, &out)
        }
        None => {
            let report = json_output::build_report(&app, config.bin_width_ms, &display, &paths)?;
            println!("{}", report.to_json()?);
            Ok(())
        }
    }
}

fn run_graph(
    arch: &Path,
    out: Option<PathBuf>,
    export_arch: Option<PathBuf>,
    opts: &AnalysisOpts,
) -> Result<()> {
    let config = to_config(opts)?;
    let app = build_application(arch, &config)?;
    if let Some(export) = export_arch {
        app.describe().save(&export)?;
    }
    match out {
        Some(out) => dot_output::write_graph(&app, &out),
        None => {
            print!("{}", dot_output::render(&app));
            Ok(())
        }
    }
}

fn run_flame(
    arch: &Path,
    trace: &Path,
    path: &str,
    out: Option<PathBuf>,
    opts: &AnalysisOpts,
) -> Result<()> {
    let config = to_config(opts)?;
    let mut app = build_application(arch, &config)?;
    analyze_application(&mut app, trace, &config)?;

    let path_ref = find_named_path(&app, path)?;
    match out {
        Some(out) => flame_output::write_flame(&app, path_ref, &out),
        None => {
            print!("{}", flame_output::collapse(&app, path_ref)?);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Paths { arch, opts } => run_paths(&arch, &opts),
        Command::Analyze {
            arch,
            trace,
            out,
            path,
            normalize,
            opts,
        } => run_analyze(&arch, &trace, out, path, normalize, &opts),
        Command::Graph {
            arch,
            out,
            export_arch,
            opts,
        } => run_graph(&arch, out, export_arch, &opts),
        Command::Flame {
            arch,
            trace,
            path,
            out,
            opts,
        } => run_flame(&arch, &trace, &path, out, &opts),
    }
}
