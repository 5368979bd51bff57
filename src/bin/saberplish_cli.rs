use anyhow::{anyhow, bail, Context, Result};
use saberplish::{
    about,
    assembly::{draw_complex, ReportParams, SaberPlishDesign, COMPLEX_NAMES},
    build_probe,
    config::{parse_request, ProbeRequest, ReportRequest},
    report,
    sweep::{run_sweep, write_csv_path, SweepConfig},
    thermo::NearestNeighborSolver,
    ProbeParams,
};
use serde::Serialize;
use std::{env, fs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Serialize)]
struct Capabilities {
    commands: Vec<&'static str>,
    complexes: [&'static str; 4],
    probe_defaults: ProbeParams,
    report_defaults: ReportParams,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  saberplish_cli --version\n  \
  saberplish_cli [-v] capabilities\n  \
  saberplish_cli [-v] probe '<request-json>'\n  \
  saberplish_cli [-v] report '<request-json>'\n  \
  saberplish_cli [-v] sweep '<sweep-json>' [--csv PATH]\n  \
  saberplish_cli [-v] render '<request-json>' c3|c3L|bc1|bc2 OUTPUT.svg\n\n  \
  Tip: pass @file.json instead of inline JSON"
    );
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn arg(args: &[String], idx: usize, what: &str) -> Result<String> {
    args.get(idx).cloned().ok_or_else(|| {
        usage();
        anyhow!("Missing {what}")
    })
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        bail!("Missing command");
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{}", about::version_cli_text());
        return Ok(());
    }
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    args.retain(|a| a != "-v" && a != "--verbose");
    init_logging(verbose);

    let command = arg(&args, 1, "command")?;
    match command.as_str() {
        "capabilities" => print_json(&Capabilities {
            commands: vec!["capabilities", "probe", "report", "sweep", "render"],
            complexes: COMPLEX_NAMES,
            probe_defaults: ProbeParams::default(),
            report_defaults: ReportParams::default(),
        }),
        "probe" => {
            let request: ProbeRequest = parse_request(&arg(&args, 2, "probe request")?)
                .context("Could not read probe request")?;
            let probe = build_probe(
                request.is_bridge.sequence(),
                request.sf_bridge.sequence(),
                &request.primer,
                &request.params,
            )?;
            print_json(&probe)
        }
        "report" => {
            let request: ReportRequest = parse_request(&arg(&args, 2, "report request")?)
                .context("Could not read report request")?;
            let (is_bridge, sf_bridge) = request.bridges()?;
            let record = report(&is_bridge, &sf_bridge, &request.primer, &request.params)?;
            print_json(&record)
        }
        "sweep" => {
            let config: SweepConfig = parse_request(&arg(&args, 2, "sweep config")?)
                .context("Could not read sweep config")?;
            let records = run_sweep(&config)?;
            match args.iter().position(|a| a == "--csv") {
                Some(idx) => {
                    let path = arg(&args, idx + 1, "CSV path")?;
                    write_csv_path(&records, &path)
                        .with_context(|| format!("Could not write '{path}'"))?;
                    eprintln!("Wrote {} records to '{path}'", records.len());
                    Ok(())
                }
                None => print_json(&records),
            }
        }
        "render" => {
            let request: ReportRequest = parse_request(&arg(&args, 2, "report request")?)
                .context("Could not read report request")?;
            let name = arg(&args, 3, "complex name")?;
            let output = arg(&args, 4, "output path")?;
            let (is_bridge, sf_bridge) = request.bridges()?;
            let design =
                SaberPlishDesign::new(&is_bridge, &sf_bridge, &request.primer, &request.params)?;
            let complex = design.complex(&name).ok_or_else(|| {
                anyhow!("Unknown complex '{name}', expected one of {COMPLEX_NAMES:?}")
            })?;
            let analysis = design.analyze(&NearestNeighborSolver)?;
            let svg = draw_complex(&analysis, complex, &request.draw)?;
            fs::write(&output, svg).with_context(|| format!("Could not write '{output}'"))?;
            eprintln!("Wrote {complex} to '{output}'");
            Ok(())
        }
        other => {
            usage();
            bail!("Unknown command '{other}'")
        }
    }
}
