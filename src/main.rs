use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use qkd_replay::client::{DiagramRequest, SimulationClient, SimulationParams, DEFAULT_BASE_URL};
use qkd_replay::playback::PlaybackConfig;
use qkd_replay::trace::{Role, Trace};
use qkd_replay::ui::{basis_symbol, bit_symbol};
use qkd_replay::utils::sample_trace::{generate_sample_trace, generate_sample_trace_seeded};
use qkd_replay::utils::serialization::{load_trace_archive, save_trace_archive, TraceArchive};
use qkd_replay::{ReplayVisualizer, WebReplayVisualizer};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const INSPECT_COLUMNS: usize = 25;

#[derive(Parser)]
#[command(author, version, about = "Step-by-step replay of BB84 key exchanges", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an offline placeholder exchange and write it to disk
    Sample {
        #[arg(long, default_value_t = 12)]
        steps: u32,
        #[arg(long, help = "Route every photon through an intercepting Eve")]
        interceptor: bool,
        #[arg(long, help = "Seed for a reproducible exchange")]
        seed: Option<u64>,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Run one simulation on the backend service and archive the trace
    Fetch {
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
        #[arg(long, default_value_t = 50)]
        qubits: u32,
        #[arg(long, help = "Route every photon through an intercepting Eve")]
        interceptor: bool,
        #[arg(long, default_value_t = 0.0)]
        perturb_probability: f64,
        #[arg(long, default_value_t = 0.0)]
        sop_mean_deviation: f64,
        #[arg(long, default_value_t = 1.0)]
        source_efficiency: f64,
        #[arg(long, default_value_t = 0.0)]
        fiber_length: f64,
        #[arg(long, default_value_t = 0.0)]
        fiber_loss: f64,
        #[arg(long, default_value_t = 1.0)]
        detector_efficiency: f64,
        #[arg(long, default_value_t = 72.6)]
        source_rate: f64,
        #[arg(
            long,
            value_name = "FILE",
            help = "Read simulation parameters from a TOML file instead of flags \
                    (keys use the service's camelCase names)"
        )]
        params: Option<PathBuf>,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
        #[arg(long, value_name = "FILE", help = "Also save the circuit diagram SVG")]
        diagram: Option<PathBuf>,
    },
    /// Print the contents of an archived exchange
    Inspect {
        #[arg(short, long, value_name = "FILE")]
        archive: PathBuf,
        #[arg(long, help = "Emit the archive as JSON instead of a table")]
        json: bool,
    },
    /// Replay an archived exchange in a live terminal UI
    Replay {
        #[arg(short, long, value_name = "FILE")]
        archive: PathBuf,
        #[arg(long, default_value_t = 2400.0)]
        step_ms: f64,
        #[arg(long, default_value_t = 2000.0)]
        dwell_ms: f64,
    },
    /// Replay an archived exchange on a localhost web dashboard
    ReplayWeb {
        #[arg(short, long, value_name = "FILE")]
        archive: PathBuf,
        #[arg(long, default_value_t = 2400.0)]
        step_ms: f64,
        #[arg(long, default_value_t = 2000.0)]
        dwell_ms: f64,
        #[arg(long, default_value_t = 8787)]
        port: u16,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Sample {
            steps,
            interceptor,
            seed,
            output,
        } => run_sample(steps, interceptor, seed, output)?,
        Commands::Fetch {
            base_url,
            qubits,
            interceptor,
            perturb_probability,
            sop_mean_deviation,
            source_efficiency,
            fiber_length,
            fiber_loss,
            detector_efficiency,
            source_rate,
            params,
            output,
            diagram,
        } => {
            let params = match params {
                Some(path) => load_params_file(&path)?,
                None => SimulationParams {
                    bit_count: qubits,
                    eve_mode: interceptor,
                    perturb_probability,
                    sop_mean_deviation,
                    source_efficiency,
                    fiber_length,
                    fiber_loss,
                    detector_efficiency,
                    source_rate,
                },
            };
            run_fetch(base_url, params, output, diagram)?;
        }
        Commands::Inspect { archive, json } => run_inspect(archive, json)?,
        Commands::Replay {
            archive,
            step_ms,
            dwell_ms,
        } => run_replay(archive, step_ms, dwell_ms)?,
        Commands::ReplayWeb {
            archive,
            step_ms,
            dwell_ms,
            port,
        } => run_replay_web(archive, step_ms, dwell_ms, port)?,
    }
    Ok(())
}

fn run_sample(steps: u32, interceptor: bool, seed: Option<u64>, output: PathBuf) -> CliResult<()> {
    if steps == 0 {
        return Err("steps must be greater than zero".into());
    }
    println!(
        "Generating offline exchange ({} steps, interceptor {})...",
        steps,
        if interceptor { "present" } else { "absent" }
    );
    let (trace, params) = match seed {
        Some(seed) => generate_sample_trace_seeded(steps, interceptor, seed),
        None => generate_sample_trace(steps, interceptor),
    };
    println!(
        "  matching bases = {}, sifted bits = {}, QBER = {:.2}%",
        trace.matching_bases_count(),
        trace.sifted_key().len(),
        trace.error_rate() * 100.0
    );
    let archive = TraceArchive::with_params(trace, params);
    save_trace_archive(&output, &archive)?;
    println!("Exchange saved to {}", output.display());
    Ok(())
}

fn run_fetch(
    base_url: String,
    params: SimulationParams,
    output: PathBuf,
    diagram: Option<PathBuf>,
) -> CliResult<()> {
    let client = SimulationClient::new(base_url)?;
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!(
        "simulating {} qubits on {}",
        params.bit_count,
        client.base_url()
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let trace = client.fetch_trace(&params)?;
    spinner.finish_and_clear();

    println!(
        "Received {} steps: matching bases = {}, sifted bits = {}, QBER = {:.2}%",
        trace.step_count(),
        trace.matching_bases_count(),
        trace.sifted_key().len(),
        trace.error_rate() * 100.0
    );

    if let Some(diagram_path) = diagram {
        let request = DiagramRequest::from_trace(&trace, &params);
        let svg = client.fetch_circuit_diagram(&request)?;
        fs::write(&diagram_path, svg)?;
        println!("Circuit diagram saved to {}", diagram_path.display());
    }

    let archive = TraceArchive::with_params(trace, params);
    save_trace_archive(&output, &archive)?;
    println!("Exchange saved to {}", output.display());
    println!("Replay it with: qkd_replay replay --archive {}", output.display());
    Ok(())
}

fn load_params_file(path: &std::path::Path) -> CliResult<SimulationParams> {
    let text = fs::read_to_string(path)?;
    let params: SimulationParams = toml::from_str(&text)?;
    Ok(params)
}

/// Replay views refuse to fall back to defaults: without a readable
/// archive the user is pointed back at the parameter-entry commands.
fn open_archive(path: &std::path::Path) -> CliResult<TraceArchive> {
    load_trace_archive(path).map_err(|err| {
        format!(
            "cannot read archive {}: {err} (create one with `qkd_replay sample` or `qkd_replay fetch`)",
            path.display()
        )
        .into()
    })
}

fn run_inspect(archive_path: PathBuf, json: bool) -> CliResult<()> {
    let archive = open_archive(&archive_path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&archive)?);
        return Ok(());
    }
    let trace = &archive.trace;
    if let Err(err) = trace.validate() {
        println!("warning: archive fails validation: {err}");
    }

    println!("Archive: {}", archive_path.display());
    println!("  steps: {}", trace.step_count());
    println!(
        "  interceptor: {}",
        if trace.has_interceptor() {
            "present"
        } else {
            "absent"
        }
    );
    println!("  matching bases: {}", trace.matching_bases_count());
    println!("  QBER: {:.2}%", trace.error_rate() * 100.0);
    let key: String = trace
        .sifted_key()
        .iter()
        .map(|bit| char::from(b'0' + bit.to_u8()))
        .collect();
    println!("  sifted key ({} bits): {}", trace.sifted_key().len(), key);
    if let Some(params) = &archive.params {
        println!(
            "  params: qubits={}, eve={}, perturb={:.2}, sop={:.2}, detector={:.2}",
            params.bit_count,
            params.eve_mode,
            params.perturb_probability,
            params.sop_mean_deviation,
            params.detector_efficiency
        );
    }

    println!();
    print_step_table(trace);
    Ok(())
}

fn print_step_table(trace: &Trace) {
    let count = trace.step_count();
    let mut start = 0;
    while start < count {
        let end = (start + INSPECT_COLUMNS).min(count);
        let mut header = String::from("step ");
        for index in start..end {
            header.push_str(&format!(" {:>3}", index));
        }
        println!("{header}");
        for role in [Role::Alice, Role::Eve, Role::Bob] {
            if role == Role::Eve && !trace.has_interceptor() {
                continue;
            }
            let mut line = format!("{:<5}", role.label());
            for index in start..end {
                line.push_str(&format!(
                    "  {}{}",
                    basis_symbol(trace.basis(role, index)),
                    bit_symbol(trace.basis(role, index), trace.bit(role, index))
                ));
            }
            println!("{line}");
        }
        println!();
        start = end;
    }
}

fn run_replay(archive_path: PathBuf, step_ms: f64, dwell_ms: f64) -> CliResult<()> {
    let config = playback_config(step_ms, dwell_ms)?;
    let archive = open_archive(&archive_path)?;
    let mut visualizer = ReplayVisualizer::for_trace(archive.trace, archive.params, config)?;
    visualizer.run()?;
    println!("Replay finished.");
    Ok(())
}

fn run_replay_web(archive_path: PathBuf, step_ms: f64, dwell_ms: f64, port: u16) -> CliResult<()> {
    let config = playback_config(step_ms, dwell_ms)?;
    let archive = open_archive(&archive_path)?;
    let mut visualizer =
        WebReplayVisualizer::for_trace(archive.trace, archive.params, config, port)?;
    visualizer.run()?;
    println!("Web replay finished.");
    Ok(())
}

fn playback_config(step_ms: f64, dwell_ms: f64) -> CliResult<PlaybackConfig> {
    if !(step_ms.is_finite() && step_ms > 0.0) {
        return Err("step duration must be a positive number of milliseconds".into());
    }
    if !(dwell_ms.is_finite() && dwell_ms >= 0.0) {
        return Err("loop dwell must be a non-negative number of milliseconds".into());
    }
    Ok(PlaybackConfig {
        step_duration_ms: step_ms,
        loop_dwell_ms: dwell_ms,
    })
}
