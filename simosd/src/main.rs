//! # Simulator Host Daemon
//!
//! Main entry point for the headless simulator host.

use kernel_api::KernelApi;
use services_logger::LogLevel;
use simosd::{render_process_table, HostRuntime, HostRuntimeConfig};
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process;

/// Command-line options beyond the runtime configuration
struct Options {
    runtime: HostRuntimeConfig,
    trace: Option<LogLevel>,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(&args[0]);
        process::exit(1);
    });

    let mut runtime = HostRuntime::new(options.runtime).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    if let Err(e) = drive(&mut runtime, options.trace) {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
}

fn drive(runtime: &mut HostRuntime, trace: Option<LogLevel>) -> Result<(), simosd::HostRuntimeError> {
    let receipts = runtime.prepare()?;
    for receipt in &receipts {
        println!(
            "Loaded pid {} ({}{})",
            receipt.pid,
            receipt.location,
            receipt
                .partition
                .map(|p| format!(", partition {}", p))
                .unwrap_or_default()
        );
    }

    let outcome = runtime.run();
    let summary = outcome.map(|s| s.clone());

    for line in runtime.output() {
        println!("{}", line);
    }
    println!();
    print!("{}", render_process_table(&runtime.kernel().processes()));

    if let Some(level) = trace {
        println!();
        for entry in runtime.kernel().log().at_least(level) {
            println!("{}", entry);
        }
    }

    let summary = summary?;
    println!();
    println!(
        "{} ticks ({} idle), {} preemptions, {} exited",
        summary.ticks,
        summary.idle_ticks,
        summary.preemptions,
        summary.exited.len()
    );

    runtime.shutdown()
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut config = HostRuntimeConfig::default();
    let mut trace = None;
    let mut quantum = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --config".to_string());
                }
                config.kernel = HostRuntimeConfig::load_kernel_config(&args[i])
                    .map_err(|e| format!("Failed to read config file: {}", e))?;
            }
            "--program" | "-p" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --program".to_string());
                }
                config.programs.push(read_program(&args[i])?);
            }
            "--format" => {
                config.format = true;
            }
            "--disk-image" | "-d" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --disk-image".to_string());
                }
                config.disk_image = Some(PathBuf::from(&args[i]));
            }
            "--quantum" | "-q" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --quantum".to_string());
                }
                quantum = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid quantum value: {}", args[i]))?,
                );
            }
            "--max-ticks" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --max-ticks".to_string());
                }
                config.max_ticks = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid max-ticks value: {}", args[i]))?;
            }
            "--no-run" => {
                config.run_all = false;
            }
            "--trace" | "-t" => {
                trace = Some(LogLevel::Info);
            }
            "--trace-all" => {
                trace = Some(LogLevel::Debug);
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    // Overrides the config file regardless of argument order
    if let Some(quantum) = quantum {
        config.kernel.quantum = quantum;
    }

    Ok(Options {
        runtime: config,
        trace,
    })
}

/// Accepts either a path to a hex text file or the hex text itself
fn read_program(arg: &str) -> Result<String, String> {
    if Path::new(arg).is_file() {
        fs::read_to_string(arg).map_err(|e| format!("Failed to read program file: {}", e))
    } else {
        Ok(arg.to_string())
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      Kernel configuration (JSON)");
    eprintln!("  -p, --program <HEX|FILE> Program to load (repeatable)");
    eprintln!("  --format                 Format the disk before loading");
    eprintln!("  -d, --disk-image <FILE>  Mount this image if present, save it on exit");
    eprintln!("  -q, --quantum <N>        Round-robin quantum in ticks");
    eprintln!("  --max-ticks <N>          Maximum ticks to run (0 = unlimited)");
    eprintln!("  --no-run                 Load programs without scheduling them");
    eprintln!("  -t, --trace              Print the kernel trace log on exit");
    eprintln!("  --trace-all              Include debug entries in the trace");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!(
        "  {} --format --program \"A0 07 A2 01 FF 00\" --trace",
        program
    );
    eprintln!("  {} -d disk.json -p prog1.hex -p prog2.hex -q 2", program);
}
