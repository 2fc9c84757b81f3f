//! CLI argument parsing.
//!
//! Hand-rolled parser for the pendular CLI. Accepts any iterator of strings
//! so parsing can be tested without touching `std::env`.

use std::path::PathBuf;

use crate::visualization::ExportFormat;

/// Default simulated duration for `run` (s).
pub const DEFAULT_DURATION: f64 = 10.0;

/// Default number of runs for `verify`.
pub const DEFAULT_VERIFY_RUNS: usize = 3;

/// CLI arguments container.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    /// The command to execute.
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a scenario headlessly
    Run {
        /// Path to the scenario YAML file.
        scenario_path: PathBuf,
        /// Wall-clock seconds to simulate at the configured frame rate.
        duration: f64,
        /// Directory for the sample export, if any.
        export_dir: Option<PathBuf>,
        /// Export format override; the scenario's format otherwise.
        format: Option<ExportFormat>,
        /// Optional seed override.
        seed_override: Option<u64>,
        /// Print the summary as JSON.
        json: bool,
        /// Enable verbose output.
        verbose: bool,
    },
    /// Verify that repeated runs produce identical trajectories
    Verify {
        /// Path to the scenario YAML file.
        scenario_path: PathBuf,
        /// Number of verification runs.
        runs: usize,
    },
    /// Load and validate a scenario file
    Check {
        /// Path to the scenario YAML file.
        scenario_path: PathBuf,
    },
    /// Show help
    Help,
    /// Show version
    Version,
}

impl Command {
    /// Whether verbose logging was requested.
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        matches!(self, Self::Run { verbose: true, .. })
    }
}

impl Args {
    /// Parse command-line arguments from an iterator.
    ///
    /// The first item is the program name.
    #[must_use]
    pub fn parse_from<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::parse_from_vec(&args)
    }

    /// Parse command-line arguments from the environment.
    #[must_use]
    pub fn parse() -> Self {
        Self::parse_from(std::env::args())
    }

    fn parse_from_vec(args: &[String]) -> Self {
        let Some(name) = args.get(1) else {
            return Self {
                command: Command::Help,
            };
        };

        let command = match name.as_str() {
            "run" => Self::parse_run_command(args),
            "verify" => Self::parse_verify_command(args),
            "check" => Self::parse_check_command(args),
            "-h" | "--help" | "help" => Command::Help,
            "-V" | "--version" | "version" => Command::Version,
            unknown => {
                eprintln!("Unknown command: {unknown}");
                Command::Help
            }
        };

        Self { command }
    }

    fn parse_run_command(args: &[String]) -> Command {
        let Some(path) = args.get(2) else {
            eprintln!("Error: 'run' command requires scenario path");
            return Command::Help;
        };

        let mut duration = DEFAULT_DURATION;
        let mut export_dir = None;
        let mut format = None;
        let mut seed_override = None;
        let mut json = false;
        let mut verbose = false;

        let mut i = 3;
        while i < args.len() {
            let value = args.get(i + 1);
            match args[i].as_str() {
                "--duration" => {
                    match value.map(|v| v.parse::<f64>()) {
                        Some(Ok(d)) if d.is_finite() && d >= 0.0 => duration = d,
                        Some(_) => eprintln!("Warning: ignoring invalid --duration"),
                        None => {}
                    }
                    i += 2;
                }
                "--export" => {
                    export_dir = value.map(PathBuf::from);
                    i += 2;
                }
                "--format" => {
                    match value.map(|v| ExportFormat::from_name(v)) {
                        Some(Some(f)) => format = Some(f),
                        Some(None) => eprintln!("Warning: ignoring unknown --format"),
                        None => {}
                    }
                    i += 2;
                }
                "--seed" => {
                    if let Some(Ok(seed)) = value.map(|v| v.parse()) {
                        seed_override = Some(seed);
                    }
                    i += 2;
                }
                "--json" => {
                    json = true;
                    i += 1;
                }
                "-v" | "--verbose" => {
                    verbose = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }

        Command::Run {
            scenario_path: PathBuf::from(path),
            duration,
            export_dir,
            format,
            seed_override,
            json,
            verbose,
        }
    }

    fn parse_verify_command(args: &[String]) -> Command {
        let Some(path) = args.get(2) else {
            eprintln!("Error: 'verify' command requires scenario path");
            return Command::Help;
        };

        let mut runs = DEFAULT_VERIFY_RUNS;
        if args.get(3).map(String::as_str) == Some("--runs") {
            if let Some(Ok(n)) = args.get(4).map(|v| v.parse::<usize>()) {
                runs = n.max(2);
            }
        }

        Command::Verify {
            scenario_path: PathBuf::from(path),
            runs,
        }
    }

    fn parse_check_command(args: &[String]) -> Command {
        let Some(path) = args.get(2) else {
            eprintln!("Error: 'check' command requires scenario path");
            return Command::Help;
        };

        Command::Check {
            scenario_path: PathBuf::from(path),
        }
    }
}
