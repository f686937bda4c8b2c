use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sheet_stacker::config::{RunConfig, DEFAULT_SHEET_NAME, DEFAULT_SOURCE_COLUMN};
use sheet_stacker::execution::{
    CancellationToken, CombineController, FileObserver, RunEvent, RunOutcome,
};
use sheet_stacker::CombineError;

#[derive(Parser, Debug)]
#[command(name = "sheet-stacker")]
#[command(about = "Combine one sheet from every .xlsx/.xlsm in a folder into a single workbook")]
#[command(version)]
struct Args {
    /// Folder containing the workbooks to combine
    directory: Option<PathBuf>,

    /// Name of the sheet to read from every workbook (exact match)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Also search subfolders
    #[arg(short, long)]
    recursive: bool,

    /// Do not add a column with each row's source file name
    #[arg(long)]
    no_source_column: bool,

    /// Header of the source file name column
    #[arg(long)]
    source_column: Option<String>,

    /// Output file [default: <DIRECTORY>/combined.xlsx]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Load settings from a JSON file; other flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(RunConfig, Option<PathBuf>), CombineError> {
        let mut config = match (&self.config, &self.directory) {
            (Some(path), _) => RunConfig::from_json_file(path)?,
            (None, Some(dir)) => RunConfig::new(dir, RunConfig::default_output_path(dir)),
            (None, None) => {
                return Err(CombineError::InvalidConfig {
                    message: "no input directory given (pass DIRECTORY or --config)".to_string(),
                });
            }
        };

        if let Some(dir) = self.directory {
            if self.config.is_some() && self.output.is_none() {
                config.output_path = RunConfig::default_output_path(&dir);
            }
            config.directory = dir;
        }
        if let Some(sheet) = self.sheet {
            config.sheet_name = sheet;
        }
        if self.recursive {
            config.recursive = true;
        }
        if self.no_source_column {
            config.add_source_column = false;
        }
        if let Some(name) = self.source_column {
            config.source_column_name = name;
        }
        if let Some(out) = self.output {
            config.output_path = out;
        }
        Ok((config, self.log_file))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let (config, log_file) = match args.into_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let mut controller = CombineController::new();
    if let Some(path) = log_file {
        controller = controller.with_observer(Arc::new(FileObserver::new(path)));
    }

    println!(
        "Combining sheet '{}' from {} (defaults: sheet '{DEFAULT_SHEET_NAME}', source column '{DEFAULT_SOURCE_COLUMN}'); press Enter to cancel",
        config.sheet_name,
        config.directory.display()
    );
    if let Err(e) = controller.start(config) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }
    if let Some(token) = controller.cancel_token() {
        cancel_on_enter(token);
    }

    let outcome = loop {
        match controller.recv_timeout(Duration::from_millis(200)) {
            Some(RunEvent::Progress(p)) => {
                print!("\r{:>3}% {:<70}", p.percent, truncate(&p.status, 70));
                let _ = io::stdout().flush();
            }
            Some(RunEvent::Log(entry)) => {
                println!("\r{entry:<76}");
            }
            Some(RunEvent::Finished(outcome)) => {
                println!();
                break outcome;
            }
            None if !controller.is_running() => {
                break controller.wait().unwrap_or(RunOutcome::Error {
                    message: "run ended without an outcome".to_string(),
                });
            }
            None => {}
        }
    };
    let _ = controller.wait();

    println!("{outcome}");
    match outcome {
        RunOutcome::Completed { .. } | RunOutcome::NoFiles | RunOutcome::NoData { .. } => ExitCode::SUCCESS,
        RunOutcome::Cancelled { .. } => ExitCode::from(130),
        RunOutcome::Error { .. } => ExitCode::from(1),
    }
}

/// Cancel the run when a line (Enter) arrives on stdin. EOF leaves the run alone.
fn cancel_on_enter(token: CancellationToken) {
    let spawned = thread::Builder::new()
        .name("sheet-stacker-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            if let Ok(n) = io::stdin().lock().read_line(&mut line) {
                if n > 0 {
                    token.cancel();
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "could not watch stdin; cancelling is unavailable");
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
