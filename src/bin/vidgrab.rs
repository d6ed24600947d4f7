use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use vidgrab::app::{App, DownloadOutcome, FormatChoice, ProgressSink};
use vidgrab::config::{ConfigLoader, ResolvedConfig};
use vidgrab::domain::{FormatTable, Selection, VideoUrl};
use vidgrab::error::VidgrabError;
use vidgrab::extractor::YtDlpExtractor;
use vidgrab::output::{self, JsonOutput, OutputMode, TextOutput};
use vidgrab::tui::Tui;

#[derive(Parser)]
#[command(name = "vidgrab")]
#[command(about = "Inspect the formats of a video URL and download the one you pick")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the formats available for a video")]
    Formats(FormatsArgs),
    #[command(about = "Download a video in the selected format")]
    Download(DownloadArgs),
}

#[derive(Args)]
struct FormatsArgs {
    url: String,
}

#[derive(Args)]
struct DownloadArgs {
    url: String,

    #[arg(long, conflicts_with = "pick")]
    select: Option<usize>,

    #[arg(long)]
    pick: Option<String>,

    #[arg(long)]
    auto: bool,

    #[arg(long)]
    dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            match report.downcast_ref::<VidgrabError>() {
                Some(err) => ExitCode::from(map_exit_code(err)),
                None => ExitCode::from(1),
            }
        }
    }
}

fn map_exit_code(error: &VidgrabError) -> u8 {
    match error {
        VidgrabError::InvalidInput
        | VidgrabError::InvalidTarget(_)
        | VidgrabError::StaleSelection { .. }
        | VidgrabError::UnknownFormat(_) => 2,
        VidgrabError::ExtractionFailed(_)
        | VidgrabError::DownloadFailed(_)
        | VidgrabError::MissingTool(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let extractor = match &config.yt_dlp {
        Some(program) => YtDlpExtractor::with_program(program.clone()),
        None => YtDlpExtractor::new(),
    };
    if extractor.program().is_none() {
        tracing::warn!("yt-dlp not found; requests will fail until it is installed");
    }
    let app = App::new(extractor);

    match cli.command {
        Some(Commands::Formats(args)) => run_formats(args, &app, output_mode),
        Some(Commands::Download(args)) => run_download(args, &app, &config, output_mode),
        None => match output_mode {
            OutputMode::Interactive => {
                let mut tui = Tui::new(&config);
                tui.run(Arc::new(app))?;
                Ok(ExitCode::SUCCESS)
            }
            OutputMode::NonInteractive => Err(miette::Report::msg(
                "command required (try `vidgrab --help`)",
            )),
        },
    }
}

fn run_formats(
    args: FormatsArgs,
    app: &App<YtDlpExtractor>,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.fetch(&args.url, &JsonOutput)?;
            JsonOutput::print_fetch(&result).into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }
        OutputMode::Interactive => {
            let result = app.fetch(&args.url, &TextOutput);
            match &result {
                Ok(fetched) => TextOutput::print_fetch(fetched),
                Err(_) => eprintln!("{}", output::fetch_status(&result)),
            }
            Ok(settle(result.map(drop)))
        }
    }
}

fn run_download(
    args: DownloadArgs,
    app: &App<YtDlpExtractor>,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let DownloadArgs {
        url,
        select,
        pick,
        auto,
        dir,
    } = args;
    let auto = auto || config.auto_best;
    let target = dir.unwrap_or_else(|| config.save_dir.clone().into_std_path_buf());

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &TextOutput,
    };

    let choice = match (pick, select) {
        _ if auto => None,
        (Some(label), _) => Some(FormatChoice::Label(label)),
        (None, Some(index)) => Some(FormatChoice::Index(index)),
        (None, None) => None,
    };
    let result = match choice {
        Some(choice) => app.fetch_and_download(&url, &choice, &target, sink),
        None => download_best(app, &url, &target, sink),
    };

    match output_mode {
        OutputMode::NonInteractive => {
            let outcome = result?;
            JsonOutput::print_download(&outcome).into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }
        OutputMode::Interactive => {
            let status = output::download_status(&result);
            if result.is_ok() {
                println!("{status}");
            } else {
                eprintln!("{status}");
            }
            Ok(settle(result.map(drop)))
        }
    }
}

fn download_best(
    app: &App<YtDlpExtractor>,
    url: &str,
    target: &Path,
    sink: &dyn ProgressSink,
) -> Result<DownloadOutcome, VidgrabError> {
    let parsed: VideoUrl = url.parse()?;
    app.download(
        url,
        Selection::Auto,
        target,
        &FormatTable::auto_only(&parsed),
        sink,
    )
}

/// Exit code for a failure whose status line has already been printed.
fn settle(result: Result<(), VidgrabError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(map_exit_code(&err)),
    }
}
