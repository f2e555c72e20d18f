use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{Level, debug};

use converter::{
    AutoConfirmPrompter, CliPrompter, ConsoleProgressReporter, Conversion, ConversionReport,
    ConvertConfig, ConvertConfigBuilder, ConvertError, Converter, FailurePolicy, IntoBatchCallback,
    PacingMode, Prompter, backfill_entry, load_manifest, pending_entries, read_source_list,
    save_manifest,
};

#[derive(Parser)]
#[command(name = "curseforge-to-modrinth", version, about = "Convert a CurseForge modlist into a Modrinth index")]
struct Cli {
    /// Show debug logs and per-request progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every entry of a modlist.html and write modrinth.index.json
    #[command(visible_alias = "parse-modlist")]
    Parse(ParseArgs),
    /// List placeholder entries that still need a file
    Pending {
        /// Manifest written by `parse`
        #[arg(long, default_value = converter::config::DEFAULT_OUTPUT_PATH)]
        path: PathBuf,
    },
    /// Fill a placeholder entry from a file downloaded by hand
    Backfill {
        #[arg(long, default_value = converter::config::DEFAULT_OUTPUT_PATH)]
        path: PathBuf,
        /// Position of the entry, as shown by `pending`
        #[arg(long)]
        entry: usize,
        /// The downloaded artifact
        #[arg(long)]
        file: PathBuf,
        /// Where the artifact can be downloaded from
        #[arg(long)]
        url: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PacingArg {
    Fixed,
    Quota,
}

#[derive(clap::Args)]
struct ParseArgs {
    /// CurseForge modlist.html export
    #[arg(long)]
    path: PathBuf,
    #[arg(long, default_value = converter::config::DEFAULT_OUTPUT_PATH)]
    output: PathBuf,
    #[arg(long, default_value_t = converter::config::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    #[arg(long, default_value_t = converter::config::DEFAULT_COOLDOWN.as_secs())]
    cooldown_secs: u64,
    /// `quota` skips cooldowns while the rate-limit headers show enough headroom
    #[arg(long, value_enum, default_value = "fixed")]
    pacing: PacingArg,
    /// Keep entries whose lookups failed as placeholders instead of aborting
    #[arg(long)]
    keep_going: bool,
    /// Skip the confirmation and take every default answer
    #[arg(short, long)]
    yes: bool,
    /// Indent the written JSON
    #[arg(long)]
    pretty: bool,
    /// Game versions accepted for releases; the first one is written to the manifest
    #[arg(long = "game-version", num_args = 1..)]
    game_versions: Vec<String>,
    #[arg(long)]
    loader: Option<String>,
    #[arg(long)]
    loader_version: Option<String>,
    #[arg(long)]
    pack_name: Option<String>,
    #[arg(long)]
    pack_version: Option<String>,
}

impl ParseArgs {
    fn config(&self) -> ConvertConfig {
        let defaults = ConvertConfig::default();
        let mut builder = ConvertConfigBuilder::new()
            .chunk_size(self.chunk_size)
            .cooldown(Duration::from_secs(self.cooldown_secs))
            .pacing(match self.pacing {
                PacingArg::Fixed => PacingMode::Fixed,
                PacingArg::Quota => PacingMode::QuotaAware,
            })
            .failure_policy(if self.keep_going {
                FailurePolicy::Record
            } else {
                FailurePolicy::Abort
            })
            .output_path(&self.output)
            .pretty_output(self.pretty)
            .confirm_before_start(!self.yes)
            .loader(
                self.loader.clone().unwrap_or(defaults.target.loader),
                self.loader_version.clone().unwrap_or(defaults.target.loader_version),
            )
            .pack(
                self.pack_name.clone().unwrap_or(defaults.pack.name),
                self.pack_version.clone().unwrap_or(defaults.pack.version_id),
            );

        if let Some(first) = self.game_versions.first() {
            builder = builder
                .minecraft_version(first.clone())
                .game_versions(self.game_versions.clone());
        }

        builder.build().with_env_overrides()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error.downcast_ref::<ConvertError>() {
                Some(convert_error) if matches!(convert_error, ConvertError::InputMissing { .. }) => {
                    eprintln!("Error: {}", convert_error);
                }
                Some(convert_error) => eprintln!("{}", convert_error.detailed_report()),
                None => eprintln!("Error: {:#}", error),
            }
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Parse(args) => parse(args, cli.verbose).await,
        Command::Pending { path } => pending(path).await,
        Command::Backfill {
            path,
            entry,
            file,
            url,
        } => backfill(path, entry, file, url).await,
    }
}

async fn parse(args: ParseArgs, verbose: bool) -> anyhow::Result<()> {
    let config = args.config();
    debug!("Configuration: {:?}", config);

    let references = read_source_list(&args.path).await?;
    println!("📄 Found {} mods in {}", references.len(), args.path.display());

    let prompter: Arc<dyn Prompter> = if args.yes {
        Arc::new(AutoConfirmPrompter)
    } else {
        Arc::new(CliPrompter::new())
    };

    let converter = Converter::builder(config)
        .prompter(prompter)
        .progress(ConsoleProgressReporter::new(verbose).into_callback())
        .build()?;

    match converter.run(references).await? {
        Conversion::Declined => println!("Nothing was converted."),
        Conversion::Finished(report) => print_summary(&report),
    }

    Ok(())
}

fn print_summary(report: &ConversionReport) {
    println!();
    println!(
        "✅ Resolved {}/{} mods",
        report.resolved_count(),
        report.outcomes.len()
    );

    for unresolved in report.unresolved() {
        println!("   ⚠️  {}: {}", unresolved.reference, unresolved.reason);
    }

    match &report.write_error {
        None => println!("💾 Wrote {}", report.output_path.display()),
        Some(error) => println!("❌ Could not write {}: {}", report.output_path.display(), error),
    }
}

async fn pending(path: PathBuf) -> anyhow::Result<()> {
    let manifest = load_manifest(&path).await?;
    let entries = pending_entries(&manifest);

    if entries.is_empty() {
        println!("No pending entries in {}", path.display());
        return Ok(());
    }

    println!("{} pending entries:", entries.len());
    for entry in entries {
        println!(
            "  [{}] {}",
            entry.entry,
            entry.files_url.as_deref().unwrap_or(&entry.comment)
        );
    }
    Ok(())
}

async fn backfill(path: PathBuf, entry: usize, file: PathBuf, url: String) -> anyhow::Result<()> {
    let mut manifest = load_manifest(&path).await?;
    backfill_entry(&mut manifest, entry, &file, &url)
        .await
        .with_context(|| format!("Failed to back-fill entry {} from {}", entry, file.display()))?;
    save_manifest(&manifest, &path).await?;

    println!(
        "✅ Filled entry {}; {} still pending",
        entry,
        manifest.pending_count()
    );
    Ok(())
}
