use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docindex::guard::{ClickGuard, TreeOptions, guard_tree};
use docindex::index::{self, IndexReader, check_objects, validate};
use docindex::output;
use docindex::utils::{AppConfig, get_config_path};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docindex", version)]
#[command(about = "Search index toolkit and image click-guard for static documentation sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an index and optionally its documented symbols
    Check {
        /// Path to searchindex.js
        index: PathBuf,

        /// Comma-separated names the object table must contain exactly
        #[arg(long, value_delimiter = ',')]
        expect_objects: Option<Vec<String>>,
    },
    /// Show index statistics
    Stats {
        /// Path to searchindex.js
        index: PathBuf,
    },
    /// Show the documents each word resolves to
    Lookup {
        /// Path to searchindex.js
        index: PathBuf,

        /// Words to look up
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// List documented objects
    Objects {
        /// Path to searchindex.js
        index: PathBuf,
    },
    /// Generate an index from a site manifest
    Build {
        /// JSON manifest describing pages
        manifest: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "searchindex.js")]
        output: PathBuf,

        /// Store words unstemmed
        #[arg(long)]
        no_stem: bool,
    },
    /// Re-serialize an index in canonical form
    Fmt {
        /// Path to searchindex.js
        index: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Disable pointer events on images inside marked containers
    Guard {
        /// Built site directory or a single HTML file
        path: PathBuf,

        /// Report pages that would change without writing them
        #[arg(long)]
        check: bool,

        /// Marker class of guarded containers
        #[arg(long)]
        marker: Option<String>,

        /// Glob selecting pages, relative to the site root
        #[arg(long)]
        glob: Option<String>,
    },
    /// Show or initialize the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "docindex=debug" } else { "docindex=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    debug!(?config, "loaded config");
    let color = !cli.no_color;

    match cli.command {
        Commands::Check {
            index,
            expect_objects,
        } => {
            let reader = open(&index)?;
            let report = validate(reader.index());
            output::print_validation(&report, color)?;

            let mut ok = report.is_valid();
            if let Some(expected) = expect_objects {
                let diff = check_objects(reader.index(), &expected);
                output::print_object_diff(&diff, color)?;
                ok &= diff.is_exact();
            }
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Stats { index } => {
            index::stats::show_stats(&index)?;
        }
        Commands::Lookup { index, words } => {
            let reader = open(&index)?;
            for word in &words {
                output::print_term_match(&reader.lookup(word), color)?;
            }
        }
        Commands::Objects { index } => {
            let reader = open(&index)?;
            output::print_objects(reader.index(), &reader.objects(), color)?;
        }
        Commands::Build {
            manifest,
            output,
            no_stem,
        } => {
            let stem = config.stem_words && !no_stem;
            let built = index::build::build_from_manifest(&manifest, &output, stem)?;
            println!(
                "Wrote {} ({} documents, {} terms)",
                output.display(),
                built.doc_count(),
                built.terms().len()
            );
        }
        Commands::Fmt { index, output } => {
            let reader = open(&index)?;
            match output {
                Some(path) => index::IndexWriter::new(&path)
                    .write(reader.index())
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", index::to_js(reader.index())?),
            }
        }
        Commands::Guard {
            path,
            check,
            marker,
            glob,
        } => {
            let marker = marker.unwrap_or(config.marker_class);
            let guard = ClickGuard::new(&marker)?;
            let options = TreeOptions {
                glob: glob.unwrap_or(config.html_glob),
                write: !check,
                parallel: config.parallel,
                show_progress: !cli.verbose,
            };
            let report = guard_tree(&path, &guard, &options)
                .with_context(|| format!("Failed to guard {}", path.display()))?;
            output::print_guard_report(&report, !check, color)?;

            let pending = check && report.changed_files().next().is_some();
            if pending || !report.errors.is_empty() {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                match get_config_path() {
                    Some(path) => println!("Config file: {}", path.display()),
                    None => println!("Config file: <no app data directory>"),
                }
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Init => {
                let path = AppConfig::default().save()?;
                println!("Wrote default config to {}", path.display());
            }
        },
    }

    Ok(())
}

fn open(path: &Path) -> Result<IndexReader> {
    IndexReader::open(path).with_context(|| format!("Failed to open index {}", path.display()))
}
