//! CLI binary for docproc-history.
//!
//! A thin shim over the library crate: flags map onto `ClientConfig`, the
//! session comes from the session file, and notices published by the library
//! are printed as coloured lines on stderr.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use docproc_history::preview::encode::decode_data_url;
use docproc_history::{
    ApiClient, ClientConfig, CollectionHistory, DeleteOutcome, Feature, HistoryEntry, HistoryList,
    ItemActions, LoadOutcome, Notice, NoticeLevel, NotificationHub, Preview, PreviewCache,
    PreviewPair, PreviewRenderer, Session, SessionStore, SharedNotifier, UnifiedHistory,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Store a credential (and optional profile fields)
  docproc session set --token 0123abcd --email me@example.com

  # Unified history: first page of every feature
  docproc history

  # One feature, three pages, as JSON
  docproc history --feature "Table Extraction" --pages 3 --json

  # Render PDF thumbnails into ./thumbs
  docproc history --previews thumbs

  # Delete one record
  docproc delete "Image Conversion" 42

  # Download an artifact into ./out
  docproc download /media/documents/report.docx -o out

  # Render page 1 of a PDF artifact
  docproc preview https://ocr.goodwish.com.np/media/scan.pdf -o scan.png

FEATURES:
  "PDF Conversion"      (pdfConversion)      api/scanned-files/
  "Table Extraction"    (tableExtraction)    api/images/
  "Document Analysis"   (documentAnalysis)   api/convert-doc/
  "Image Conversion"    (imageConversion)    api/files/

ENVIRONMENT VARIABLES:
  DOCPROC_BASE_URL          Backend origin
  DOCPROC_SESSION_FILE      Session file (default: <config dir>/docproc/session.json)
  DOCPROC_TIMEOUT           List/delete timeout in seconds
  DOCPROC_DOWNLOAD_TIMEOUT  Download timeout in seconds
  PDFIUM_LIB_PATH           Path to libpdfium used for PDF previews
  RUST_LOG                  Overrides the log filter
"#;

/// Browse, preview, delete and download document-processing history.
#[derive(Parser, Debug)]
#[command(
    name = "docproc",
    version,
    about = "Browse, preview, delete and download document-processing history",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend origin.
    #[arg(long, global = true, env = "DOCPROC_BASE_URL")]
    base_url: Option<String>,

    /// Session file path.
    #[arg(long, global = true, env = "DOCPROC_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// List and delete timeout in seconds.
    #[arg(long, global = true, env = "DOCPROC_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Download timeout in seconds (also used for preview fetches).
    #[arg(long, global = true, env = "DOCPROC_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCPROC_VERBOSE")]
    verbose: bool,

    /// Suppress everything except errors.
    #[arg(short, long, global = true, env = "DOCPROC_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the stored credential and profile.
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },
    /// List history entries.
    History(HistoryArgs),
    /// Delete one record.
    Delete {
        /// Feature label, e.g. "Table Extraction" or tableExtraction.
        feature: String,
        /// Record id within that feature's collection.
        id: String,
    },
    /// Download an artifact.
    Download {
        /// Absolute URL or path relative to the backend origin.
        url: String,
        /// Destination directory.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Resolve the preview of one artifact URL.
    Preview {
        url: String,
        /// Write a rendered PDF preview to this PNG file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Store a credential and optional profile fields.
    Set {
        #[arg(long)]
        token: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        firstname: Option<String>,
        #[arg(long)]
        lastname: Option<String>,
        /// Avatar URL.
        #[arg(long)]
        photo: Option<String>,
    },
    /// Show the stored session (credential redacted).
    Show,
    /// Remove the stored session.
    Clear,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    /// Page through one feature instead of the unified first-page view.
    #[arg(long)]
    feature: Option<String>,

    /// Pages to load with --feature.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,

    /// With --feature, keep loading until the collection is exhausted.
    #[arg(long, conflicts_with = "pages")]
    all: bool,

    /// Output entries as JSON.
    #[arg(long)]
    json: bool,

    /// Resolve previews and write rendered PDF thumbnails into this directory.
    #[arg(long, value_name = "DIR")]
    previews: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Notices already reach the terminal, so library warnings stay hidden
    // unless --verbose.
    let filter = if cli.verbose { "debug" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let store = match cli.session_file {
        Some(ref p) => SessionStore::new(p),
        None => SessionStore::default_location(),
    };

    // ── Notices ──────────────────────────────────────────────────────────
    let hub = Arc::new(NotificationHub::new());
    let printer = spawn_notice_printer(hub.subscribe(), cli.quiet);

    let result = run(&cli, &store, hub.clone()).await;

    // Every other handle was dropped with `run`; this closes the channel.
    drop(hub);
    let _ = printer.await;
    result
}

async fn run(cli: &Cli, store: &SessionStore, notifier: SharedNotifier) -> Result<()> {
    match cli.command {
        Command::Session { ref action } => session_command(cli, store, action),
        Command::History(ref args) => {
            let client = build_client(cli, store)?;
            history_command(cli, client, notifier, args).await
        }
        Command::Delete { ref feature, ref id } => {
            let client = build_client(cli, store)?;
            let actions = ItemActions::new(client, notifier);
            let mut list = HistoryList::new();
            match actions.delete_entry(&mut list, id, feature).await {
                DeleteOutcome::Deleted { .. } => Ok(()),
                DeleteOutcome::UnknownFeature(label) => {
                    bail!("Unknown feature '{label}'. See `docproc --help` for the feature list.")
                }
                DeleteOutcome::Failed(e) => {
                    Err(e).with_context(|| format!("Failed to delete {feature} record {id}"))
                }
            }
        }
        Command::Download {
            ref url,
            ref output,
        } => {
            let client = build_client(cli, store)?;
            let actions = ItemActions::new(client, notifier);
            let path = actions
                .download_entry(Some(url.as_str()), output)
                .await
                .context("Download failed")?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Preview {
            ref url,
            ref output,
        } => {
            let client = build_client(cli, store)?;
            preview_command(client, url, output.as_deref()).await
        }
    }
}

/// Map global flags and the stored session to an `ApiClient`.
///
/// Ctrl-C cancels every in-flight request.
fn build_client(cli: &Cli, store: &SessionStore) -> Result<ApiClient> {
    let session = store.load().context("Failed to load session")?;

    let mut builder = ClientConfig::builder()
        .request_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout);
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let client = ApiClient::new(config, Arc::new(session)).context("Failed to build client")?;

    let on_interrupt = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel_all();
        }
    });

    Ok(client)
}

fn session_command(cli: &Cli, store: &SessionStore, action: &SessionCommand) -> Result<()> {
    match action {
        SessionCommand::Set {
            token,
            email,
            firstname,
            lastname,
            photo,
        } => {
            let session = Session {
                token: Some(token.clone()),
                email: email.clone(),
                firstname: firstname.clone(),
                lastname: lastname.clone(),
                photo: photo.clone(),
            };
            store.save(&session).context("Failed to save session")?;
            if !cli.quiet {
                eprintln!(
                    "{} Signed in as {}  {}",
                    green("✔"),
                    bold(&session.display_name().unwrap_or_else(|| "(no name)".into())),
                    dim(&store.path().display().to_string())
                );
            }
        }
        SessionCommand::Show => {
            let session = store.load().context("Failed to load session")?;
            println!("File:         {}", store.path().display());
            println!(
                "Signed in:    {}",
                if session.is_authenticated() {
                    green("yes")
                } else {
                    red("no")
                }
            );
            if let Some(name) = session.display_name() {
                println!("Name:         {}", name);
            }
            if let Some(ref e) = session.email {
                println!("Email:        {}", e);
            }
            if let Some(ref p) = session.photo {
                println!("Photo:        {}", p);
            }
        }
        SessionCommand::Clear => {
            store.clear().context("Failed to clear session")?;
            if !cli.quiet {
                eprintln!("{} Signed out", green("✔"));
            }
        }
    }
    Ok(())
}

async fn history_command(
    cli: &Cli,
    client: ApiClient,
    notifier: SharedNotifier,
    args: &HistoryArgs,
) -> Result<()> {
    let bar = (!cli.quiet && !args.json).then(|| spinner("Loading history…"));

    let list = match args.feature {
        Some(ref label) => {
            let feature: Feature = label.parse().context("Invalid --feature")?;
            let mut history = CollectionHistory::new(client.clone(), notifier, feature);
            let mut loaded = 0;
            while args.all || loaded < args.pages {
                match history.load_more().await {
                    LoadOutcome::Loaded { has_more, .. } => {
                        loaded += 1;
                        if !has_more {
                            break;
                        }
                    }
                    LoadOutcome::Exhausted => break,
                    LoadOutcome::Failed(e) if loaded == 0 => {
                        if let Some(ref s) = bar {
                            s.finish_and_clear();
                        }
                        return Err(e).with_context(|| format!("Failed to load {feature} history"));
                    }
                    LoadOutcome::Failed(_) => break,
                }
            }
            history.list().clone()
        }
        None => {
            let mut history = UnifiedHistory::new(client.clone(), notifier);
            let report = history.load().await;
            if report.failures().count() == report.collections.len() {
                if let Some(ref s) = bar {
                    s.finish_and_clear();
                }
                let (_, first) = report
                    .failures()
                    .next()
                    .context("unified load reported no collections")?;
                bail!("Failed to load history: {first}");
            }
            history.list().clone()
        }
    };

    let mut cache = PreviewCache::new();
    if let Some(ref dir) = args.previews {
        if let Some(ref s) = bar {
            s.set_message("Resolving previews…");
        }
        let renderer = PreviewRenderer::new(client);
        renderer.populate(list.entries(), &mut cache).await;
        let written = write_previews(dir, list.entries(), &cache).await?;
        if !cli.quiet && !args.json {
            eprintln!("{} {} previews written to {}", green("✔"), written, dir.display());
        }
    }

    if let Some(s) = bar {
        s.finish_and_clear();
    }

    if args.json {
        #[derive(Serialize)]
        struct Row<'a> {
            #[serde(flatten)]
            entry: &'a HistoryEntry,
            #[serde(skip_serializing_if = "Option::is_none")]
            previews: Option<&'a PreviewPair>,
        }
        let rows: Vec<Row<'_>> = list
            .iter()
            .map(|entry| Row {
                entry,
                previews: cache.get(&entry.key()),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialise history")?
        );
    } else {
        print_table(&list);
    }
    Ok(())
}

async fn preview_command(client: ApiClient, url: &str, output: Option<&Path>) -> Result<()> {
    let renderer = PreviewRenderer::new(client);
    match renderer.resolve_preview(url).await {
        None => bail!("No preview available for '{url}'"),
        Some(Preview::Direct { url }) => println!("{url}"),
        Some(Preview::Rendered {
            ref data_url,
            width,
            height,
        }) => match output {
            Some(path) => {
                let png = decode_data_url(data_url).context("Malformed preview data URL")?;
                tokio::fs::write(path, png)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!(
                    "{} {}x{} preview → {}",
                    green("✔"),
                    width,
                    height,
                    bold(&path.display().to_string())
                );
            }
            None => println!("{data_url}"),
        },
    }
    Ok(())
}

/// Write every rendered preview as `<feature>-<id>-<side>.png`.
async fn write_previews(
    dir: &Path,
    entries: &[HistoryEntry],
    cache: &PreviewCache,
) -> Result<usize> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = 0;
    for entry in entries {
        let Some(pair) = cache.get(&entry.key()) else {
            continue;
        };
        for (side, preview) in [("input", &pair.input), ("output", &pair.output)] {
            let Some(Preview::Rendered { data_url, .. }) = preview else {
                continue;
            };
            let Some(png) = decode_data_url(data_url) else {
                continue;
            };
            let slug = entry.feature.label().to_lowercase().replace(' ', "-");
            let path = dir.join(format!("{slug}-{}-{side}.png", entry.id));
            tokio::fs::write(&path, png)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }
    }
    Ok(written)
}

fn print_table(list: &HistoryList) {
    if list.is_empty() {
        eprintln!("{}", dim("No history."));
        return;
    }
    println!(
        "{}",
        bold(&format!(
            "{:<18}  {:>6}  {:<16}  {:<32}  {}",
            "FEATURE", "ID", "DATE", "INPUT", "OUTPUT"
        ))
    );
    for e in list {
        println!(
            "{:<18}  {:>6}  {:<16}  {:<32}  {}",
            e.feature.label(),
            e.id,
            e.date,
            shorten(&e.input, 32),
            e.output
        );
    }
}

/// Keep the tail of long URLs; the filename is the useful part.
fn shorten(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        return s.to_string();
    }
    let tail: String = s.chars().skip(count - (width - 1)).collect();
    format!("\u{2026}{tail}")
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Print notices until every publisher is gone.
fn spawn_notice_printer(mut rx: broadcast::Receiver<Notice>, quiet: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notice) => print_notice(&notice, quiet),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("{}", dim(&format!("({n} notices dropped)")));
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn print_notice(notice: &Notice, quiet: bool) {
    match notice.level {
        NoticeLevel::Error => eprintln!("{} {}", red("✘"), red(&notice.message)),
        _ if quiet => {}
        NoticeLevel::Success => eprintln!("{} {}", green("✔"), notice.message),
        NoticeLevel::Info => eprintln!("{} {}", cyan("ℹ"), notice.message),
    }
}
