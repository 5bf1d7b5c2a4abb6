use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crouke::{Client, Config, Credentials, Feed, SortMode, Vote};

#[derive(Debug, Parser)]
#[command(
    name = "crouke",
    version,
    about = "Browse opendesktop.org-family content feeds"
)]
struct Args {
    /// Content server (host:port or URL); defaults to the first croukerc site
    #[arg(long, value_name = "SERVER")]
    server: Option<String>,
    /// Login user
    #[arg(long, env = "CROUKE_USER", default_value = "")]
    user: String,
    /// Login password
    #[arg(long, env = "CROUKE_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,
    /// croukerc path (defaults to ~/.crouke/croukerc when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    timeout: u64,
    /// Emit JSON instead of tables
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all content categories
    Categories,
    /// List content entries in the given categories
    List {
        /// Comma-separated category ids
        #[arg(long, value_name = "IDS", value_delimiter = ',', required = true)]
        categories: Vec<String>,
        #[arg(long, value_enum, default_value_t = SortArg::New)]
        sort: SortArg,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Show the full fields of one content item
    Content {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Vote on a content item
    Vote {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_enum, value_name = "VOTE")]
        vote: VoteArg,
    },
    /// Probe whether the credentials log in
    Probe,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    New,
    Alpha,
    High,
    Down,
}

impl From<SortArg> for SortMode {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::New => Self::New,
            SortArg::Alpha => Self::Alpha,
            SortArg::High => Self::High,
            SortArg::Down => Self::Down,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VoteArg {
    Good,
    Bad,
}

impl From<VoteArg> for Vote {
    fn from(value: VoteArg) -> Self {
        match value {
            VoteArg::Good => Self::Good,
            VoteArg::Bad => Self::Bad,
        }
    }
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let server = resolve_server(&args)?;
    let credentials = Credentials::new(&args.user, &args.password);
    let client = Client::with_timeout(&credentials, server, Duration::from_secs(args.timeout));
    let feed = Feed::new(client);

    match &args.command {
        Command::Categories => {
            let categories = feed.categories().context("failed to fetch categories")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                for category in &categories {
                    println!("{}\t{}", category.id, category.name);
                }
            }
        }
        Command::List {
            categories,
            sort,
            page,
        } => {
            let ids: Vec<&str> = categories.iter().map(String::as_str).collect();
            let entries = feed
                .list(&ids, (*sort).into(), *page)
                .context("failed to fetch content list")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        entry.id, entry.name, entry.changed, entry.score, entry.downloads
                    );
                }
            }
        }
        Command::Content { id } => {
            let details = feed.content(id).context("failed to fetch content")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&details)?);
            } else {
                for (name, value) in &details {
                    println!("{}\t{}", name, value.as_deref().unwrap_or("-"));
                }
            }
        }
        Command::Vote { id, vote } => {
            let status = feed.vote(id, (*vote).into()).context("failed to vote")?;
            println!("{status}");
        }
        Command::Probe => {
            let ok = feed.verify_login().context("login probe failed")?;
            println!("{}", if ok { "login ok" } else { "login rejected" });
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Server resolution: flag wins, then the first croukerc site
fn resolve_server(args: &Args) -> Result<String> {
    if let Some(server) = &args.server {
        return Ok(server.clone());
    }

    let config = load_config(args)?;
    match config.first_site() {
        Some(site) => Ok(site.to_string()),
        None => bail!("no server configured; pass --server or add SITES to croukerc"),
    }
}

fn load_config(args: &Args) -> Result<Config> {
    if let Some(path) = &args.config {
        return Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let Some(path) = default_config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    Config::load(&path).with_context(|| format!("failed to load config {}", path.display()))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".crouke").join("croukerc"))
}
