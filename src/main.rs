//! upgrid CLI - Up banking data as tables, CSV or JSON

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use upgrid::config::mask_token;
use upgrid::output::render;
use upgrid::query::parse_date;
use upgrid::{
    CredentialProvider, Direction, EnvCredential, Fetcher, FileCache, FixSuggestion, Formulas,
    Grid, OutputFormat, TokenCache, UpConfig, UpError,
};

#[derive(Parser)]
#[command(name = "upgrid")]
#[command(about = "Fetch Up banking data as tabular grids")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/upgrid/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an Up API personal access token
    Login {
        /// Token from https://api.up.com.au (read from stdin if omitted)
        token: Option<String>,

        /// Seconds until the token is forgotten (default: token.ttl_secs)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Forget the stored token
    Logout,

    /// Check the token against the API
    Ping,

    /// All accounts, including balances
    Accounts,

    /// All categories, including parent categories
    Categories,

    /// All user-defined tags
    Tags,

    /// Transactions across all accounts
    Transactions {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Transactions between two dates
    Between {
        /// Start date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        since: String,

        /// End date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        until: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Transactions of a single account
    AccountTransactions {
        /// Up account ID
        account_id: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show the effective configuration
    Config,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Filter query string, e.g. "filter[status]=HELD&filter[category]=booze"
    #[arg(long, default_value = "")]
    filter: String,

    /// Keep only money out (debit) or money in (credit)
    #[arg(long, value_enum, default_value_t = Direction::All)]
    direction: Direction,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so grids on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.fix_suggestion() {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, UpError> {
    let config = match &cli.config {
        Some(path) => UpConfig::load_from(path)?,
        None => UpConfig::load()?,
    }
    .with_env()?;

    let token_cache =
        TokenCache::new(FileCache::new(config.cache_path())).with_ttl(config.token_ttl());

    match cli.command {
        Commands::Login { token, ttl } => login(&token_cache, token, ttl),
        Commands::Logout => logout(&token_cache),
        Commands::Config => show_config(&config, &token_cache),
        command => {
            let credentials = EnvCredential::default().or(&token_cache);
            let up = Formulas::new(Fetcher::new(&config)?, credentials);
            let grid = run_formula(&up, command).await?;
            print_grid(&grid, cli.format)
        }
    }
}

async fn run_formula<P>(up: &Formulas<P>, command: Commands) -> Result<Grid, UpError>
where
    P: CredentialProvider,
{
    let grid = match command {
        Commands::Ping => up.up_ping().await,
        Commands::Accounts => up.up_accounts().await,
        Commands::Categories => up.up_categories().await,
        Commands::Tags => up.up_tags().await,
        Commands::Transactions { filter } => {
            up.up_transactions(&filter.filter, filter.direction).await
        }
        Commands::Between {
            since,
            until,
            filter,
        } => {
            let since = parse_date(&since)?;
            let until = parse_date(&until)?;
            up.up_transactions_between(since, until, &filter.filter, filter.direction)
                .await
        }
        Commands::AccountTransactions { account_id, filter } => {
            up.up_transactions_for_account(&account_id, &filter.filter, filter.direction)
                .await
        }
        Commands::Login { .. } | Commands::Logout | Commands::Config => {
            return Err(UpError::InvalidArgument {
                reason: "not a data command".to_string(),
            })
        }
    };
    Ok(grid)
}

/// Error grids are still printed, but the process exits non-zero
fn print_grid(grid: &Grid, format: OutputFormat) -> Result<ExitCode, UpError> {
    print!("{}", render(grid, format)?);
    if format == OutputFormat::Json {
        println!();
    }
    Ok(if grid.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn login(
    cache: &TokenCache<FileCache>,
    token: Option<String>,
    ttl: Option<u64>,
) -> Result<ExitCode, UpError> {
    let token = match token {
        Some(token) => token,
        None => {
            eprintln!("Enter your Up API Personal Access Token (from https://api.up.com.au):");
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line
        }
    };
    let token = token.trim();
    if token.is_empty() {
        return Err(UpError::InvalidArgument {
            reason: "token must not be empty".to_string(),
        });
    }

    let ttl = ttl.map(Duration::from_secs).unwrap_or_else(|| cache.ttl());
    let expiry = cache.store_for(token, ttl)?;

    println!(
        "{} Logged in for {} (until {})",
        "✓".green(),
        humanize(ttl),
        expiry.to_rfc3339()
    );
    println!("  After this time the token is forgotten and you must log in again.");
    Ok(ExitCode::SUCCESS)
}

fn logout(cache: &TokenCache<FileCache>) -> Result<ExitCode, UpError> {
    if cache.expire()? {
        println!("{} You have been successfully logged out.", "✓".green());
    } else {
        println!("You are not currently logged in.");
    }
    Ok(ExitCode::SUCCESS)
}

fn show_config(config: &UpConfig, cache: &TokenCache<FileCache>) -> Result<ExitCode, UpError> {
    let stored = cache.retrieve()?;

    println!("{}", "Configuration".cyan().bold());
    println!("  Base URL:    {}", config.api.base_url);
    println!("  Max records: {}", config.max_records());
    println!("  Token TTL:   {}", humanize(config.token_ttl()));
    println!("  Cache file:  {}", config.cache_path().display());
    match stored.token {
        Some(token) => println!(
            "  Token:       {} (expires {})",
            mask_token(&token, 8),
            stored.expiry.as_deref().unwrap_or("unknown")
        ),
        None => println!("  Token:       {}", "not logged in".yellow()),
    }
    Ok(ExitCode::SUCCESS)
}

/// "1 day", "3 hours", "90 seconds"
fn humanize(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    let (amount, unit) = if secs % 86_400 == 0 && secs > 0 {
        (secs / 86_400, "day")
    } else if secs % 3_600 == 0 && secs > 0 {
        (secs / 3_600, "hour")
    } else if secs % 60 == 0 && secs > 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if amount == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", amount, unit)
    }
}
