use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

use batch_runner::{load_records, partition_valid, BatchReport, BatchRunner, OfflineSubmitter};
use reddit_client::RedditClient;
use redpost_core::{Credentials, PostRecord, SafetySettings, ENV_PASSWORD};

#[derive(Parser, Debug)]
#[command(
    name = "redpost",
    version,
    about = "Batch Reddit submission tool with dry-run safety"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit posts from a JSON or CSV batch file (dry run by default)
    Run {
        /// Batch file; extension picks the format
        #[arg(long, short = 'f')]
        file: PathBuf,

        /// Actually submit posts instead of simulating
        #[arg(long)]
        live: bool,

        /// Reddit password for live mode (or REDPOST_PASSWORD)
        #[arg(long)]
        password: Option<String>,

        /// Override every record's inter-post delay, in seconds
        #[arg(long)]
        delay: Option<u64>,

        /// Results file (.json or .csv); defaults to a timestamped JSON file
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Skip the live-mode confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Load and validate a batch file without submitting anything
    Check {
        #[arg(long, short = 'f')]
        file: PathBuf,
    },

    /// Show a subreddit's info, rules, and available link flairs
    Subreddit {
        name: String,

        /// Reddit password (or REDPOST_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads credentials; missing file is fine.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redpost=info,reddit_client=info,batch_runner=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            file,
            live,
            password,
            delay,
            out,
            yes,
        } => run_batch(file, live, password, delay, out, yes).await,
        Command::Check { file } => check_batch(file),
        Command::Subreddit { name, password } => inspect_subreddit(name, password).await,
    }
}

async fn run_batch(
    file: PathBuf,
    live: bool,
    password: Option<String>,
    delay: Option<u64>,
    out: Option<PathBuf>,
    yes: bool,
) -> Result<()> {
    let mut records = load_records(&file).context("failed to load batch file")?;

    if let Some(delay) = delay {
        for record in &mut records {
            record.delay = Some(delay);
        }
    }

    let (valid, errors) = partition_valid(&records);
    report_validation(&records, &valid, &errors);
    if valid.is_empty() {
        bail!("no valid records in {}", file.display());
    }

    // The whole batch goes through the runner; it re-validates each
    // record, so invalid ones still land in the report as failures.
    let settings = SafetySettings::default();
    let results = if live {
        let client = authenticate(password).await?;
        if !yes && !confirm_live(valid.len())? {
            println!("Submission cancelled.");
            return Ok(());
        }
        let mut runner = BatchRunner::new(client, settings, false);
        runner.run(&records).await
    } else {
        info!("dry run: submissions will be simulated");
        let mut runner = BatchRunner::new(OfflineSubmitter, settings, true);
        runner.run(&records).await
    };

    let report = BatchReport::from_results(results);
    println!("{}", report.render());

    let written = report.export(out.as_deref())?;
    println!("Results saved to: {}", written.display());
    Ok(())
}

fn check_batch(file: PathBuf) -> Result<()> {
    let records = load_records(&file).context("failed to load batch file")?;
    let (valid, errors) = partition_valid(&records);
    report_validation(&records, &valid, &errors);

    if !errors.is_empty() {
        bail!("{} of {} records failed validation", errors.len(), records.len());
    }
    println!("All {} records are valid.", valid.len());
    Ok(())
}

async fn inspect_subreddit(name: String, password: Option<String>) -> Result<()> {
    let client = authenticate(password).await?;

    let about = client.subreddit_about(&name).await?;
    println!("r/{}: {}", about.display_name, about.title);
    if let Some(subscribers) = about.subscribers {
        println!("Subscribers: {subscribers}");
    }
    println!(
        "Submission type: {}",
        about.submission_type.as_deref().unwrap_or("unknown")
    );
    println!("Allows images: {}", yes_no(about.allow_images));
    println!("Allows videos: {}", yes_no(about.allow_videos));
    println!("NSFW: {}", yes_no(about.over18));

    match client.subreddit_rules(&name).await {
        Ok(rules) if !rules.is_empty() => {
            println!("\nRules ({}):", rules.len());
            for (index, rule) in rules.iter().enumerate() {
                println!("  {}. {}", index + 1, rule.short_name);
            }
        }
        Ok(_) => println!("\nNo rules published."),
        Err(e) => println!("\nRules unavailable: {e}"),
    }

    match client.link_flair_templates(&name).await {
        Ok(flairs) if !flairs.is_empty() => {
            println!("\nAvailable link flairs ({}):", flairs.len());
            for flair in &flairs {
                let mod_note = if flair.mod_only { " (mod only)" } else { "" };
                println!("  - {}{mod_note}", flair.text);
            }
        }
        Ok(_) => println!("\nNo link flairs configured."),
        Err(e) => println!("\nFlairs unavailable: {e}"),
    }

    let status = client.rate_limit_status().await;
    println!(
        "\nAPI usage: {}/{} requests in the current window ({} remaining)",
        status.current_window_requests,
        status.max_requests,
        status.requests_remaining()
    );

    Ok(())
}

async fn authenticate(password: Option<String>) -> Result<RedditClient> {
    let credentials = Credentials::from_env()?;
    let password = password
        .or_else(|| std::env::var(ENV_PASSWORD).ok())
        .filter(|p| !p.is_empty())
        .with_context(|| format!("password required: pass --password or set {ENV_PASSWORD}"))?;

    let mut client = RedditClient::new(credentials, &SafetySettings::default())?;
    let account = client.authenticate(&password).await?;
    println!("Authenticated as u/{}", account.name);
    Ok(client)
}

fn report_validation(records: &[PostRecord], valid: &[PostRecord], errors: &[String]) {
    println!(
        "Loaded {} records: {} valid, {} invalid",
        records.len(),
        valid.len(),
        errors.len()
    );
    for error in errors {
        println!("  {error}");
    }
}

fn confirm_live(count: usize) -> Result<bool> {
    print!("LIVE MODE: actually submit {count} posts? (y/N): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    }
}
