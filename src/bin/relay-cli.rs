use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Operator CLI for the tip event relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[arg(short, long, env = "ADMIN_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version and lifecycle state
    Status,
    /// Show relay counters and queue depth
    Metrics,
    /// Show top tip recipients
    Leaderboard {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Subscribe to contract events and start draining
    Start,
    /// Stop draining and unsubscribe
    Stop,
    /// Run one full drain pass over the queue
    Retry,
    /// Drop every queued record
    Clear,
}

impl Commands {
    fn request(&self) -> (Method, String) {
        match self {
            Commands::Status => (Method::GET, "/admin/status".into()),
            Commands::Metrics => (Method::GET, "/admin/metrics".into()),
            Commands::Leaderboard { limit } => {
                (Method::GET, format!("/admin/leaderboard?limit={limit}"))
            }
            Commands::Start => (Method::POST, "/admin/start".into()),
            Commands::Stop => (Method::POST, "/admin/stop".into()),
            Commands::Retry => (Method::POST, "/admin/retry".into()),
            Commands::Clear => (Method::POST, "/admin/clear".into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path) = cli.command.request();
    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
