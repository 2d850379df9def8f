use clap::{Parser, Subcommand};
use serde_json::Value;

use adaptive_lb::admin::{RESET_PATH, SERVERS_PATH, STATS_PATH};

#[derive(Parser)]
#[command(name = "lb-cli")]
#[command(about = "Inspect a running adaptive-lb instance", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate request counters and healthy server count
    Stats,
    /// Per-server health, load, latency and error rate
    Servers,
    /// Reset aggregate counters
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Stats => client.get(format!("{}{}", base, STATS_PATH)).send().await?,
        Commands::Servers => client.get(format!("{}{}", base, SERVERS_PATH)).send().await?,
        Commands::Reset => client.post(format!("{}{}", base, RESET_PATH)).send().await?,
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: balancer returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
