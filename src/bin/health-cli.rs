use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "health-cli")]
#[command(about = "Query a probe-health endpoint", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "/cloud/health")]
    path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a health run and print the aggregate result.
    ///
    /// Exits 0 for ok, 1 for warn, 2 for crit, 3 if the endpoint is unreachable.
    Check,
    /// Show whether a run is currently in flight
    Running,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = format!("{}{}", cli.url.trim_end_matches('/'), cli.path);

    let code = match cli.command {
        Commands::Check => match fetch(&client, &base).await {
            Ok(json) => {
                print_json(&json);
                exit_code(&json)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                3
            }
        },
        Commands::Running => {
            let url = format!("{}/running", base.trim_end_matches('/'));
            match fetch(&client, &url).await {
                Ok(json) => {
                    print_json(&json);
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    3
                }
            }
        }
    };

    std::process::exit(code);
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let res = client.get(url).send().await?;
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str(&text) {
        Ok(json) => Ok(json),
        Err(_) => Err(format!("endpoint returned {} with a non-JSON body: {}", status, text).into()),
    }
}

fn print_json(json: &Value) {
    match serde_json::to_string_pretty(json) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", json),
    }
}

/// Monitoring-plugin convention: 0 ok, 1 warn, 2 crit.
fn exit_code(json: &Value) -> i32 {
    match json.get("status").and_then(Value::as_str) {
        Some("ok") => 0,
        Some("warn") => 1,
        Some("crit") => 2,
        _ => 3,
    }
}
