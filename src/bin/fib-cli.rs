//! Command-line client for a running fib-service.

use clap::Parser;

#[derive(Parser)]
#[command(name = "fib-cli", about = "Query a running fib-service")]
struct Args {
    /// Base URL of the service.
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    addr: String,

    /// Index to compute.
    #[arg(short, long)]
    index: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let url = format!("{}/fib?i={}", args.addr.trim_end_matches('/'), args.index);

    let client = reqwest::Client::new();
    let response = client.get(&url).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        println!("{body}");
        Ok(())
    } else {
        eprintln!("fib-cli: service answered {status}:");
        eprintln!("{}", body.trim_end());
        std::process::exit(1);
    }
}
