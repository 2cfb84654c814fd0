use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use token_faucet::security::pow::{self, Challenge};

#[derive(Parser)]
#[command(name = "faucet-cli")]
#[command(about = "Client and operator CLI for the token faucet", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a proof-of-work challenge
    Challenge,
    /// Solve a challenge locally
    Solve {
        #[arg(long)]
        nonce: String,
        #[arg(long)]
        difficulty: u32,
    },
    /// Request tokens, solving the challenge if the faucet asks for one
    Send {
        chain: String,
        address: String,
        /// CAPTCHA response token, when the faucet requires one
        #[arg(long)]
        captcha: Option<String>,
    },
    /// Show the faucet health report
    Health,
    /// Show the public faucet configuration
    Config,
    /// Show the sender balance on a chain
    Balance { chain: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Challenge => {
            let res = client.get(format!("{}/pow-challenge", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Solve { nonce, difficulty } => {
            println!(
                "Expected effort: ~{:.0} ms at difficulty {}",
                pow::estimate_time(difficulty),
                difficulty
            );
            let solution = pow::solve(&nonce, difficulty);
            println!("solution: {}", solution);
            println!("hash:     {}", pow::pow_hash(&nonce, &solution.to_string()));
        }
        Commands::Send {
            chain,
            address,
            captcha,
        } => {
            let mut body = json!({});
            if let Some(token) = captcha {
                body["recaptchaResponse"] = json!(token);
            }

            let challenge: Value = client
                .get(format!("{}/pow-challenge", cli.url))
                .send()
                .await?
                .json()
                .await?;
            if let Ok(challenge) = serde_json::from_value::<Challenge>(challenge) {
                eprintln!(
                    "Solving challenge at difficulty {}...",
                    challenge.difficulty
                );
                let solution = pow::solve(&challenge.nonce, challenge.difficulty);
                body["nonce"] = json!(challenge.nonce);
                body["timestamp"] = json!(challenge.timestamp);
                body["solution"] = json!(solution);
            }

            let res = client
                .post(format!("{}/send/{}/{}", cli.url, chain, address))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/healthz", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Config => {
            let res = client.get(format!("{}/config.json", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Balance { chain } => {
            let res = client.get(format!("{}/balance/{}", cli.url, chain)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: faucet returned status {}", status);
    }
    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
