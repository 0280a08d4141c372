use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fs;

const TOKEN_FILE: &str = ".contract_hub_token";

#[derive(Parser)]
#[command(name = "contract-cli")]
#[command(about = "CLI for the contract_hub API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, env = "CONTRACT_HUB_URL", default_value = "http://localhost:3000")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Templates,
    CreateTemplate {
        #[arg(short, long)]
        name: String,
        #[arg(short = 't', long = "type")]
        kind: String,
        /// Template body as JSON
        #[arg(short, long, default_value = "{}")]
        content: String,
    },
    Contracts,
    CreateContract {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        content: String,
        #[arg(long, default_value = "")]
        client: String,
        #[arg(long, default_value = "")]
        provider: String,
        /// Collaborator email (repeatable)
        #[arg(short = 'C', long = "collaborator")]
        collaborators: Vec<String>,
    },
    UpdateContract {
        #[arg(short, long)]
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        /// Replaces the collaborator list when given (repeatable)
        #[arg(short = 'C', long = "collaborator")]
        collaborators: Option<Vec<String>>,
    },
    Sign {
        #[arg(short, long)]
        id: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        signature: String,
    },
    Clauses,
    Suggest {
        #[arg(short = 't', long = "type")]
        kind: String,
    },
    Logout,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

fn authed(builder: RequestBuilder) -> RequestBuilder {
    let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
    builder.header("Authorization", format!("Bearer {}", token.trim()))
}

async fn print_response(res: Response) -> Result<(), reqwest::Error> {
    println!("{} {}", res.status(), res.text().await?);
    Ok(())
}

async fn save_token(res: Response) -> Result<(), Box<dyn std::error::Error>> {
    if res.status().is_success() {
        let body: AuthResponse = res.json().await?;
        fs::write(TOKEN_FILE, body.token)?;
        println!("Authenticated. Token saved to {}", TOKEN_FILE);
    } else {
        println!("Failed: {}", res.text().await?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let api = format!("{}/api", cli.url.trim_end_matches('/'));

    match cli.command {
        Commands::Register { name, email, password } => {
            let res = client
                .post(format!("{}/register", api))
                .json(&json!({ "name": name, "email": email, "password": password }))
                .send()
                .await?;
            save_token(res).await?;
        }
        Commands::Login { email, password } => {
            let res = client
                .post(format!("{}/login", api))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;
            save_token(res).await?;
        }
        Commands::Templates => {
            let res = authed(client.get(format!("{}/templates", api))).send().await?;
            print_response(res).await?;
        }
        Commands::CreateTemplate { name, kind, content } => {
            let content: Value = serde_json::from_str(&content)?;
            let res = authed(client.post(format!("{}/templates", api)))
                .json(&json!({ "name": name, "type": kind, "content": content }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Contracts => {
            let res = authed(client.get(format!("{}/contracts", api))).send().await?;
            print_response(res).await?;
        }
        Commands::CreateContract { title, content, client: client_name, provider, collaborators } => {
            let res = authed(client.post(format!("{}/contracts", api)))
                .json(&json!({
                    "title": title,
                    "content": content,
                    "clientName": client_name,
                    "providerName": provider,
                    "collaborators": collaborators
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::UpdateContract { id, title, content, client: client_name, provider, collaborators } => {
            // Only send what was given; the server leaves the rest unchanged
            let mut body = Map::new();
            let fields = [
                ("title", title.map(Value::from)),
                ("content", content.map(Value::from)),
                ("clientName", client_name.map(Value::from)),
                ("providerName", provider.map(Value::from)),
                ("collaborators", collaborators.map(Value::from)),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    body.insert(key.to_string(), value);
                }
            }
            let res = authed(client.put(format!("{}/contracts/{}", api, id)))
                .json(&Value::Object(body))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sign { id, name, signature } => {
            let res = authed(client.post(format!("{}/contracts/{}/sign", api, id)))
                .json(&json!({ "name": name, "signature": signature }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Clauses => {
            let res = client.get(format!("{}/clauses", api)).send().await?;
            print_response(res).await?;
        }
        Commands::Suggest { kind } => {
            let res = authed(client.post(format!("{}/ai-suggestions", api)))
                .json(&json!({ "type": kind }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
        }
    }

    Ok(())
}
