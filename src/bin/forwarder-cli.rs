use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use service_forwarder::config;
use service_forwarder::routing::{BaseUrl, RouteTable};

#[derive(Parser)]
#[command(name = "forwarder-cli")]
#[command(about = "Inspection CLI for the Service Forwarder", long_about = None)]
struct Cli {
    /// Configuration file used to resolve routes
    #[arg(short, long, env = "FORWARDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved route table
    Routes,
    /// Show the backend URL a call would be forwarded to
    Resolve {
        service: String,
        /// Path segments below the service mount
        segments: Vec<String>,
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Call a running gateway and pretty-print the JSON answer
    Call {
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
        /// Path on the gateway, e.g. /api/courses/12
        path: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Bearer token sent as Authorization
        #[arg(short, long)]
        token: Option<String>,
        /// JSON body
        #[arg(short, long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Routes => {
            let table = route_table(cli.config)?;
            for route in table.iter() {
                let base = match &route.base {
                    BaseUrl::Configured(url) => url.clone(),
                    BaseUrl::Fallback(url) => format!("{} (fallback)", url),
                    BaseUrl::Missing => format!("<missing: set {}>", route.env_hint),
                };
                println!(
                    "{:<16} {:<22} {:<48} timeout={}ms {:?}",
                    route.service,
                    route.mount,
                    base,
                    route.timeout.as_millis(),
                    route.delivery
                );
            }
        }
        Commands::Resolve { service, segments, query } => {
            let table = route_table(cli.config)?;
            let route = table
                .get(&service)
                .ok_or_else(|| format!("unknown service '{}'", service))?;
            let url = route.target_url(segments.as_slice(), &query)?;
            println!("{}", url);
        }
        Commands::Call { url, path, method, token, data } => {
            let client = reqwest::Client::new();
            let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())?;

            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            if let Some(token) = token {
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
            }

            let mut request = client
                .request(method, format!("{}{}", url.trim_end_matches('/'), path))
                .headers(headers);
            if let Some(data) = data {
                let body: Value = serde_json::from_str(&data)?;
                request = request.json(&body);
            }

            print_response(request.send().await?).await?;
        }
    }

    Ok(())
}

fn route_table(path: Option<PathBuf>) -> Result<RouteTable, config::ConfigError> {
    let config = config::load_from_process(path.as_deref())?;
    Ok(RouteTable::from_config(&config))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
