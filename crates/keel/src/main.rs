//! Keel command line tool
//!
//! Runs single calls against the configured search cluster and
//! authentication endpoint and prints what came back.

use clap::{Parser, Subcommand};
use keel_access::auth::Credentials;
use keel_access::backends::elasticsearch::QueryElement;
use keel_access::backends::elasticsearch::query_builder::must_match;
use keel_access::core::DocumentStore;
use keel_access::{AccessConfig, AccessState, Envelope, init_logging};
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "keel", version, about = "Single calls against Keel backends")]
struct Cli {
    #[command(flatten)]
    config: AccessConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks that the search cluster answers.
    Ping,

    /// Reads one document.
    Get {
        index: String,
        doc_type: String,
        id: String,
        /// Only return these source fields.
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Runs a query-string search, e.g. `user:uid1`.
    Search { path: String, term: String },

    /// Finds documents where one field matches a value.
    Match {
        path: String,
        field: String,
        value: String,
        #[arg(long)]
        analyzer: Option<String>,
    },

    /// Counts the documents under a path.
    Count { path: String },

    /// Checks credentials against the authentication endpoint.
    Auth {
        user_id: String,
        #[arg(long, env = "KEEL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        client: Option<String>,
    },
}

fn print_envelope(envelope: &Envelope) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(envelope.is_success())
}

async fn run(state: &AccessState, command: Command) -> anyhow::Result<bool> {
    let store = state.search();

    match command {
        Command::Ping => {
            let connected = store.test_connection().await;
            println!("{}", json!({ "endpoint": store.config().endpoint, "connected": connected }));
            Ok(connected)
        }
        Command::Get {
            index,
            doc_type,
            id,
            fields,
        } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            print_envelope(&store.get_item_filtered(&index, &doc_type, &id, &fields).await)
        }
        Command::Search { path, term } => print_envelope(&store.search_simple(&path, &term).await),
        Command::Match {
            path,
            field,
            value,
            analyzer,
        } => {
            let mut element = QueryElement::new(field, value);
            if let Some(analyzer) = analyzer {
                element = element.with_analyzer(analyzer);
            }
            let query = must_match(&[element]);
            print_envelope(&store.search_by_json(&path, &query).await)
        }
        Command::Count { path } => match store.count(&path).await {
            Some(count) => {
                println!("{}", json!({ "path": path, "count": count }));
                Ok(true)
            }
            None => {
                warn!(path = %path, "Cluster did not return a count");
                Ok(false)
            }
        },
        Command::Auth {
            user_id,
            password,
            client,
        } => {
            let mut credentials = Credentials::new(user_id, password);
            if let Some(client) = client {
                credentials = credentials.with_client(client);
            }
            match state.authenticator().authenticate(&credentials).await {
                Ok(user) => {
                    let basic_info = user.basic_info.as_ref().map(|info| info.to_value());
                    let rendered = json!({
                        "user_id": user.user_id,
                        "access_level": user.access_level,
                        "basic_info": basic_info
                    });
                    println!("{}", serde_json::to_string_pretty(&rendered)?);
                    Ok(true)
                }
                Err(e) => {
                    println!("{}", json!({ "error": e.to_string(), "code": e.legacy_code() }));
                    Ok(false)
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    if let Err(errors) = cli.config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        search_endpoint = %cli.config.search.endpoint,
        auth_module = ?cli.config.auth.module,
        version = keel_access::VERSION,
        "Starting keel"
    );

    let state = AccessState::new(cli.config)?;
    let succeeded = run(&state, cli.command).await?;

    info!("Call statistics:\n{}", state.statistics().report());

    if !succeeded {
        std::process::exit(2);
    }
    Ok(())
}
