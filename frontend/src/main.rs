use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use records::User;
use records_client::{
    client::RecordClient,
    config::{ClientConfig, parse_ports},
    connect,
    form::{UserForm, search},
    storage::{FileStorage, LAST_EDIT_USER_ID, MemoryStorage, Storage},
};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "records")]
#[command(author, version, about = "Manage user records", long_about = None)]
struct Cli {
    /// API host, overrides API_HOST
    #[arg(long, global = true)]
    host: Option<String>,

    /// Candidate ports in probe order (e.g. "8000,8001"), overrides API_PORT_CANDIDATES
    #[arg(long, global = true)]
    ports: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,

    /// Show the discovered API endpoint
    Endpoint,

    /// List records
    List {
        /// Keep records whose full name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one record
    Get {
        id: i64,
    },

    /// Create a record
    Create {
        #[command(flatten)]
        fields: FormArgs,
    },

    /// Edit a record, only the given fields change
    Edit {
        /// Record id, defaults to the last edited record
        id: Option<i64>,

        #[command(flatten)]
        fields: FormArgs,
    },

    /// Delete a record
    Delete {
        id: i64,

        /// Confirm the deletion
        #[arg(short, long)]
        yes: bool,
    },

    /// Show record counts
    Metrics,
}

#[derive(Args)]
struct FormArgs {
    #[arg(long)]
    firstname: Option<String>,

    #[arg(long)]
    lastname: Option<String>,

    #[arg(long)]
    age: Option<String>,

    /// male, female or other
    #[arg(long)]
    gender: Option<String>,

    /// Interest tag, repeat or comma separate
    #[arg(short, long = "interest", value_delimiter = ',')]
    interests: Vec<String>,

    #[arg(short, long)]
    description: Option<String>,
}

impl From<FormArgs> for UserForm {
    fn from(args: FormArgs) -> Self {
        Self {
            firstname: args.firstname.unwrap_or_default(),
            lastname: args.lastname.unwrap_or_default(),
            age: args.age,
            gender: args.gender.unwrap_or_default(),
            interests: args.interests,
            description: args.description.unwrap_or_default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(ports) = cli.ports {
        config.candidates = parse_ports("--ports", &ports)?;
    }

    let storage = storage();
    let client = connect(&config, storage.clone())?;

    match cli.command {
        Commands::Health => {
            let health = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Endpoint => {
            println!("{}", client.endpoint().await.base_url());
        }
        Commands::List { search: term } => {
            let users = client.list_users().await?;
            let shown = search(&users, term.as_deref().unwrap_or_default());

            if shown.is_empty() {
                println!("No records");
            }
            for user in shown {
                print_row(user);
            }
        }
        Commands::Get { id } => {
            let user = client.get_user(id).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Commands::Create { fields } => {
            let form = UserForm::from(fields);
            check(&form)?;

            let id = client.create_user(&form.to_payload()).await?;
            println!("Created record {id}");
        }
        Commands::Edit { id, fields } => {
            let id = match id {
                Some(id) => id,
                None => last_edited(storage.as_ref()).await?,
            };

            edit(&client, storage.as_ref(), id, fields.into()).await?;
        }
        Commands::Delete { id, yes } => {
            if !yes {
                bail!("Refusing to delete record {id} without --yes");
            }

            let message = client.delete_user(id).await?;
            println!("{message}");
        }
        Commands::Metrics => {
            let metrics = client.metrics().await?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
    }

    Ok(())
}

fn storage() -> Arc<dyn Storage> {
    match FileStorage::default_path() {
        Some(path) => Arc::new(FileStorage::new(path)),
        None => {
            warn!("No config directory, state will not persist");
            Arc::new(MemoryStorage::new())
        }
    }
}

async fn last_edited(storage: &dyn Storage) -> Result<i64> {
    let raw = storage
        .get(LAST_EDIT_USER_ID)
        .await
        .context("No record id given and no record edited before")?;

    raw.parse()
        .with_context(|| format!("Stored record id {raw:?} is not a number"))
}

async fn edit(client: &RecordClient, storage: &dyn Storage, id: i64, changes: UserForm) -> Result<()> {
    let user = client.get_user(id).await?;

    if let Err(e) = storage.set(LAST_EDIT_USER_ID, &id.to_string()).await {
        warn!("Failed to remember record {id}: {e}");
    }

    let mut form = UserForm::from_user(&user);
    form.apply(changes);
    check(&form)?;

    let message = client.update_user(id, &form.to_payload()).await?;
    println!("{message}");

    Ok(())
}

fn check(form: &UserForm) -> Result<()> {
    let errors = form.field_errors();

    if errors.is_empty() {
        return Ok(());
    }

    for (field, message) in &errors {
        eprintln!("{field}: {message}");
    }

    bail!("{} invalid field(s)", errors.len())
}

fn print_row(user: &User) {
    println!(
        "{:>5}  {:<30}  {:>3}  {:<6}  {}",
        user.id,
        user.full_name(),
        user.age,
        user.gender.as_str(),
        user.interests
    );
}
