//! IMTSB queue command-line front end.
//!
//! Every command prints the uniform JSON envelope. Commands that act on
//! behalf of someone use the stored session (`login` first).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use imtsb_queue::config::{Config, LogFormat};
use imtsb_queue::db::{self, KeyValueStore, SqliteKv};
use imtsb_queue::engine::{read_attachments, stats, QueueEngine};
use imtsb_queue::errors::AppError;
use imtsb_queue::export::{history_file_name, write_history_csv};
use imtsb_queue::models::{Department, NewAccountRequest, ReceiptPayload, Role, Session};
use imtsb_queue::notifier::ChangeNotifier;
use imtsb_queue::response::envelope;
use imtsb_queue::session::{SessionManager, TracingNavigator};
use imtsb_queue::store::DataStore;

/// Queue management for the IMTSB service counters.
#[derive(Parser, Debug)]
#[command(name = "imtsb-queue", version, about, long_about = None)]
struct Cli {
    /// SQLite database file (overrides IMTSB_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the whole document (without credentials)
    Snapshot,
    /// Log in and store the session
    Login {
        email: String,
        password: String,
        /// Expected profile: admin, worker or customer
        #[arg(long)]
        role: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the stored session
    Whoami,
    /// Create a customer account
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Create a worker account (admin)
    AddWorker {
        name: String,
        email: String,
        password: String,
        #[arg(long)]
        department: Option<String>,
    },
    /// Delete a worker account (admin)
    RemoveWorker { id: String },
    /// List worker accounts (admin)
    Workers,
    /// Draw a ticket (customer)
    Issue {
        service: String,
        /// File to attach; repeatable
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    /// Call the next ticket of a department (worker)
    Call {
        /// Defaults to the worker's own department
        #[arg(long)]
        department: Option<String>,
    },
    /// Conclude the active ticket (worker)
    Conclude {
        #[arg(long, default_value = "")]
        notes: String,
        /// Service duration in seconds
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },
    /// Send the active ticket back to the queue (worker)
    Redirect {
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Replace the notes of the active ticket (worker)
    Note { note: String },
    /// Replace the receipt of a completed ticket with a JSON payload
    Receipt { ticket_id: String, payload: String },
    /// Confirm a ticket's result was received (customer)
    Receive { ticket_id: String },
    /// Rate a completed ticket from 1 to 5 (customer)
    Rate {
        ticket_id: String,
        score: f64,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Archive the day and reset the queue (admin)
    Archive {
        #[arg(long, default_value = "")]
        label: String,
    },
    /// Dashboard statistics, or one department's figures
    Stats {
        #[arg(long)]
        department: Option<String>,
    },
    /// Write the history as CSV (admin)
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print change events until interrupted
    Watch,
}

/// Everything a command needs.
struct App {
    store: Arc<DataStore>,
    engine: QueueEngine,
    sessions: SessionManager,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(db_path) = cli.db {
        config.db_path = db_path;
    }

    init_tracing(&config);
    tracing::debug!("Database path: {:?}", config.db_path);

    // Initialize storage
    if let Some(parent) = config.db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let pool = db::init_database(&config.db_path).await?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKv::new(pool));
    let store = Arc::new(DataStore::new(kv, ChangeNotifier::default()));
    store.ensure_seed().await?;

    let app = App {
        engine: QueueEngine::new(Arc::clone(&store), config.engine_settings()),
        sessions: SessionManager::new(Arc::clone(&store), Arc::new(TracingNavigator)),
        store,
    };

    if let Commands::Watch = cli.command {
        return watch(&app.store, config.watch_interval).await;
    }

    let output = run(cli.command, &app).await;
    println!("{}", serde_json::to_string_pretty(&output)?);
    if output["success"] != Value::Bool(true) {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr so stdout stays machine-readable
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(command: Commands, app: &App) -> Value {
    let engine = &app.engine;

    match command {
        Commands::Snapshot => reply(app, engine.public_snapshot().await),
        Commands::Login {
            email,
            password,
            role,
        } => {
            let result = match role.as_deref().map(parse_role).transpose() {
                Ok(expected) => app
                    .sessions
                    .login(&email, &password, expected)
                    .await
                    .map(|outcome| {
                        json!({ "user": outcome.user, "redirect": outcome.redirect.path() })
                    }),
                Err(e) => Err(e),
            };
            reply(app, result)
        }
        Commands::Logout => reply(app, app.sessions.logout().await),
        Commands::Whoami => reply(app, app.sessions.current_session().await),
        Commands::Register {
            name,
            email,
            password,
        } => {
            let request = NewAccountRequest {
                name,
                email,
                password,
                department: None,
            };
            reply(app, engine.register_customer(request).await)
        }
        Commands::AddWorker {
            name,
            email,
            password,
            department,
        } => {
            let result = async {
                require(app, &[Role::Admin]).await?;
                let request = NewAccountRequest {
                    name,
                    email,
                    password,
                    department,
                };
                engine.add_worker(request).await
            };
            reply(app, result.await)
        }
        Commands::RemoveWorker { id } => {
            let result = async {
                require(app, &[Role::Admin]).await?;
                engine.remove_worker(&id).await
            };
            reply(app, result.await)
        }
        Commands::Workers => {
            let result = async {
                require(app, &[Role::Admin]).await?;
                engine.list_workers().await
            };
            reply(app, result.await)
        }
        Commands::Issue {
            service,
            attachments,
        } => {
            let result = async {
                let session = require(app, &[Role::Customer]).await?;
                let uploads = read_attachments(&attachments).await?;
                engine
                    .issue_ticket(&service, &session.email, &session.name, uploads)
                    .await
            };
            reply(app, result.await)
        }
        Commands::Call { department } => {
            let result = async {
                let session = require(app, &[Role::Worker, Role::Admin]).await?;
                let department = department
                    .map(|d| Department::normalize(&d))
                    .or(session.department)
                    .unwrap_or_default();
                engine.call_next(&session.name, department.as_str()).await
            };
            reply(app, result.await)
        }
        Commands::Conclude { notes, duration } => {
            let result = async {
                let session = require(app, &[Role::Worker, Role::Admin]).await?;
                engine.conclude_current(&session.name, &notes, duration).await
            };
            reply(app, result.await)
        }
        Commands::Redirect { notes } => {
            let result = async {
                let session = require(app, &[Role::Worker, Role::Admin]).await?;
                engine.redirect_current(&session.name, &notes).await
            };
            reply(app, result.await)
        }
        Commands::Note { note } => {
            let result = async {
                let session = require(app, &[Role::Worker, Role::Admin]).await?;
                engine.set_current_note(&note, &session.name).await
            };
            reply(app, result.await)
        }
        Commands::Receipt { ticket_id, payload } => {
            let result = async {
                require(app, &[Role::Worker, Role::Admin]).await?;
                let payload: ReceiptPayload = serde_json::from_str(&payload)?;
                engine.set_receipt(&ticket_id, payload).await
            };
            reply(app, result.await)
        }
        Commands::Receive { ticket_id } => {
            let result = async {
                let session = require(app, &[Role::Customer]).await?;
                engine.mark_received(&ticket_id, &session.email).await
            };
            reply(app, result.await)
        }
        Commands::Rate {
            ticket_id,
            score,
            comment,
        } => {
            let result = async {
                let session = require(app, &[Role::Customer]).await?;
                engine
                    .rate_ticket(&ticket_id, &session.email, score, &comment)
                    .await
            };
            reply(app, result.await)
        }
        Commands::Archive { label } => {
            let result = async {
                require(app, &[Role::Admin]).await?;
                engine.archive_and_reset_day(&label).await
            };
            reply(app, result.await)
        }
        Commands::Stats { department } => {
            let result = async {
                // The dashboard is for admins; one department's figures are for its workers too
                let roles: &[Role] = match department {
                    Some(_) => &[Role::Worker, Role::Admin],
                    None => &[Role::Admin],
                };
                require(app, roles).await?;
                let document = engine.snapshot().await?;
                let value = match department {
                    Some(d) => serde_json::to_value(stats::department_stats(
                        &document,
                        Department::normalize(&d),
                    ))?,
                    None => serde_json::to_value(stats::dashboard_stats(&document, Utc::now()))?,
                };
                Ok::<_, AppError>(value)
            };
            reply(app, result.await)
        }
        Commands::Export { output } => {
            let result = async {
                require(app, &[Role::Admin]).await?;
                let document = engine.snapshot().await?;
                let path = output
                    .unwrap_or_else(|| PathBuf::from(history_file_name(Utc::now().date_naive())));
                let file = std::fs::File::create(&path)?;
                write_history_csv(&document.history, file)?;
                tracing::info!(
                    path = %path.display(),
                    rows = document.history.len(),
                    "History exported"
                );
                Ok::<_, AppError>(json!({
                    "file": path.display().to_string(),
                    "rows": document.history.len(),
                }))
            };
            reply(app, result.await)
        }
        Commands::Watch => reply(
            app,
            Err::<(), _>(AppError::Validation(
                "watch streams events and has no single result".to_string(),
            )),
        ),
    }
}

fn reply<T: serde::Serialize>(app: &App, result: Result<T, AppError>) -> Value {
    envelope(result, app.store.known_revision())
}

fn parse_role(value: &str) -> Result<Role, AppError> {
    Role::parse(value).ok_or_else(|| AppError::Validation(format!("Unknown profile '{}'", value)))
}

async fn require(app: &App, roles: &[Role]) -> Result<Session, AppError> {
    app.sessions.require_role(roles).await?.ok_or_else(|| {
        let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
        AppError::RoleMismatch(format!("Log in as {} first", names.join(" or ")))
    })
}

async fn watch(
    store: &Arc<DataStore>,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let watcher = store.watch_external(interval);
    let mut events = store.subscribe();
    tracing::info!("Watching for changes, press Ctrl+C to stop");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => println!("{}", serde_json::to_string(&event)?),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watcher.abort();
    Ok(())
}
