use std::{env, sync::Arc, thread};

use colored::Colorize;
use communal_collab::Collab;
use communal_core::{ArcedStore, Config, DocumentStore, StoreError};
use communal_impls::{MemoryStore, PgStore};
use communal_server::{ServerContext, DEFAULT_PORT};
use log::{error, info, warn};
use thiserror::Error;
use tokio::runtime::{self, Runtime};

mod logging;

const DATABASE_URL_VAR: &str = "COMMUNAL_DATABASE_URL";
const SERVER_PORT_VAR: &str = "COMMUNAL_SERVER_PORT";
const TRANSACTION_TIMEOUT_VAR: &str = "COMMUNAL_TRANSACTION_TIMEOUT";

struct Communal {
    collab: Arc<Collab<dyn DocumentStore>>,
    port: u16,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum CommunalError {
    #[error("Could not initialize store: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Communal {
    fn new() -> Result<Self, CommunalError> {
        info!("Building async runtime...");
        let main_runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("communal-async")
            .build()
            .map_err(|e| CommunalError::Fatal(e.to_string()))?;

        let config = config_from_env()?;
        let port = port_from_env()?;

        let store: ArcedStore = match env::var(DATABASE_URL_VAR) {
            Ok(url) => {
                info!("Connecting to database...");
                Arc::new(main_runtime.block_on(PgStore::new(&url))?)
            }
            Err(_) => {
                warn!(
                    "{} is not set, documents are kept in memory and lost on exit",
                    DATABASE_URL_VAR
                );
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self {
            collab: Arc::new(Collab::new(config, store)),
            port,
            runtime: main_runtime,
        })
    }

    fn run(&self) -> std::io::Result<()> {
        let events = self.collab.events();
        thread::spawn(move || {
            for event in events.iter() {
                logging::log_event(&event)
            }
        });

        let context = ServerContext {
            collab: self.collab.clone(),
        };

        self.runtime
            .block_on(communal_server::run_server(context, self.port))
    }
}

impl CommunalError {
    fn hint(&self) -> String {
        match self {
            CommunalError::Store(_) => format!("This is a database error. Make sure PostgreSQL is running and {DATABASE_URL_VAR} points to it, then try again."),
            CommunalError::Config(_) => format!("Check {SERVER_PORT_VAR} and {TRANSACTION_TIMEOUT_VAR}, or unset them to use the defaults."),
            CommunalError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn config_from_env() -> Result<Config, CommunalError> {
    let config = Config::default();

    match env::var(TRANSACTION_TIMEOUT_VAR) {
        Ok(value) => {
            let seconds: f32 = value.parse().map_err(|_| {
                CommunalError::Config(format!("{TRANSACTION_TIMEOUT_VAR} must be a number of seconds"))
            })?;

            if !seconds.is_finite() || seconds <= 0. {
                return Err(CommunalError::Config(format!(
                    "{TRANSACTION_TIMEOUT_VAR} must be positive"
                )));
            }

            Ok(config.with_transaction_timeout(seconds))
        }
        Err(_) => Ok(config),
    }
}

fn port_from_env() -> Result<u16, CommunalError> {
    match env::var(SERVER_PORT_VAR) {
        Ok(value) => value
            .parse()
            .map_err(|_| CommunalError::Config(format!("{SERVER_PORT_VAR} must be a port number"))),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

fn main() {
    if let Err(error) = logging::init_logger() {
        eprintln!("Could not initialize logger: {error}");
    }

    match Communal::new() {
        Ok(communal) => {
            info!("Initialized successfully.");

            if let Err(error) = communal.run() {
                error!("Server stopped: {error}");
            }
        }
        Err(error) => {
            error!("{} Read the error below to troubleshoot the issue.", "Communal failed to start!".bold().red());
            error!("{}", error);
            error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
        }
    }
}
