use std::fmt::Display;

use colored::Colorize;
use communal_collab::CollabEvent;
use log::{info, Level};

/// External crates only need to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];
const ALLOWED_LEVELS: [Level; 3] = [Level::Info, Level::Warn, Level::Error];

pub fn init_logger() -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_to_string(&record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                message
            ))
        })
        .filter(|meta| {
            let target = Target::from_str(meta.target());

            let is_allowed = ALLOWED_LEVELS.contains(&meta.level());
            let is_severe = ALLOWED_EXTERNAL_LEVELS.contains(&meta.level());

            target.is_local() && is_allowed || is_severe
        })
        .chain(std::io::stdout())
        .apply()
}

/// Logs a collab event once it has been committed.
/// This is the only info level record of these operations, the collab crate logs them at debug.
pub fn log_event(event: &CollabEvent) {
    info!("{}", event_message(event))
}

fn event_message(event: &CollabEvent) -> String {
    match event {
        CollabEvent::AccountCreated { user_id } => {
            format!("Account {} was created", user_id.to_string().bold())
        }
        CollabEvent::UserSignedIn { user_id } => {
            format!("User {} signed in", user_id.to_string().bold())
        }
        CollabEvent::UserSignedOut { user_id } => {
            format!("User {} signed out", user_id.to_string().bold())
        }
        CollabEvent::CommunityCreated {
            name,
            creator_id,
            privacy_type,
        } => format!(
            "Community {} ({}) was created by {}",
            format!("r/{name}").bold(),
            privacy_type,
            creator_id
        ),
    }
}

enum Target {
    External(String),
    Server,
    Collab,
    Core,
    Store,
    App,
}

impl Target {
    fn from_str(str: &str) -> Self {
        let module = str.split("::").next().unwrap_or_default();

        match module {
            "communal" => Self::App,
            "communal_core" => Self::Core,
            "communal_impls" => Self::Store,
            "communal_server" => Self::Server,
            "communal_collab" => Self::Collab,
            other => Target::External(other.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::Server => "SERVER".bright_green(),
            Target::Collab => "COLLAB".bright_purple(),
            Target::Core => "CORE".blue(),
            Target::Store => "STORE".cyan(),
            Target::App => "COMMUNAL".bright_white(),
        };

        Display::fmt(&result, f)
    }
}

fn level_to_string(level: &Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}
