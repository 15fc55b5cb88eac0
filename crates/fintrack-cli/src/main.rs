//! FinTrack CLI - sign in and manage transactions and budgets from the terminal.

mod commands;

use std::io;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fintrack_core::auth::open_store;
use fintrack_core::models::{BudgetPeriod, TransactionKind};
use fintrack_core::{Config, FinanceApi, SessionManager};

#[derive(Debug, Parser)]
#[command(name = "fintrack", version, about = "Personal finance tracking client")]
struct Cli {
    /// Backend base URL, overriding the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account (does not sign in)
    Register,
    /// Balance, income and expense summary
    Dashboard,
    /// Edit name, email or currency
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Change the account password
    Password,
    #[command(subcommand)]
    Transactions(TransactionCommand),
    #[command(subcommand)]
    Budgets(BudgetCommand),
}

#[derive(Debug, Subcommand)]
enum TransactionCommand {
    List {
        #[arg(long = "type")]
        kind: Option<TransactionKind>,
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        category: Option<String>,
    },
    Add {
        #[arg(long = "type")]
        kind: TransactionKind,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum BudgetCommand {
    List,
    Add {
        #[arg(long)]
        category: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = BudgetPeriod::Monthly)]
        period: BudgetPeriod,
    },
    Delete {
        id: String,
    },
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() -> WorkerGuard {
    // RUST_LOG controls the level, e.g. RUST_LOG=fintrack_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let store = open_store(config.credential_backend, &config.data_dir()?);
    let session = SessionManager::new(&config, store)?;
    let status = session.bootstrap().await;
    info!(?status, "Session ready");

    let api = FinanceApi::new(session.gateway().clone(), config.endpoints.clone());
    let mut ctx = commands::Context {
        config,
        session,
        api,
    };

    match cli.command {
        Command::Login { username } => commands::login(&mut ctx, username).await,
        Command::Logout => commands::logout(&ctx),
        Command::Whoami => commands::whoami(&ctx),
        Command::Register => commands::register(&ctx).await,
        Command::Dashboard => commands::dashboard(&ctx).await,
        Command::Profile {
            name,
            email,
            currency,
        } => commands::update_profile(&ctx, name, email, currency).await,
        Command::Password => commands::change_password(&ctx).await,
        Command::Transactions(TransactionCommand::List {
            kind,
            from,
            to,
            category,
        }) => commands::list_transactions(&ctx, kind, from, to, category).await,
        Command::Transactions(TransactionCommand::Add {
            kind,
            amount,
            description,
            category,
            date,
        }) => commands::add_transaction(&ctx, kind, amount, description, category, date).await,
        Command::Transactions(TransactionCommand::Delete { id }) => {
            commands::delete_transaction(&ctx, &id).await
        }
        Command::Budgets(BudgetCommand::List) => commands::list_budgets(&ctx).await,
        Command::Budgets(BudgetCommand::Add {
            category,
            amount,
            period,
        }) => commands::add_budget(&ctx, category, amount, period).await,
        Command::Budgets(BudgetCommand::Delete { id }) => commands::delete_budget(&ctx, &id).await,
    }
}
