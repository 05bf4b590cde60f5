use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use expense_desk::api::ExpenseApi;
use expense_desk::config::{ClientConfig, ConfigError, Timeouts, default_storage_path};
use expense_desk::schemas::{ExpenseCreate, ExpenseUpdate, LoginCredentials, Page, UserCreate};
use expense_desk::{App, ClientError, NavigationError};
use serde::Serialize;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("not logged in; run `expense-desk login` first")]
    NotLoggedIn,
    #[error("login succeeded but the user profile could not be loaded")]
    ProfileUnavailable,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("session storage failed: {0}")]
    Storage(#[from] expense_desk::storage::StorageError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "expense-desk", about = "Expense tracker API client")]
struct Cli {
    #[arg(long, env = "EXPENSE_API_BASE_URL", default_value = expense_desk::config::DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "EXPENSE_API_TIMEOUT_SECS", default_value_t = expense_desk::config::DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(long, env = "EXPENSE_API_CONNECT_TIMEOUT_SECS", default_value_t = expense_desk::config::DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[arg(long, env = "EXPENSE_STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    /// Log requests and responses.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange credentials for a token and store it.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "EXPENSE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in with it.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "EXPENSE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Forget the stored token.
    Logout,
    /// Show the logged-in user.
    Whoami,
    Expenses(ExpensesCommand),
    /// Run the navigation guard for a path and print where it lands.
    Navigate { path: String },
    /// List the route table.
    Routes,
}

#[derive(Args, Debug)]
struct ExpensesCommand {
    #[command(subcommand)]
    command: ExpensesSubcommand,
}

#[derive(Subcommand, Debug)]
enum ExpensesSubcommand {
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = expense_desk::schemas::expense::DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
    Create {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Replace an expense's fields. The API rejects updates without an amount.
    Update {
        expense_id: i64,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    Delete {
        expense_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();

    let timeouts = Timeouts { request_secs: cli.timeout_secs, connect_secs: cli.connect_timeout_secs };
    let storage_path = cli.storage_path.unwrap_or_else(default_storage_path);
    let config = ClientConfig::new(&cli.base_url, timeouts, storage_path)?;
    let app = App::start(&config)?;

    match cli.command {
        Command::Login { email, password } => run_login(&app, &LoginCredentials::new(&email, &password)).await,
        Command::Register { email, password, full_name } => {
            run_register(&app, &UserCreate { email, password, full_name }).await
        }
        Command::Logout => {
            app.store().logout()?;
            println!("logged out");
            Ok(())
        }
        Command::Whoami => run_whoami(&app).await,
        Command::Expenses(expenses) => run_expenses(&app, expenses).await,
        Command::Navigate { path } => run_navigate(&app, &path).await,
        Command::Routes => {
            for route in app.router().table().routes() {
                let auth = if route.requires_auth { "auth" } else { "public" };
                match route.redirect {
                    Some(to) => println!("{:<14} {:<8} {} -> {to}", route.path, auth, route.name),
                    None => println!("{:<14} {:<8} {}", route.path, auth, route.name),
                }
            }
            Ok(())
        }
    }
}

async fn run_login(app: &App, credentials: &LoginCredentials) -> Result<(), CliError> {
    app.store().login(credentials).await?;
    let user = app.store().current_user().ok_or(CliError::ProfileUnavailable)?;
    print_json(&user)
}

async fn run_register(app: &App, new_user: &UserCreate) -> Result<(), CliError> {
    app.store().register(new_user).await?;
    let user = app.store().current_user().ok_or(CliError::ProfileUnavailable)?;
    print_json(&user)
}

async fn run_whoami(app: &App) -> Result<(), CliError> {
    if !app.session().has_token() {
        return Err(CliError::NotLoggedIn);
    }
    let user = app.store().fetch_current_user().await.ok_or(CliError::NotLoggedIn)?;
    print_json(&user)
}

async fn run_expenses(app: &App, expenses: ExpensesCommand) -> Result<(), CliError> {
    if !app.session().has_token() {
        return Err(CliError::NotLoggedIn);
    }
    let api: &ExpenseApi = app.expenses();
    match expenses.command {
        ExpensesSubcommand::List { skip, limit } => print_json(&api.list_mine(Page { skip, limit }).await?),
        ExpensesSubcommand::Create { amount, description, category, date } => {
            let created = api.create(&ExpenseCreate { description, amount, category, date }).await?;
            print_json(&created)
        }
        ExpensesSubcommand::Update { expense_id, amount, description, category, date } => {
            let changes = ExpenseUpdate { description, amount: Some(amount), category, date };
            print_json(&api.update(expense_id, &changes).await?)
        }
        ExpensesSubcommand::Delete { expense_id } => print_json(&api.delete(expense_id).await?),
    }
}

async fn run_navigate(app: &App, path: &str) -> Result<(), CliError> {
    let nav = app.router().navigate(app.store(), path).await?;
    if nav.redirected() {
        println!("{} -> {}", nav.requested, nav.landed);
    } else {
        println!("{}", nav.landed);
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
