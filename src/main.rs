//! castlist - parameterized, read-only queries over a movie database.

use castlist::cli::{parse_params, Cli, Command};
use castlist::config::Config;
use castlist::db::{self, Query};
use castlist::error::{CastlistError, Result};
use castlist::exercises;
use castlist::logging;
use castlist::output::ResultFormatter;
use castlist::query::QueryExecutor;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    match &cli.log_file {
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.parse_output_format().map_err(CastlistError::config)?;
    let formatter = ResultFormatter::new(format);

    if cli.command == Command::List {
        print!("{}", formatter.format_catalog(exercises::CATALOG)?);
        return Ok(());
    }

    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let connection = cli.resolve_connection(&config)?.ok_or_else(|| {
        CastlistError::config(
            "No database connection configured. Pass a connection string, set DATABASE_URL, \
             or use --help for usage information.",
        )
    })?;
    info!("Connection: {}", connection.display_string());

    let client = db::connect(&connection).await?;
    let executor =
        QueryExecutor::new(client.as_ref()).with_timeout(config.executor.query_timeout());

    let result = match &cli.command {
        Command::Run { exercise, args } => exercises::run(&executor, exercise, args).await,
        Command::Sql { query, params } => match Query::new(query) {
            Ok(query) => executor.execute(&query, &parse_params(params)).await,
            Err(e) => Err(e),
        },
        Command::List => return Ok(()),
    };

    client.close().await?;

    print!("{}", formatter.format(&result?)?);
    Ok(())
}
