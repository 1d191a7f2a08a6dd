use crate::batch::{run_evaluate, run_quote, EvaluateArgs, QuoteArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use retail_discounts::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Retail Discount Engine",
    about = "Price retail transactions with rule-based discounts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Price every transaction in a CSV file and persist the results
    Evaluate(EvaluateArgs),
    /// Show the per-rule breakdown for a single transaction
    Quote(QuoteArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Quote(args) => {
            run_quote(args);
            Ok(())
        }
    }
}
