use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Currency, Engine, MerchantCredentials};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "tally_admin")]
#[command(about = "Admin utilities for Tally (merchants and API tokens)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./tally.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Merchant(Merchant),
}

#[derive(Args, Debug)]
struct Merchant {
    #[command(subcommand)]
    command: MerchantCommand,
}

#[derive(Subcommand, Debug)]
enum MerchantCommand {
    /// Creates a merchant and prints its API token.
    Create(MerchantCreateArgs),
    /// Replaces the API token of a merchant; the old one stops working.
    RotateToken(RotateTokenArgs),
    List,
}

#[derive(Args, Debug)]
struct MerchantCreateArgs {
    #[arg(long)]
    username: String,
    /// Base currency of the ledger (ISO 4217).
    #[arg(long, default_value = "EUR")]
    currency: String,
}

#[derive(Args, Debug)]
struct RotateTokenArgs {
    #[arg(long)]
    username: String,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_credentials(action: &str, credentials: &MerchantCredentials) {
    println!(
        "{action} merchant: {} ({}, {})",
        credentials.merchant.username, credentials.merchant.id, credentials.merchant.base_currency
    );
    println!("api token: {}", credentials.api_token);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Merchant(Merchant { command }) => match command {
            MerchantCommand::Create(args) => {
                let currency = match Currency::try_from(args.currency.as_str()) {
                    Ok(currency) => currency,
                    Err(err) => {
                        eprintln!("{err}");
                        std::process::exit(2);
                    }
                };
                let credentials = engine.create_merchant(&args.username, currency).await?;
                print_credentials("created", &credentials);
            }
            MerchantCommand::RotateToken(args) => {
                let credentials = engine.rotate_token(&args.username).await?;
                print_credentials("rotated token of", &credentials);
            }
            MerchantCommand::List => {
                for merchant in engine.list_merchants().await? {
                    println!(
                        "{}\t{}\t{}\t{}",
                        merchant.id,
                        merchant.username,
                        merchant.base_currency,
                        merchant.created_at.to_rfc3339()
                    );
                }
            }
        },
    }

    Ok(())
}
