use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use petadopt::{
    db,
    models::{Account, ProfileType},
    repositories::SqliteAccountRepository,
    services::{AccountService, RegisterRequest},
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "petadopt-cli")]
#[command(about = "CLI tool for managing PetAdopt accounts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account management commands
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create a new account with a USER profile
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,

        /// Mark email as verified
        #[arg(long)]
        verified: bool,
    },

    /// List all accounts
    List {
        /// Maximum number of accounts to display
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        /// Offset for pagination
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Attach a profile (USER, SHELTER or ADMIN) to an account
    GrantProfile {
        #[arg(short, long)]
        email: String,

        #[arg(short = 't', long = "type")]
        profile_type: ProfileType,

        /// Display name (defaults to the email address)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Block an account; it can no longer log in or refresh
    Block {
        #[arg(short, long)]
        email: String,
    },

    /// Lift a block
    Unblock {
        #[arg(short, long)]
        email: String,
    },

    /// Soft-delete an account
    Delete {
        #[arg(short, long)]
        email: String,
    },

    /// Mark an account's email as verified
    Verify {
        #[arg(short, long)]
        email: String,
    },
}

fn get_password(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout().flush()?;

    Ok(rpassword::read_password()?)
}

async fn require_account(service: &AccountService, email: &str) -> anyhow::Result<Account> {
    service
        .find_by_email(email)
        .await
        .map_err(|e| anyhow!("Failed to find account: {}", e))?
        .with_context(|| format!("Account '{}' not found", email))
}

async fn set_blocked(service: &AccountService, email: &str, blocked: bool) -> anyhow::Result<()> {
    let account = require_account(service, email).await?;
    if account.is_deleted {
        bail!("Account '{}' is deleted", email);
    }

    service
        .set_blocked(account.id, blocked)
        .await
        .map_err(|e| anyhow!("Failed to update account: {}", e))?;

    if blocked {
        println!("✅ Account '{}' blocked", email);
    } else {
        println!("✅ Account '{}' unblocked", email);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/petadopt.db".to_string());

    // Connect to database
    let pool = db::create_pool(&database_url)
        .await
        .context("Failed to open database")?;

    // Run migrations
    db::run_migrations(&pool).await?;

    let repository = Arc::new(SqliteAccountRepository::new(pool));
    let service = AccountService::new(repository);

    // Parse CLI arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Account { command } => match command {
            AccountCommands::Create {
                email,
                password,
                verified,
            } => {
                let (password, password_confirm) = match password {
                    Some(pw) => (pw.clone(), pw),
                    None => (get_password("Password")?, get_password("Confirm password")?),
                };

                let (account, profiles) = service
                    .register(RegisterRequest {
                        email,
                        password,
                        password_confirm: Some(password_confirm),
                        is_verified: verified,
                    })
                    .await
                    .map_err(|e| anyhow!("Failed to create account: {}", e))?;

                println!("✅ Account created successfully!");
                println!("  ID: {}", account.id);
                println!("  Email: {}", account.email);
                println!("  Verified: {}", account.is_verified);
                for profile in profiles {
                    println!("  Profile: {} ({})", profile.name, profile.profile_type);
                }
            }

            AccountCommands::List { limit, offset } => {
                let accounts = service
                    .list_accounts(Some(limit), Some(offset))
                    .await
                    .map_err(|e| anyhow!("Failed to list accounts: {}", e))?;

                if accounts.is_empty() {
                    println!("No accounts found.");
                } else {
                    println!(
                        "{:<5} {:<40} {:<10} {:<10} {:<20}",
                        "ID", "Email", "Verified", "Status", "Created"
                    );
                    println!("{}", "-".repeat(88));
                    for account in accounts {
                        let status = if account.is_deleted {
                            "deleted"
                        } else if account.is_blocked {
                            "blocked"
                        } else {
                            "active"
                        };
                        println!(
                            "{:<5} {:<40} {:<10} {:<10} {:<20}",
                            account.id,
                            account.email,
                            if account.is_verified { "Yes" } else { "No" },
                            status,
                            account.created_at.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }
            }

            AccountCommands::GrantProfile {
                email,
                profile_type,
                name,
            } => {
                let account = require_account(&service, &email).await?;
                let name = name.unwrap_or_else(|| account.email.clone());
                let profile = service
                    .grant_profile(account.id, &name, profile_type)
                    .await
                    .map_err(|e| anyhow!("Failed to grant profile: {}", e))?;

                println!(
                    "✅ Granted {} profile '{}' to '{}'",
                    profile.profile_type, profile.name, account.email
                );
            }

            AccountCommands::Block { email } => set_blocked(&service, &email, true).await?,

            AccountCommands::Unblock { email } => set_blocked(&service, &email, false).await?,

            AccountCommands::Delete { email } => {
                let account = require_account(&service, &email).await?;
                service
                    .soft_delete(account.id)
                    .await
                    .map_err(|e| anyhow!("Failed to delete account: {}", e))?;
                println!("✅ Account '{}' deleted", email);
            }

            AccountCommands::Verify { email } => {
                let account = require_account(&service, &email).await?;
                if account.is_verified {
                    println!("ℹ️  Account '{}' is already verified", email);
                } else {
                    service
                        .mark_verified(account.id)
                        .await
                        .map_err(|e| anyhow!("Failed to verify account: {}", e))?;
                    println!("✅ Account '{}' email verified successfully!", email);
                }
            }
        },
    }

    Ok(())
}
