use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::exit;
use tidepool::{
    models::{
        identity::{create_local_identity, find_identity_by_user_id},
        user::{create_user, find_user_by_login_name, update_password, User, UserDraft},
    },
    AppConfig,
};
use tracing::Level;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a local account together with its identity
    CreateAccount {
        login_name: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Reset a user's password
    ResetPassword { login_name: String },
    /// Get user information by login name
    GetUser { login_name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing/logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let cli = Cli::parse();

    let config_path = cli
        .config
        .ok_or_else(|| anyhow::anyhow!("Config file path required"))?;
    let cfg = AppConfig::new_from_file_and_env(&config_path).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        exit(1);
    });

    let db = match cfg.connect_database().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("error connecting to database: {}", e);
            exit(1);
        }
    };
    let mut tx = db.begin().await?;

    match &cli.command {
        Commands::CreateAccount {
            login_name,
            display_name,
        } => {
            let password = rpassword::prompt_password("Password: ")
                .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))?;
            let password2 = rpassword::prompt_password("Password (again): ")
                .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))?;

            if password != password2 {
                eprintln!("Passwords do not match");
                exit(1);
            }

            let user_draft = UserDraft::new(login_name.clone(), password)?;
            let user = create_user(&mut tx, user_draft).await?;

            let display = display_name.clone().unwrap_or_else(|| login_name.clone());
            let identity = create_local_identity(&mut tx, user.id, login_name, &display).await?;
            tx.commit().await?;

            println!("Created account {} ({})", identity.handle(), user.id);
        }
        Commands::ResetPassword { login_name } => {
            let user = find_user_by_login_name(&mut tx, login_name).await;
            match user {
                Ok(Some(user)) => {
                    print_user_info(&user);
                    println!();
                    let password = rpassword::prompt_password("New password: ")
                        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))?;
                    let password2 = rpassword::prompt_password("New password (again): ")
                        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))?;

                    if password != password2 {
                        eprintln!("Passwords do not match");
                        exit(1);
                    }

                    update_password(&mut tx, user.id, password).await?;
                    tx.commit().await?;

                    println!("Password updated");
                }
                Ok(None) => {
                    println!("User not found");
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    exit(1);
                }
            }
        }
        Commands::GetUser { login_name } => {
            let user = find_user_by_login_name(&mut tx, login_name).await;
            match user {
                Ok(Some(user)) => {
                    print_user_info(&user);
                    if let Some(identity) = find_identity_by_user_id(&mut tx, user.id).await? {
                        println!("Handle: {}", identity.handle());
                        println!(
                            "Default Post Visibility: {:?}",
                            identity.default_post_visibility
                        );
                    }
                }
                Ok(None) => {
                    println!("User not found");
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    exit(1);
                }
            }
        }
    }

    Ok(())
}

fn print_user_info(user: &User) {
    println!("ID: {}", user.id);
    println!("Login Name: {}", user.login_name);
    println!("Signup Date: {:?}", user.created_at);
}
