use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use passlock::{CredentialStore, Error, FileCipher, default_users_path};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "passlock")]
#[command(
    version,
    about = "Password-file user authentication and AES-256-CBC file encryption."
)]
struct Cli {
    /// Path to the credentials file
    #[arg(long, global = true, value_name = "PATH", env = "PASSLOCK_USERS")]
    users: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Registers a new user in the credentials file
    #[command(arg_required_else_help = true)]
    Register { username: String },

    /// Checks a username and password against the credentials file
    #[command(arg_required_else_help = true)]
    Login { username: String },

    /// Encrypts a file under a password
    #[command(arg_required_else_help = true)]
    Encrypt { input: PathBuf, output: PathBuf },

    /// Decrypts a previously encrypted file
    #[command(arg_required_else_help = true)]
    Decrypt { input: PathBuf, output: PathBuf },
}

fn resolve_users(path: Option<PathBuf>) -> Result<CredentialStore> {
    match path {
        Some(p) => Ok(CredentialStore::new(p)),
        None => {
            let path =
                default_users_path().context("could not resolve the credentials file path")?;
            Ok(CredentialStore::new(path))
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    match args.command {
        Commands::Register { username } => {
            let store = resolve_users(args.users)?;
            let password = auth::read_new_password_with_confirmation()?;
            store.register(&username, &password)?;
            println!("registered user '{username}' in {}", store.path().display());
        }
        Commands::Login { username } => {
            let store = resolve_users(args.users)?;
            let password = auth::read_password()?;
            match store.authenticate(&username, &password) {
                Ok(true) => println!("authentication successful"),
                // an unknown user reads the same as a bad password
                Ok(false) | Err(Error::UserNotFound(_)) => {
                    eprintln!("authentication failed");
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Encrypt { input, output } => {
            let password = auth::read_new_password_with_confirmation()?;
            FileCipher::new().encrypt(&input, &output, &password)?;
            println!("encrypted '{}' to '{}'", input.display(), output.display());
        }
        Commands::Decrypt { input, output } => {
            let password = auth::read_password()?;
            match FileCipher::new().decrypt(&input, &output, &password) {
                Ok(()) => {
                    println!("decrypted '{}' to '{}'", input.display(), output.display());
                }
                Err(e @ Error::WrongPasswordOrCorrupt) => {
                    eprintln!("{e}");
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
