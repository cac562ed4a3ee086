//! Operator CLI for the account store.
//!
//! Talks to PostgreSQL through the same domain services as the HTTP API, so
//! the last-admin and protected-account rules apply here too.

use std::ffi::OsString;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;

use accounts_backend::domain::ports::{AccountManager, InvitationCodes, RoleChange};
use accounts_backend::domain::{AccountService, InvitationService, Password, RoleSet, UserName};
use accounts_backend::outbound::persistence::{
    DbPool, DieselInvitationCodeRepository, DieselUserRepository, PoolConfig,
    run_pending_migrations,
};
use accounts_backend::settings::ServerSettings;

/// `accounts-admin` command arguments.
#[derive(Debug, Parser)]
#[command(name = "accounts-admin", about = "Manage forum accounts and invitations", version)]
struct CliArgs {
    /// Database connection URL. Falls back to `ACCOUNTS_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the first administrator on an empty store.
    Bootstrap {
        #[arg(long = "user-name")]
        user_name: String,
        /// Read from `ACCOUNTS_ADMIN_PASSWORD` when omitted.
        #[arg(long, env = "ACCOUNTS_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Issue an invitation code, e.g. `--grants student,reviewer`.
    Invite {
        #[arg(long)]
        grants: String,
    },
    /// Print every account.
    List,
    /// Delete a non-administrator account.
    Delete { user_name: String },
    /// Replace an account's roles, e.g. `roles B instructor,staff`.
    Roles { user_name: String, roles: String },
}

struct Services {
    accounts: AccountService<DieselUserRepository>,
    invitations: InvitationService<DieselInvitationCodeRepository, DieselUserRepository>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn connect(database_url: Option<String>) -> Result<Services> {
    let settings = ServerSettings::load_from_iter([OsString::from("accounts-admin")])
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let database_url = database_url.unwrap_or_else(|| settings.database_url().to_owned());

    run_pending_migrations(&database_url)
        .await
        .wrap_err("failed to apply migrations")?;
    let pool = DbPool::new(PoolConfig::new(&database_url).with_max_size(2))
        .await
        .wrap_err("failed to create database pool")?;

    let users = Arc::new(DieselUserRepository::new(pool.clone()));
    let codes = Arc::new(DieselInvitationCodeRepository::new(pool));
    Ok(Services {
        accounts: AccountService::new(users.clone()),
        invitations: InvitationService::new(codes, users, Arc::new(DefaultClock)),
    })
}

fn user_name(raw: &str) -> Result<UserName> {
    UserName::new(raw).map_err(|err| eyre!("invalid user name {raw:?}: {err}"))
}

fn roles(raw: &str) -> Result<RoleSet> {
    raw.parse::<RoleSet>()
        .map_err(|err| eyre!("invalid roles {raw:?}: {err}"))
}

async fn run(args: CliArgs) -> Result<()> {
    let services = connect(args.database_url).await?;
    match args.command {
        Command::Bootstrap {
            user_name: name,
            password,
        } => {
            let name = user_name(&name)?;
            let password = Password::new(password).map_err(|err| eyre!("{err}"))?;
            services
                .accounts
                .register_initial_admin(&name, &password)
                .await?;
            println!("created administrator {name}");
        }
        Command::Invite { grants } => {
            let grants = roles(&grants)?;
            let code = services.invitations.generate_code(&grants).await?;
            println!("{code}\t{grants}");
        }
        Command::List => {
            for summary in services.accounts.list_users().await? {
                println!("{summary}");
            }
        }
        Command::Delete { user_name: name } => {
            let name = user_name(&name)?;
            services.accounts.delete_user(&name).await?;
            println!("deleted {name}");
        }
        Command::Roles {
            user_name: name,
            roles: raw,
        } => {
            let name = user_name(&name)?;
            let next = roles(&raw)?;
            match services.accounts.change_roles(&name, &next).await? {
                RoleChange::Applied => println!("{name} now holds {next}"),
                RoleChange::Rejected => {
                    return Err(eyre!(
                        "refused: {name} is the only administrator and {next} drops admin"
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[rstest]
    #[case(&["accounts-admin", "list"])]
    #[case(&["accounts-admin", "invite", "--grants", "student,reviewer"])]
    #[case(&["accounts-admin", "roles", "B", "instructor"])]
    #[case(&["accounts-admin", "--database-url", "postgres://db/forum", "delete", "B"])]
    fn subcommands_parse(#[case] argv: &[&str]) {
        assert!(CliArgs::try_parse_from(argv).is_ok());
    }

    #[test]
    fn unknown_roles_are_refused_before_connecting() {
        assert!(roles("student, moderator").is_err());
    }
}
