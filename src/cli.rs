use clap::{Args, Parser, Subcommand};
use leadyard::{
    config::{
        database,
        master_data::{MasterData, load_master_data_file},
        settings::Settings,
    },
    core::{
        admin::{AdminBootstrap, create_admin_user},
        master_data::load_master_data,
    },
    errors::Result,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "leadyard",
    about = "Administer the construction lead scoring and ledger database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed reference data (stages, statuses, roles, urgency levels, credit types)
    LoadMasterData(LoadMasterDataArgs),
    /// Create the superuser named by ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD
    CreateAdminUser,
}

#[derive(Args, Debug)]
struct LoadMasterDataArgs {
    /// TOML file to load instead of the built-in data set
    #[arg(long)]
    file: Option<PathBuf>,
    /// Delete existing reference rows before loading
    #[arg(long)]
    reset: bool,
}

pub(crate) async fn run(settings: Settings) -> Result<()> {
    let cli = Cli::parse();

    database::ensure_sqlite_parent_dir(&settings.database_url)?;
    let db = database::create_connection(&settings.database_url).await?;
    database::create_tables(&db).await?;

    match cli.command {
        Command::LoadMasterData(args) => {
            let data = match &args.file {
                Some(path) => load_master_data_file(path)?,
                None => MasterData::builtin()?,
            };
            let report = load_master_data(&db, &data, args.reset).await?;
            let created: usize = report.tables.iter().map(|load| load.created).sum();
            info!("Master data loaded: {created} rows created");
        }
        Command::CreateAdminUser => match &settings.admin {
            None => warn!(
                "ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD must all be set; no admin user created"
            ),
            Some(credentials) => match create_admin_user(&db, credentials).await? {
                AdminBootstrap::Created(user) => info!("Admin user {} ready", user.username),
                AdminBootstrap::AlreadyExists => {
                    info!("Admin user {} already exists", credentials.username);
                }
            },
        },
    }

    Ok(())
}
