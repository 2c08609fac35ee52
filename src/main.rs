use clap::{Parser, Subcommand};
use mallpass::application::mall::{ExitOutcome, MallService, TrackOutcome};
use mallpass::config::Config;
use mallpass::domain::geofence::Coordinate;
use mallpass::domain::money::Amount;
use mallpass::domain::ports::{BalanceStoreBox, SessionStoreBox, UserStoreBox};
use mallpass::domain::user::{UserId, UserProfile};
use mallpass::infrastructure::json_file::JsonFileStore;
use mallpass::interfaces::csv::report_writer::{ENTRY_TIME_FORMAT, ReportWriter};
use mallpass::interfaces::location::FixedLocation;
use mallpass::interfaces::payment::{RechargeRequest, upi_intent};
use miette::{IntoDiagnostic, Result};
use std::io;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding sessions.json, balance.json and users.json
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    /// Requires the `storage-rocksdb` feature.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ProfileArgs {
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
}

impl From<ProfileArgs> for UserProfile {
    fn from(args: ProfileArgs) -> Self {
        UserProfile::new(args.name, args.email, args.phone)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Sign up with an email or phone number
    Register(ProfileArgs),
    /// Check a user id against the demo OTP
    SignIn {
        user_id: String,
        #[arg(long)]
        otp: String,
    },
    /// Book an entry ticket and start a session
    Enter(ProfileArgs),
    /// Close the session and bill the stay
    Exit { user_id: String },
    /// Report a position fix; leaving the geofence exits the mall
    Track {
        user_id: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Add prepaid balance (10 to 1000, in steps of 10)
    TopUp { user_id: String, amount: Amount },
    /// Show the current balance
    Balance { user_id: String },
    /// Print the UPI payment intent for a recharge
    Pay { amount: Amount },
    /// List users currently inside the mall
    Sessions {
        /// Emit the report as CSV
        #[arg(long)]
        csv: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_stores(cli: &Cli, config: &Config) -> Result<(UserStoreBox, SessionStoreBox, BalanceStoreBox)> {
    if let Some(db_path) = &cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            let store = mallpass::infrastructure::rocksdb::RocksDBStore::open(db_path)
                .into_diagnostic()?;
            debug!(path = %db_path.display(), "using rocksdb store");
            return Ok((
                Box::new(store.clone()),
                Box::new(store.clone()),
                Box::new(store),
            ));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            miette::bail!(
                "--db-path {} requires building with the storage-rocksdb feature",
                db_path.display()
            );
        }
    }

    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());
    let store = JsonFileStore::open(&data_dir).into_diagnostic()?;
    debug!(path = %data_dir.display(), "using json file store");
    Ok((
        Box::new(store.clone()),
        Box::new(store.clone()),
        Box::new(store),
    ))
}

fn describe_exit(user_id: &UserId, outcome: &ExitOutcome) -> String {
    match outcome {
        ExitOutcome::NoActiveSession => format!("No active session found for {user_id}."),
        ExitOutcome::NoCharge { .. } => "Stayed within the free period. No charges.".to_string(),
        ExitOutcome::Charged { amount, balance } => {
            format!("{amount} deducted from your balance. Remaining balance: {balance}.")
        }
        ExitOutcome::InsufficientBalance { charge, balance } => format!(
            "Insufficient balance: charge of {charge} not collected (balance {balance}). Please recharge!"
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path).into_diagnostic()?,
        None => Config::default(),
    };

    let (users, sessions, balances) = open_stores(&cli, &config)?;
    let mall = MallService::new(users, sessions, balances, config.mall_settings());

    match cli.command {
        Command::Register(profile) => {
            let user_id = mall.register(profile.into()).await.into_diagnostic()?;
            println!("Registered {user_id}. You can now sign in.");
        }
        Command::SignIn { user_id, otp } => {
            let user_id = mall.sign_in(&user_id, &otp).await.into_diagnostic()?;
            println!("Login successful: {user_id}");
        }
        Command::Enter(profile) => {
            let profile: UserProfile = profile.into();
            let name = profile.name.clone();
            let user_id = mall.enter(profile).await.into_diagnostic()?;
            println!("Ticket booked! Welcome {name} ({user_id})");
        }
        Command::Exit { user_id } => {
            let user_id = UserId::parse(&user_id).into_diagnostic()?;
            let outcome = mall.exit(&user_id).await.into_diagnostic()?;
            println!("{}", describe_exit(&user_id, &outcome));
        }
        Command::Track { user_id, lat, lon } => {
            let user_id = UserId::parse(&user_id).into_diagnostic()?;
            let provider = FixedLocation::new(Coordinate::new(lat, lon));
            match mall.track_with(&user_id, &provider).await.into_diagnostic()? {
                TrackOutcome::InsideMall => {
                    println!("You are within the mall range. No ticket is needed.");
                }
                TrackOutcome::LeftMall(outcome) => {
                    println!("You are outside the mall.");
                    println!("{}", describe_exit(&user_id, &outcome));
                }
            }
        }
        Command::TopUp { user_id, amount } => {
            let user_id = UserId::parse(&user_id).into_diagnostic()?;
            let request = RechargeRequest::new(amount).into_diagnostic()?;
            let balance = mall
                .top_up(&user_id, request.amount())
                .await
                .into_diagnostic()?;
            println!("{amount} added successfully. Balance: {balance}");
        }
        Command::Balance { user_id } => {
            let user_id = UserId::parse(&user_id).into_diagnostic()?;
            let balance = mall.balance(&user_id).await.into_diagnostic()?;
            println!("{balance}");
        }
        Command::Pay { amount } => {
            let request = RechargeRequest::new(amount).into_diagnostic()?;
            println!("{}", upi_intent(&config.payee(), &request));
        }
        Command::Sessions { csv } => {
            let reports = mall.active_sessions().await.into_diagnostic()?;
            if csv {
                let stdout = io::stdout();
                let mut writer = ReportWriter::new(stdout.lock());
                writer.write_reports(&reports).into_diagnostic()?;
            } else if reports.is_empty() {
                println!("No users currently inside the mall.");
            } else {
                for report in &reports {
                    let alert = if report.low_balance { "  [low balance]" } else { "" };
                    println!(
                        "{}\t{}\t{}\t{} min\t{}{}",
                        report.name,
                        report.phone,
                        report
                            .entry_time
                            .with_timezone(&chrono::Local)
                            .format(ENTRY_TIME_FORMAT),
                        report.minutes_inside,
                        report.balance,
                        alert
                    );
                }
            }
        }
    }

    Ok(())
}
