//! Command-line front end.
//!
//! Each invocation is one cold start: the stored session is restored first,
//! then the command drives the same workflows a screen would:
//! - `login` / `logout` / `whoami` - session management
//! - `signup send-otp|register` - account creation with an emailed code
//! - `password request-code|reset` - password reset with an emailed code
//! - `book` / `trips` - rider booking flow
//! - `admin list|show|assign|cancel` - booking administration
//! - `profile update` - edit and upload the profile

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ClientError;
use crate::gateway::Booking;
use crate::notify::{Notice, NoticeKind, Notifier};
use crate::session::ProfileField;
use crate::workflow::admin::{self, BookingSummary, SortOrder};
use crate::workflow::auth::{self, OtpChallenge, ResetForm, SignupForm};
use crate::workflow::{booking, profile};
use crate::AppState;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "ridebook")]
#[command(author, version, about = "Ride booking client", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ridebook.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Backend base URL
    #[arg(long, env = "RIDEBOOK_API_URL")]
    pub api_url: Option<String>,

    /// Directory holding the stored session
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RIDEBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Create an account
    #[command(subcommand)]
    Signup(SignupCommands),

    /// Reset a forgotten password
    #[command(subcommand)]
    Password(PasswordCommands),

    /// Book a ride
    Book {
        /// Source (name or code, e.g. "Gangtok" or "gk")
        #[arg(long)]
        source: String,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        pickup: String,
        /// Travel date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Departure time, rounded to 15 minutes (default: 07:00 AM)
        #[arg(long)]
        time: Option<String>,
        #[arg(short, long, default_value = "1")]
        passengers: u8,
    },

    /// List your bookings
    Trips,

    /// Booking administration
    #[command(subcommand)]
    Admin(AdminCommands),

    /// Profile management
    #[command(subcommand)]
    Profile(ProfileCommands),
}

#[derive(clap::Args, Debug)]
pub struct SignupArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "RIDEBOOK_PASSWORD", hide_env_values = true)]
    pub password: String,
    #[arg(long)]
    pub confirm_password: String,
}

impl SignupArgs {
    fn form(&self) -> SignupForm {
        SignupForm {
            username: self.username.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SignupCommands {
    /// Validate the details and email a 4-digit code
    SendOtp(SignupArgs),
    /// Create the account using the emailed code
    Register {
        #[command(flatten)]
        details: SignupArgs,
        #[arg(long)]
        otp: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommands {
    /// Email a reset code
    RequestCode {
        #[arg(long)]
        email: String,
    },
    /// Set a new password using the emailed code
    Reset {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        confirm_password: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// List all bookings
    List {
        /// Filter by booking reference or rider name
        #[arg(short, long)]
        search: Option<String>,
        /// Sort by rider name descending
        #[arg(long)]
        desc: bool,
    },
    /// Show one booking
    Show { id: String },
    /// Assign a driver to a booking
    Assign {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        contact: String,
        #[arg(long)]
        cab_number: String,
        /// "Innova Crysta" or "Xylo"
        #[arg(long, default_value = "Innova Crysta")]
        car_model: String,
    },
    /// Cancel a booking
    Cancel { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Change profile fields and upload them
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// JPEG file to use as the profile picture
        #[arg(long)]
        picture: Option<PathBuf>,
    },
}

/// Prints notices as `[OK]` / `[!!]` lines.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => println!("{}", notice),
            NoticeKind::Error => eprintln!("{}", notice),
        }
    }
}

/// Resolve configuration: file, then environment, then flags.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load(&cli.config)?
        .apply_env()
        .with_api_url(cli.api_url.clone())
        .with_data_dir(cli.data_dir.clone());
    Ok(config)
}

/// Run a CLI command
pub async fn run_command(cli: &Cli, config: Config) -> Result<()> {
    config.check();
    let state = AppState::from_config(config, Arc::new(ConsoleNotifier))
        .map_err(|e| anyhow::anyhow!("Failed to set up client: {}", e))?;
    auth::restore_session(&state).await;

    match &cli.command {
        Commands::Login { email, password } => {
            auth::sign_in(&state, email, password).await?;
        }
        Commands::Logout => auth::sign_out(&state).await,
        Commands::Whoami => cmd_whoami(&state),
        Commands::Signup(SignupCommands::SendOtp(args)) => {
            auth::send_signup_otp(&state, &args.form()).await?;
            println!("Run `ridebook signup register ... --otp <code>` once the email arrives.");
        }
        Commands::Signup(SignupCommands::Register { details, otp }) => {
            let mut challenge = OtpChallenge::new(details.email.clone());
            challenge.fill(otp).map_err(plain)?;
            auth::sign_up(&state, &details.form(), &mut challenge).await?;
        }
        Commands::Password(PasswordCommands::RequestCode { email }) => {
            auth::request_password_reset(&state, email).await?;
        }
        Commands::Password(PasswordCommands::Reset {
            email,
            otp,
            new_password,
            confirm_password,
        }) => {
            let mut challenge = OtpChallenge::new(email.clone());
            challenge.fill(otp).map_err(plain)?;
            let form = ResetForm {
                new_password: new_password.clone(),
                confirm_password: confirm_password.clone(),
            };
            auth::reset_password(&state, &mut challenge, &form).await?;
        }
        Commands::Book {
            source,
            destination,
            pickup,
            date,
            time,
            passengers,
        } => {
            cmd_book(
                &state,
                source,
                destination,
                pickup,
                *date,
                time.as_deref(),
                *passengers,
            )
            .await?
        }
        Commands::Trips => {
            let trips = booking::my_trips(&state).await?;
            print_bookings(&trips);
        }
        Commands::Admin(AdminCommands::List { search, desc }) => {
            let order = if *desc {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            let mut bookings = admin::load_bookings(&state, order).await?;
            if let Some(query) = search {
                bookings = admin::search_bookings(&bookings, query);
            }
            print_bookings(&bookings);
        }
        Commands::Admin(AdminCommands::Show { id }) => {
            let summary = admin::open_booking(&state, id).await?;
            print_summary(&summary);
        }
        Commands::Admin(AdminCommands::Assign {
            id,
            name,
            contact,
            cab_number,
            car_model,
        }) => {
            let mut form = admin::open_allocation(&state, id)?;
            form.name = name.clone();
            admin::enter_contact(&state, &mut form, contact);
            form.cab_number = cab_number.clone();
            form.set_car_model(car_model).map_err(plain)?;
            admin::assign_driver(&state, &form).await?;
            println!("Allotment status: {}", state.screen());
        }
        Commands::Admin(AdminCommands::Cancel { id }) => {
            admin::open_allocation(&state, id)?;
            admin::cancel_booking(&state, id).await?;
        }
        Commands::Profile(ProfileCommands::Update {
            name,
            phone,
            email,
            password,
            picture,
        }) => {
            cmd_profile_update(
                &state,
                name.as_deref(),
                phone.as_deref(),
                email.as_deref(),
                password.as_deref(),
                picture.as_ref(),
            )
            .await?
        }
    }

    Ok(())
}

/// Errors raised before any workflow ran, so nothing has reported them yet.
fn plain(err: ClientError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}

fn cmd_whoami(state: &AppState) {
    let snapshot = state.session.snapshot();
    match (snapshot.role, snapshot.profile) {
        (Some(role), Some(profile)) => {
            println!("Signed in as {} ({})", profile.name, role);
            if !profile.email.is_empty() {
                println!("  Email:  {}", profile.email);
            }
            if !profile.phone.is_empty() {
                println!("  Phone:  {}", profile.phone);
            }
        }
        _ => println!("Not signed in."),
    }
}

async fn cmd_book(
    state: &AppState,
    source: &str,
    destination: &str,
    pickup: &str,
    date: NaiveDate,
    time: Option<&str>,
    passengers: u8,
) -> Result<()> {
    booking::start_booking(state)?;
    booking::select_source(state, source)?;
    booking::select_destination(state, destination)?;
    booking::select_pickup(state, pickup)?;
    booking::select_date(state, date)?;
    booking::proceed_to_confirm(state)?;
    if let Some(time) = time {
        booking::set_departure_time(state, time)?;
    }
    booking::set_passengers(state, passengers)?;

    let req = booking::submit_booking(state).await?;
    println!();
    println!("  Route:      {} -> {}", req.source_location, req.destination_location);
    println!("  Pickup:     {}", req.pickup_point);
    println!("  Date:       {}", req.start_date.format("%d/%m/%Y"));
    println!("  Departure:  {}", req.departure_time);
    println!("  Seats:      {}", req.seats);
    println!();
    Ok(())
}

async fn cmd_profile_update(
    state: &AppState,
    name: Option<&str>,
    phone: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
    picture: Option<&PathBuf>,
) -> Result<()> {
    let mut editor = profile::edit_profile(state)?;
    let fields = [
        (ProfileField::Name, name),
        (ProfileField::Phone, phone),
        (ProfileField::Email, email),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            profile::edit_field(state, &mut editor, field, value)?;
        }
    }
    if let Some(password) = password {
        editor.set_password(password).map_err(plain)?;
    }
    if let Some(path) = picture {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read picture: {}", path.display()))?;
        editor.set_picture(&path.display().to_string(), bytes);
    }

    if !editor.is_dirty() {
        println!("Nothing to update.");
        return Ok(());
    }
    profile::confirm_changes(state, &mut editor).await?;
    Ok(())
}

fn print_bookings(bookings: &[Booking]) {
    if bookings.is_empty() {
        println!("No bookings found.");
        return;
    }

    println!();
    println!(
        "{:<10}  {:<20}  {:<28}  {:<12}  {:<6}",
        "REF", "RIDER", "ROUTE", "DATE", "SEATS"
    );
    println!("{}", "-".repeat(84));
    for booking in bookings {
        let summary = BookingSummary::from(booking);
        let route = format!("{} -> {}", summary.source, summary.destination);
        println!(
            "{:<10}  {:<20}  {:<28}  {:<12}  {:<6}",
            summary.reference,
            truncate(&summary.rider, 20),
            truncate(&route, 28),
            summary.date,
            summary.seats
        );
    }
    println!();
}

fn print_summary(summary: &BookingSummary) {
    println!();
    println!("=== Booking {} ===", summary.reference);
    println!();
    println!("  ID:          {}", summary.id);
    println!("  Rider:       {}", summary.rider);
    println!("  Email:       {}", summary.email);
    println!("  Phone:       {}", summary.phone);
    println!("  From:        {}", summary.source);
    println!("  To:          {}", summary.destination);
    println!("  Pickup:      {}", summary.pickup_point);
    println!("  Date:        {}", summary.date);
    println!("  Departure:   {}", summary.departure_time);
    println!("  Seats:       {}", summary.seats);
    println!("  Payment:     {}", summary.payment_status);
    println!(
        "  Driver:      {}",
        summary.driver.as_deref().unwrap_or("not assigned")
    );
    println!();
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_book() {
        let cli = Cli::try_parse_from([
            "ridebook",
            "book",
            "--source",
            "gk",
            "--destination",
            "na",
            "--pickup",
            "zp",
            "--date",
            "2026-10-20",
            "-p",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Book {
                date, passengers, ..
            } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
                assert_eq!(passengers, 3);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_admin_assign() {
        let cli = Cli::try_parse_from([
            "ridebook",
            "--data-dir",
            "/tmp/rb",
            "admin",
            "assign",
            "b1",
            "--name",
            "Dawa Sherpa",
            "--contact",
            "9123456780",
            "--cab-number",
            "SK01 P 1234",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/rb")));
        match cli.command {
            Commands::Admin(AdminCommands::Assign { id, car_model, .. }) => {
                assert_eq!(id, "b1");
                assert_eq!(car_model, "Innova Crysta");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Pemba", 20), "Pemba");
        assert_eq!(truncate("Chanmari Forest Check Post", 10), "Chanmar...");
    }
}
