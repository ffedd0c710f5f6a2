//! Salah CLI - Command-line interface for Salah Clock
//!
//! Commands:
//! - times: Print one day's prayer times
//! - month: Print a month of prayer times
//! - next: Show the next prayer and its countdown
//! - simulate: Sweep the display cycle across a prayer and print each transition
//! - methods: List calculation methods
//! - locations: List built-in locations

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use salah_clock::location::{self, ResolvedLocation};
use salah_clock::source::{AstronomicalProvider, TimingsProvider};
use salah_clock::{
    next_prayer_countdown, CalculationMethod, CalculationParameters, Coordinates, DisplayConfig,
    Madhab, Prayer, PrayerClock, PrayerError, PrayerTimes, PRODUCER_NAME, SALAH_VERSION,
};

/// Salah - Prayer times and display cycle for mosque screens
#[derive(Parser)]
#[command(name = "salah")]
#[command(version = SALAH_VERSION)]
#[command(about = "Compute prayer times and simulate the mosque display cycle", long_about = None)]
struct Cli {
    /// Display configuration file (JSON); flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one day's prayer times
    Times {
        #[command(flatten)]
        location: LocationArgs,

        /// Civil date (YYYY-MM-DD), defaults to today at the location
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output format
        #[arg(long, default_value = "table")]
        format: TimesFormat,
    },

    /// Print a month of prayer times
    Month {
        #[command(flatten)]
        location: LocationArgs,

        #[arg(long)]
        year: i32,

        /// Month number (1-12)
        #[arg(long)]
        month: u32,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        format: OutputFormat,
    },

    /// Show the next prayer and the time left until it
    Next {
        #[command(flatten)]
        location: LocationArgs,

        /// Instant to evaluate (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sweep the display cycle across one prayer and print snapshots as NDJSON
    Simulate {
        #[command(flatten)]
        location: LocationArgs,

        /// Prayer to simulate
        #[arg(long, default_value = "dhuhr")]
        prayer: Prayer,

        /// Civil date (YYYY-MM-DD), defaults to today at the location
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Tick interval in seconds
        #[arg(long, default_value = "1")]
        step: u32,

        /// Minutes to simulate after the prayer instant
        #[arg(long, default_value = "40")]
        minutes: u32,

        /// Print every tick, not only those with transitions
        #[arg(long)]
        all: bool,
    },

    /// List calculation methods
    Methods {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List built-in locations
    Locations {
        /// Only this country
        #[arg(long)]
        country: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Location and calculation overrides shared by the computing commands
#[derive(Args, Clone, Default)]
struct LocationArgs {
    /// Catalog country (English or Arabic name)
    #[arg(long)]
    country: Option<String>,

    /// Catalog city; the capital when omitted
    #[arg(long)]
    city: Option<String>,

    /// Latitude in degrees, with --longitude and --timezone
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// IANA timezone (e.g., "Asia/Amman")
    #[arg(long)]
    timezone: Option<String>,

    /// Calculation method (e.g., "mwl", "umm_al_qura", "isna")
    #[arg(long)]
    method: Option<CalculationMethod>,

    /// Asr convention
    #[arg(long)]
    madhab: Option<MadhabArg>,
}

#[derive(Clone, ValueEnum)]
enum MadhabArg {
    Shafi,
    Hanafi,
}

#[derive(Clone, ValueEnum)]
enum TimesFormat {
    /// Aligned text table
    Table,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one day per line)
    Ndjson,
    /// JSON array of days
    Json,
}

fn main() -> ExitCode {
    Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SalahCliError> {
    let base = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Times {
            location,
            date,
            format,
        } => cmd_times(&apply_overrides(base, &location)?, date, format),

        Commands::Month {
            location,
            year,
            month,
            format,
        } => cmd_month(&apply_overrides(base, &location)?, year, month, format),

        Commands::Next { location, at, json } => {
            cmd_next(&apply_overrides(base, &location)?, at.unwrap_or_else(Utc::now), json)
        }

        Commands::Simulate {
            location,
            prayer,
            date,
            step,
            minutes,
            all,
        } => cmd_simulate(apply_overrides(base, &location)?, prayer, date, step, minutes, all),

        Commands::Methods { json } => cmd_methods(json),

        Commands::Locations { country, json } => cmd_locations(country.as_deref(), json),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<DisplayConfig, SalahCliError> {
    match path {
        Some(path) => Ok(DisplayConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(DisplayConfig::default()),
    }
}

fn apply_overrides(mut config: DisplayConfig, args: &LocationArgs) -> Result<DisplayConfig, SalahCliError> {
    if args.country.is_some() {
        config.location.country = args.country.clone();
        config.location.city = None;
        config.location.coordinates = None;
    }
    if args.city.is_some() {
        config.location.city = args.city.clone();
    }
    match (args.latitude, args.longitude) {
        (Some(latitude), Some(longitude)) => {
            config.location.coordinates = Some(Coordinates::new(latitude, longitude)?);
        }
        (None, None) => {}
        _ => {
            return Err(SalahCliError::InvalidArgument(
                "--latitude and --longitude must be given together".to_string(),
            ))
        }
    }
    if args.timezone.is_some() {
        config.location.timezone = args.timezone.clone();
    }
    if args.method.is_some() {
        config.calculation.method = args.method;
    }
    if let Some(madhab) = &args.madhab {
        config.calculation.madhab = match madhab {
            MadhabArg::Shafi => Madhab::Shafi,
            MadhabArg::Hanafi => Madhab::Hanafi,
        };
    }
    config.validate()?;
    Ok(config)
}

fn local_today(location: &ResolvedLocation) -> NaiveDate {
    Utc::now().with_timezone(&location.timezone).date_naive()
}

fn cmd_times(
    config: &DisplayConfig,
    date: Option<NaiveDate>,
    format: TimesFormat,
) -> Result<(), SalahCliError> {
    let location = config.resolve_location()?;
    let params = config.calculation_parameters()?;
    let date = date.unwrap_or_else(|| local_today(&location));
    let report = day_report(&location, &params, date)?;

    match format {
        TimesFormat::Table => {
            println!("{} - {}, {}", report.date, report.city, report.country);
            println!("Method:   {}", params.method.description());
            println!("Timezone: {}", report.timezone);
            println!();
            for entry in &report.times {
                println!("  {:<10} {}", entry.prayer.to_string(), entry.local);
            }
            println!();
            println!("  {:<10} {}", "midnight", report.middle_of_night);
            println!("  {:<10} {}", "last third", report.last_third_of_night);
        }
        TimesFormat::Json => println!("{}", serde_json::to_string(&report)?),
        TimesFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn cmd_month(
    config: &DisplayConfig,
    year: i32,
    month: u32,
    format: OutputFormat,
) -> Result<(), SalahCliError> {
    let location = config.resolve_location()?;
    let params = config.calculation_parameters()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| SalahCliError::InvalidArgument(format!("invalid month {year}-{month}")))?;

    let mut reports = Vec::new();
    let mut date = first;
    while date.month() == month {
        reports.push(day_report(&location, &params, date)?);
        date += Duration::days(1);
    }

    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Ndjson => {
            for report in &reports {
                writeln!(stdout, "{}", serde_json::to_string(report)?)?;
            }
        }
        OutputFormat::Json => writeln!(stdout, "{}", serde_json::to_string(&reports)?)?,
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_next(config: &DisplayConfig, at: DateTime<Utc>, json: bool) -> Result<(), SalahCliError> {
    let location = config.resolve_location()?;
    let provider = AstronomicalProvider::new(location.coordinates, config.calculation_parameters()?);
    let date = at.with_timezone(&location.timezone).date_naive();
    let today = provider.timings_for(date)?;
    let tomorrow_fajr = provider
        .timings_for(date + Duration::days(1))
        .map(|t| t.fajr)
        .ok();
    let countdown = next_prayer_countdown(at, &today, tomorrow_fajr);

    if json {
        println!("{}", serde_json::to_string_pretty(&countdown)?);
    } else {
        println!(
            "Next: {} at {} (in {})",
            countdown.prayer,
            countdown.at.with_timezone(&location.timezone).format("%H:%M"),
            countdown.format_remaining()
        );
    }
    Ok(())
}

fn cmd_simulate(
    config: DisplayConfig,
    prayer: Prayer,
    date: Option<NaiveDate>,
    step: u32,
    minutes: u32,
    all: bool,
) -> Result<(), SalahCliError> {
    if !prayer.is_salah() {
        return Err(SalahCliError::InvalidArgument(format!("{prayer} has no adhan")));
    }
    if step == 0 {
        return Err(SalahCliError::InvalidArgument("--step must be positive".to_string()));
    }

    let location = config.resolve_location()?;
    let date = date.unwrap_or_else(|| local_today(&location));
    let provider = AstronomicalProvider::new(location.coordinates, config.calculation_parameters()?);
    let at = provider.timings_for(date)?.time_for(prayer);

    let mut clock = PrayerClock::new(config)?;
    let step = Duration::seconds(i64::from(step));
    let end = at + Duration::minutes(i64::from(minutes));
    let mut now = at - Duration::seconds(10);

    let mut stdout = io::stdout().lock();
    while now <= end {
        let snapshot = clock.tick(now)?;
        if all || !snapshot.transitions.is_empty() {
            writeln!(stdout, "{}", serde_json::to_string(&snapshot)?)?;
        }
        now += step;
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_methods(json: bool) -> Result<(), SalahCliError> {
    let methods: Vec<MethodInfo> = CalculationMethod::ALL
        .iter()
        .map(|method| {
            let params = method.parameters();
            MethodInfo {
                name: method.as_str().to_string(),
                description: method.description().to_string(),
                fajr_angle: params.fajr_angle,
                isha_angle: (params.isha_interval == 0).then_some(params.isha_angle),
                isha_interval: (params.isha_interval > 0).then_some(params.isha_interval),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&methods)?);
    } else {
        println!("Calculation Methods");
        println!("===================");
        for m in &methods {
            let isha = match (m.isha_angle, m.isha_interval) {
                (_, Some(minutes)) => format!("{minutes} min"),
                (Some(angle), None) => format!("{angle}°"),
                (None, None) => "-".to_string(),
            };
            println!("  {:<24} fajr {:>5}°  isha {:>7}  {}", m.name, m.fajr_angle, isha, m.description);
        }
    }
    Ok(())
}

fn cmd_locations(country: Option<&str>, json: bool) -> Result<(), SalahCliError> {
    let countries: Vec<_> = match country {
        Some(name) => vec![location::find_country(name)
            .ok_or_else(|| PrayerError::UnknownLocation(name.to_string()))?],
        None => location::countries().iter().collect(),
    };

    let entries: Vec<LocationInfo> = countries
        .iter()
        .flat_map(|c| {
            c.cities.iter().map(move |city| LocationInfo {
                country: c.name.to_string(),
                city: city.name.to_string(),
                latitude: city.latitude,
                longitude: city.longitude,
                timezone: city.timezone.to_string(),
                method: c.method.as_str().to_string(),
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{} v{} - built-in locations", PRODUCER_NAME, SALAH_VERSION);
        for e in &entries {
            println!(
                "  {:<22} {:<18} {:>8.4} {:>9.4}  {:<18} {}",
                e.country, e.city, e.latitude, e.longitude, e.timezone, e.method
            );
        }
    }
    Ok(())
}

// Helper functions

fn day_report(
    location: &ResolvedLocation,
    params: &CalculationParameters,
    date: NaiveDate,
) -> Result<DayReport, SalahCliError> {
    let times = PrayerTimes::new(location.coordinates, date, params)?;
    let local = times.in_timezone(location.timezone);
    let hhmm = |instant: DateTime<Utc>| {
        instant
            .with_timezone(&location.timezone)
            .format("%H:%M")
            .to_string()
    };

    Ok(DayReport {
        date,
        country: location.country.clone(),
        city: location.city.clone(),
        timezone: location.timezone.name().to_string(),
        method: params.method.as_str().to_string(),
        times: times
            .iter()
            .map(|(prayer, utc)| TimeEntry {
                prayer,
                local: local.format(prayer),
                utc,
            })
            .collect(),
        middle_of_night: hhmm(times.middle_of_night()?),
        last_third_of_night: hhmm(times.last_third_of_night()?),
    })
}

// Error types

#[derive(Debug)]
enum SalahCliError {
    Io(io::Error),
    Prayer(PrayerError),
    Json(serde_json::Error),
    InvalidArgument(String),
}

impl From<io::Error> for SalahCliError {
    fn from(e: io::Error) -> Self {
        SalahCliError::Io(e)
    }
}

impl From<PrayerError> for SalahCliError {
    fn from(e: PrayerError) -> Self {
        SalahCliError::Prayer(e)
    }
}

impl From<serde_json::Error> for SalahCliError {
    fn from(e: serde_json::Error) -> Self {
        SalahCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SalahCliError> for CliError {
    fn from(e: SalahCliError) -> Self {
        match e {
            SalahCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SalahCliError::Prayer(e) => {
                let (code, hint) = match &e {
                    PrayerError::Unresolvable { .. } => (
                        "UNRESOLVABLE",
                        "Try a high-latitude rule or a location closer to the equator",
                    ),
                    PrayerError::UnknownLocation(_) => {
                        ("UNKNOWN_LOCATION", "Run 'salah locations' for the catalog")
                    }
                    PrayerError::UnknownMethod(_) => {
                        ("UNKNOWN_METHOD", "Run 'salah methods' for the catalog")
                    }
                    PrayerError::InvalidConfig(_) | PrayerError::JsonError(_) => {
                        ("CONFIG_ERROR", "Check the configuration file")
                    }
                    _ => ("PRAYER_ERROR", "Check location and calculation settings"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            SalahCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            SalahCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run 'salah --help' for usage".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DayReport {
    date: NaiveDate,
    country: String,
    city: String,
    timezone: String,
    method: String,
    times: Vec<TimeEntry>,
    middle_of_night: String,
    last_third_of_night: String,
}

#[derive(serde::Serialize)]
struct TimeEntry {
    prayer: Prayer,
    local: String,
    utc: DateTime<Utc>,
}

#[derive(serde::Serialize)]
struct MethodInfo {
    name: String,
    description: String,
    fajr_angle: f64,
    isha_angle: Option<f64>,
    isha_interval: Option<u32>,
}

#[derive(serde::Serialize)]
struct LocationInfo {
    country: String,
    city: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    method: String,
}
