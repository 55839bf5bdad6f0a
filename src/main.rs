use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use std::cell::Cell;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use geofill::{
    Coordinates, GeocodingClient, Hooks, Notifier,
    config::{Config, GeocoderConfig, ProviderConfig},
    fill_location_form,
    form::JsonForm,
};

const DEFAULT_CONFIG: &str = "geofill.yaml";

#[derive(Parser)]
#[command(name = "geofill")]
#[command(about = "Locate this device, look up its address and fill in a location form")]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<Utf8PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Locate the device and write the result into the form file
    Fill(FillArgs),
    /// Print the address of a position
    Reverse {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Print the best match for an address
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

#[derive(clap::Args)]
struct FillArgs {
    /// Form file (JSON object)
    #[arg(short, long)]
    form: Option<Utf8PathBuf>,

    #[arg(long)]
    lat_field: Option<String>,

    #[arg(long)]
    lon_field: Option<String>,

    #[arg(long, conflicts_with = "no_address")]
    address_field: Option<String>,

    /// Skip the address lookup
    #[arg(long)]
    no_address: bool,

    /// Where the position comes from
    #[arg(short, long, value_enum)]
    provider: Option<ProviderKind>,

    /// Fixed position as LAT,LON
    #[arg(
        long,
        value_parser = parse_lat_lon,
        allow_hyphen_values = true,
        conflicts_with_all = ["history", "ip_address"]
    )]
    at: Option<(f64, f64)>,

    /// Google Takeout location history file
    #[arg(long, conflicts_with = "ip_address")]
    history: Option<Utf8PathBuf>,

    /// Locate this IP address instead of our own
    #[arg(long)]
    ip_address: Option<String>,

    #[arg(short, long, value_enum)]
    geocoder: Option<GeocoderKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum ProviderKind {
    Ip,
    Fixed,
    History,
    None,
}

#[derive(Clone, Copy, ValueEnum)]
enum GeocoderKind {
    Nominatim,
    Offline,
}

fn parse_lat_lon(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {s:?}"))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}"));
    Ok((parse(lat)?, parse(lon)?))
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        eprintln!("⚠️  {message}");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CONFIG));
    let mut config = Config::load(&config_path, args.config.is_some())?;

    match args.command {
        Command::Fill(fill) => {
            apply_overrides(&mut config, &fill)?;
            run_fill(&config, args.verbose).await
        }
        Command::Reverse {
            latitude,
            longitude,
        } => {
            let geocoder = config.build_geocoder()?;
            match geocoder.reverse_geocode(latitude, longitude).await {
                Some(address) => {
                    println!("📍 {address}");
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("⚠️  No address found for {latitude}, {longitude}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Search { query } => {
            let query = query.join(" ");
            let geocoder = config.build_geocoder()?;
            match geocoder.search(&query).await {
                Some(place) => {
                    println!("📍 {}", place.display_name);
                    println!("   {}, {}", place.latitude, place.longitude);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("⚠️  Address not found: {query}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn apply_overrides(config: &mut Config, fill: &FillArgs) -> Result<()> {
    if let Some(form) = &fill.form {
        config.form.path = form.clone();
    }
    if let Some(field) = &fill.lat_field {
        config.form.latitude_field = field.clone();
    }
    if let Some(field) = &fill.lon_field {
        config.form.longitude_field = field.clone();
    }
    if let Some(field) = &fill.address_field {
        config.form.address_field = Some(field.clone());
    }
    if fill.no_address {
        config.form.address_field = None;
    }

    // Each source flag implies its provider; an explicit --provider must agree.
    let implied = if fill.at.is_some() {
        Some((ProviderKind::Fixed, "--at"))
    } else if fill.history.is_some() {
        Some((ProviderKind::History, "--history"))
    } else if fill.ip_address.is_some() {
        Some((ProviderKind::Ip, "--ip-address"))
    } else {
        None
    };
    let kind = match (fill.provider, implied) {
        (Some(explicit), Some((kind, flag))) if explicit != kind => {
            bail!("{flag} cannot be used with --provider {explicit:?}")
        }
        (explicit, implied) => explicit.or(implied.map(|(kind, _)| kind)),
    };

    match kind {
        Some(ProviderKind::Ip) => {
            if !matches!(config.provider, ProviderConfig::Ip { .. }) {
                config.provider = ProviderConfig::default();
            }
            if let (ProviderConfig::Ip { address, .. }, Some(ip)) =
                (&mut config.provider, &fill.ip_address)
            {
                *address = Some(ip.clone());
            }
        }
        Some(ProviderKind::Fixed) => match fill.at {
            Some((latitude, longitude)) => {
                config.provider = ProviderConfig::Fixed {
                    latitude,
                    longitude,
                }
            }
            None if matches!(config.provider, ProviderConfig::Fixed { .. }) => {}
            None => bail!("--provider fixed needs a position (--at LAT,LON)"),
        },
        Some(ProviderKind::History) => match &fill.history {
            Some(path) => config.provider = ProviderConfig::History { path: path.clone() },
            None if matches!(config.provider, ProviderConfig::History { .. }) => {}
            None => bail!("--provider history needs a history file (--history FILE)"),
        },
        Some(ProviderKind::None) => config.provider = ProviderConfig::None,
        None => {}
    }

    match fill.geocoder {
        Some(GeocoderKind::Nominatim) => {
            if !matches!(config.geocoder, GeocoderConfig::Nominatim { .. }) {
                config.geocoder = GeocoderConfig::default();
            }
        }
        Some(GeocoderKind::Offline) => config.geocoder = GeocoderConfig::Offline,
        None => {}
    }

    Ok(())
}

async fn run_fill(config: &Config, verbose: bool) -> Result<ExitCode> {
    let provider = config.build_provider()?;
    let geocoder = config.build_geocoder()?;
    let request = config.form_request();
    let mut form = JsonForm::load(&config.form.path)?;

    let located: Cell<Option<Coordinates>> = Cell::new(None);
    let mut hooks = Hooks::default().on_success(|coords| located.set(Some(*coords)));
    if verbose {
        hooks = hooks.on_error(|err| eprintln!("❌ {err}"));
    }

    fill_location_form(
        provider.as_ref(),
        &geocoder,
        &mut form,
        &ConsoleNotifier,
        &request,
        hooks,
    )
    .await;

    let Some(coords) = located.get() else {
        return Ok(ExitCode::FAILURE);
    };

    form.save().with_context(|| format!("Failed to save form: {}", config.form.path))?;

    println!(
        "📍 {}, {} (±{} m)",
        coords.latitude, coords.longitude, coords.accuracy
    );
    if let Some(address) = request
        .address_field
        .as_deref()
        .and_then(|field| form.written(field))
        .and_then(|value| value.as_str())
    {
        println!("🏠 {address}");
    }
    println!("📝 Updated {}", config.form.path);

    Ok(ExitCode::SUCCESS)
}
