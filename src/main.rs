use chrono::Local;
use clap::Parser;
use lib::{
    AnalysisConfig, Observation, PipelineError, Season, SeasonalProfile, SimpleLogger,
    annotate_city, annual_trend, check_anomaly, default_client, fetch_current, load_observations,
    season_profiles, seasonal_outliers, summarize_city, write_profiles_csv, write_profiles_json,
    write_profiles_parquet, write_series_csv, write_series_json, write_series_parquet,
};
use log::debug;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input CSV file with per-city temperature history
    #[arg(short, long)]
    input_file: PathBuf,

    /// Output base name (will create dir containing .csv, .json, and .parquet files)
    #[arg(short, long, default_value = "output")]
    output: String,

    /// Cities to analyze (e.g., Berlin,Moscow). If not specified, processes all cities.
    #[arg(short, long, value_delimiter = ',')]
    cities: Vec<String>,

    /// Trailing window size for the rolling baseline, in observations
    #[arg(long, default_value_t = 30)]
    rolling_window: usize,

    /// Centered window size for the long-trend overlay, in observations
    #[arg(long, default_value_t = 365)]
    long_window: usize,

    /// Minimum valid readings required inside the long window
    #[arg(long, default_value_t = 180)]
    long_min_periods: usize,

    /// City to check against the current OpenWeatherMap reading
    #[arg(long)]
    live_city: Option<String>,

    /// OpenWeatherMap API key (falls back to the OPENWEATHER_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,
}

fn main() -> Result<(), PipelineError> {
    // Initialize timer and logger
    let total_start = Instant::now();
    log::set_logger(&LOGGER).unwrap();
    dotenv::dotenv().ok();

    // Acquire CLI args
    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }
    let cities_display = if args.cities.is_empty() {
        "ALL".to_string()
    } else {
        args.cities.join(",")
    };

    println!("Detector! Temperature Anomaly Pipeline");
    debug!(
        "Input file: {} | Cities: {}",
        args.input_file.display(),
        cities_display
    );
    debug!(
        "Rolling window: {} | Long window: {} (min {})",
        args.rolling_window, args.long_window, args.long_min_periods
    );

    // Load and filter the historical dataset
    let mut observations = load_observations(&args.input_file)?;
    if !args.cities.is_empty() {
        observations.retain(|obs| args.cities.contains(&obs.city));
    }
    if observations.is_empty() {
        return Err(PipelineError::Data(format!(
            "No observations found for cities: {}",
            cities_display
        )));
    }
    println!("Loaded {} observations", observations.len());

    let config = AnalysisConfig {
        rolling_window: args.rolling_window,
        long_window: args.long_window,
        long_min_periods: args.long_min_periods,
    };

    // Seasonal baselines plus the per-city annotation pass
    println!("Starting data processing...");
    let processing_start = Instant::now();

    let profiles = season_profiles(&observations);
    debug!("Computed {} seasonal profiles", profiles.len());

    let mut cities: Vec<String> = observations.iter().map(|obs| obs.city.clone()).collect();
    cities.sort();
    cities.dedup();

    let mut all_points = Vec::new();
    for city in &cities {
        let city_obs: Vec<Observation> = observations
            .iter()
            .filter(|obs| &obs.city == city)
            .cloned()
            .collect();

        let trend = annual_trend(&city_obs);
        let points = annotate_city(&city_obs, &config);
        let rolling_flags = points.iter().filter(|p| p.is_anomaly).count();
        let seasonal_flags = seasonal_outliers(&city_obs, &profiles)
            .into_iter()
            .filter(|flag| *flag)
            .count();

        println!(
            "\n{}: trend {:+.2} °C/year | {} rolling anomalies | {} seasonal outliers",
            city, trend, rolling_flags, seasonal_flags
        );
        if let Some(summary) = summarize_city(&city_obs) {
            println!(
                "  n={} mean={:.2} std={} min={:.2} p25={:.2} median={:.2} p75={:.2} max={:.2}",
                summary.count,
                summary.mean,
                summary
                    .std
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "n/a".to_string()),
                summary.min,
                summary.p25,
                summary.median,
                summary.p75,
                summary.max
            );
        }

        all_points.extend(points);
    }
    let processing_time = processing_start.elapsed();
    println!(
        "\nData processing completed in {:.2?} | {} annotated points",
        processing_time,
        all_points.len()
    );

    // Create output directory
    let output_dir = PathBuf::from(format!("./output/{}", args.output));
    fs::create_dir_all(&output_dir)?;
    println!(
        "Created output directory: {} | Writing output files...",
        output_dir.display()
    );
    let io_start = Instant::now();

    // Extract just the directory name for the file names (remove path separators)
    let output_name = args
        .output
        .split(['/', '\\'])
        .next_back()
        .unwrap_or(&args.output);

    let profile_csv = output_dir.join(format!("{}_profiles.csv", output_name));
    let profile_json = output_dir.join(format!("{}_profiles.json", output_name));
    let profile_parquet = output_dir.join(format!("{}_profiles.parquet", output_name));
    let series_csv = output_dir.join(format!("{}_series.csv", output_name));
    let series_json = output_dir.join(format!("{}_series.json", output_name));
    let series_parquet = output_dir.join(format!("{}_series.parquet", output_name));

    write_profiles_csv(&profiles, &profile_csv)?;
    write_profiles_json(&profiles, &profile_json)?;
    write_profiles_parquet(&profiles, &profile_parquet)?;
    write_series_csv(&all_points, &series_csv)?;
    write_series_json(&all_points, &series_json)?;
    write_series_parquet(&all_points, &series_parquet)?;

    let io_time = io_start.elapsed();
    println!("All files took {:.2?}", io_time);
    println!("\nWrote files to directory: {}", output_dir.display());
    debug!("  - {}", profile_csv.display());
    debug!("  - {}", profile_json.display());
    debug!("  - {}", profile_parquet.display());
    debug!("  - {}", series_csv.display());
    debug!("  - {}", series_json.display());
    debug!("  - {}", series_parquet.display());

    // One live lookup, serialized after the historical pass
    if let Some(city) = &args.live_city {
        let api_key = args
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENWEATHER_API_KEY").ok());
        match api_key {
            Some(key) => run_live_check(city, &key, &profiles),
            None => println!("\nNo API key provided; skipping live check for {}", city),
        }
    }

    let total_time = total_start.elapsed();
    println!("\nPipeline completed successfully in {:.2?}", total_time);
    debug!(
        "Performance breakdown: Processing={:.1}%, IO={:.1}%",
        (processing_time.as_secs_f64() / total_time.as_secs_f64()) * 100.0,
        (io_time.as_secs_f64() / total_time.as_secs_f64()) * 100.0
    );

    Ok(())
}

/// Fetches the current reading for one city and classifies it against the
/// seasonal baseline of today's date. Fetch failures are rendered, never
/// propagated.
fn run_live_check(city: &str, api_key: &str, profiles: &[SeasonalProfile]) {
    println!("\nLive check: {}", city);

    let client = match default_client() {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Failed to build HTTP client: {}", err);
            return;
        }
    };

    match fetch_current(&client, city, api_key) {
        Ok(temperature) => {
            let season = Season::from_date(Local::now().date_naive());
            let check = check_anomaly(city, temperature, profiles, season);
            println!("Current temperature: {} °C (season: {})", temperature, season);
            if check.is_normal {
                println!("Temperature is within the normal range");
            } else {
                println!("Anomaly!");
            }
            println!(
                "Normal range: {:.1} — {:.1} °C",
                check.lower_bound, check.upper_bound
            );
        }
        Err(err) => eprintln!("{}", err),
    }
}
