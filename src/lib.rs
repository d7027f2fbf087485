pub mod analysis;
pub mod error;
pub mod live;
pub mod load;
pub mod output;
pub mod structs;

// Re-export public API
pub use analysis::{
    annotate_city, annual_trend, check_anomaly, season_profiles, seasonal_outliers, summarize_city,
};
pub use error::{PipelineError, Result};
pub use live::{LiveReadingError, OwmResponse, default_client, fetch_current};
pub use load::{load_observations, read_observations};
pub use output::{
    write_profiles_csv, write_profiles_json, write_profiles_parquet, write_series_csv,
    write_series_json, write_series_parquet,
};
pub use structs::{
    AnalysisConfig, AnomalyCheck, CitySummary, Observation, RollingPoint, Season, SeasonalProfile,
    SimpleLogger,
};
