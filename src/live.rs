//! OpenWeatherMap current-conditions client.
//!
//! One bounded request per call; the caller classifies the returned
//! temperature against the precomputed seasonal profiles.

use serde::Deserialize;
use std::time::Duration;

const OWM_BASE_URL: &str = "https://api.openweathermap.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider-documented 401 payload, surfaced verbatim to the user.
const AUTH_ERROR_BODY: &str =
    r#"{"cod":401, "message": "Invalid API key. Please see https://openweathermap.org/faq#error401"}"#;

/// Current-weather response, reduced to the field the pipeline consumes.
#[derive(Debug, Deserialize)]
pub struct OwmResponse {
    pub main: OwmMain,
}

#[derive(Debug, Deserialize)]
pub struct OwmMain {
    pub temp: f64,
}

/// Failure modes of the live fetch. Kept apart from `PipelineError` so the
/// caller can render each branch separately; none of them abort the run.
#[derive(Debug, thiserror::Error)]
pub enum LiveReadingError {
    /// HTTP 401: the credential was rejected.
    #[error("{}", AUTH_ERROR_BODY)]
    Auth,
    /// Any other non-200 response, with the raw status code and body text.
    #[error("API error {status}: {message}")]
    Service { status: u16, message: String },
    /// Network failure, timeout, or malformed payload.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Builds the client used for live checks.
pub fn default_client() -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Fetches the current temperature for a city, in °C.
pub fn fetch_current(
    client: &reqwest::blocking::Client,
    city: &str,
    api_key: &str,
) -> Result<f64, LiveReadingError> {
    let url = format!(
        "{}/data/2.5/weather?q={}&appid={}&units=metric",
        OWM_BASE_URL, city, api_key
    );

    let response = client.get(&url).send()?;
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(LiveReadingError::Auth);
    }
    if !status.is_success() {
        let message = response.text().unwrap_or_default();
        return Err(LiveReadingError::Service {
            status: status.as_u16(),
            message,
        });
    }

    let payload: OwmResponse = response.json()?;
    Ok(payload.main.temp)
}
