use thiserror::Error;

/// Fallback message when the provider reports failure without text.
pub const GENERIC_FETCH_FAILURE: &str = "Failed to fetch weather data";

/// Why the host location could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Geolocation is not supported on this host. Please search manually.")]
    Unsupported,
    #[error("Geolocation access denied. Please search manually.")]
    Denied,
}

/// Coarse classification used by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    GeolocationUnsupported,
    GeolocationDenied,
    Network,
    Provider,
    MalformedResponse,
    InvalidInput,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Geolocation is not supported on this host. Please search manually.")]
    GeolocationUnsupported,

    #[error("Geolocation access denied. Please search manually.")]
    GeolocationDenied,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider answered but its status code signals failure.
    #[error("{message}")]
    Provider { message: String },

    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),

    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Nothing to refresh yet. Search for a city first.")]
    NothingToRefresh,

    /// Superseded by a newer request or torn down.
    #[error("Request cancelled")]
    Cancelled,
}

impl WeatherError {
    pub fn provider(message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FETCH_FAILURE.to_string());
        WeatherError::Provider { message }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::GeolocationUnsupported => ErrorKind::GeolocationUnsupported,
            WeatherError::GeolocationDenied => ErrorKind::GeolocationDenied,
            WeatherError::Network(_) => ErrorKind::Network,
            WeatherError::Provider { .. } => ErrorKind::Provider,
            WeatherError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            WeatherError::InvalidCoordinate { .. } | WeatherError::NothingToRefresh => {
                ErrorKind::InvalidInput
            }
            WeatherError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<ResolutionError> for WeatherError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Unsupported => WeatherError::GeolocationUnsupported,
            ResolutionError::Denied => WeatherError::GeolocationDenied,
        }
    }
}
