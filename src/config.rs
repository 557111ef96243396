//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Deployment environment variables (HOST, PORT, VALID_API_KEYS, CORS_ORIGINS)
//! 2. Environment variables with the APP_ prefix
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! Configuration is loaded and validated exactly once at process start and
//! is immutable afterwards: every request reads the same snapshot, so the
//! pipeline never has to coordinate around a config change.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::detection::features::AnalysisConfig;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, security, detection)
/// keeps each concern reviewable on its own: where the server binds, who may
/// call it, and how audio is analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub detection: DetectionConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: accept connections from any address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Access control and cross-origin settings.
///
/// ## Fields:
/// - `api_keys`: allow-list checked against the `x-api-key` request header
/// - `cors_origins`: origins allowed by CORS; a single `"*"` entry allows all
///
/// The default keys exist for local testing only; deployments override them
/// through `VALID_API_KEYS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub api_keys: Vec<String>,
    pub cors_origins: Vec<String>,
}

/// Detection pipeline tuning.
///
/// ## Fields:
/// - `accepted_formats`: container tags the decoder accepts (currently mp3 only)
/// - `centroid_variance_threshold`: decision boundary in Hz squared
///   (centroid-frequency-squared); variance below it classifies as AI
///   generated. A placeholder policy parameter, not a calibrated value.
/// - `fft_size` / `hop_size`: STFT windowing in samples
/// - `mel_bands` / `mfcc_coefficients`: cepstral analysis shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub accepted_formats: Vec<String>,
    pub centroid_variance_threshold: f64,
    pub fft_size: usize,
    pub hop_size: usize,
    pub mel_bands: usize,
    pub mfcc_coefficients: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_keys: vec![
                "sk_test_123456789".to_string(),
                "LATTICE_PROD_9921".to_string(),
            ],
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            accepted_formats: vec!["mp3".to_string()],
            centroid_variance_threshold: 500_000.0,
            fft_size: 2048,
            hop_size: 512,
            mel_bands: 40,
            mfcc_coefficients: 13,
        }
    }
}

impl DetectionConfig {
    /// Windowing parameters in the shape the feature extractor consumes.
    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            fft_size: self.fft_size,
            hop_size: self.hop_size,
            mel_bands: self.mel_bands,
            mfcc_coefficients: self.mfcc_coefficients,
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: override the bind host
    /// - `HOST` / `PORT`: deployment-platform conventions, honored as-is
    /// - `VALID_API_KEYS=key1,key2`: comma-separated API key allow-list
    /// - `CORS_ORIGINS=https://a.example,https://b.example`: comma-separated
    ///   allowed origins, or `*` for all
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms set these without the APP_ prefix.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(keys) = env::var("VALID_API_KEYS") {
            settings = settings.set_override("security.api_keys", split_csv(&keys))?;
        }

        if let Ok(origins) = env::var("CORS_ORIGINS") {
            settings = settings.set_override("security.cors_origins", split_csv(&origins))?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - The server port is usable (not 0)
    /// - At least one API key and one CORS origin are configured
    /// - The decoder accepts at least one format
    /// - The decision threshold is a finite, non-negative variance
    /// - The STFT windowing and cepstral shape are internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.security.api_keys.is_empty() {
            return Err(anyhow::anyhow!("At least one API key must be configured"));
        }

        if self.security.cors_origins.is_empty() {
            return Err(anyhow::anyhow!("At least one CORS origin must be configured"));
        }

        if self.detection.accepted_formats.is_empty() {
            return Err(anyhow::anyhow!("At least one accepted audio format must be configured"));
        }

        if !self.detection.centroid_variance_threshold.is_finite()
            || self.detection.centroid_variance_threshold < 0.0
        {
            return Err(anyhow::anyhow!(
                "Centroid variance threshold must be a non-negative finite number"
            ));
        }

        if self.detection.fft_size == 0 {
            return Err(anyhow::anyhow!("FFT size must be greater than 0"));
        }

        if self.detection.hop_size == 0 || self.detection.hop_size > self.detection.fft_size {
            return Err(anyhow::anyhow!(
                "Hop size must be between 1 and the FFT size"
            ));
        }

        if self.detection.mfcc_coefficients == 0
            || self.detection.mfcc_coefficients > self.detection.mel_bands
        {
            return Err(anyhow::anyhow!(
                "MFCC coefficient count must be between 1 and the mel band count"
            ));
        }

        Ok(())
    }
}

/// Split a comma-separated environment value into trimmed, non-empty parts.
fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
