//! Command Line Interface (CLI) arguments.

use byte_unit::Byte;
use clap::Parser;

/// Parse a human readable byte size such as `10MiB`.
fn parse_byte_size(size: &str) -> Result<usize, String> {
    let bytes = Byte::parse_str(size, /* ignore case */ true)
        .map_err(|error| error.to_string())?
        .as_u64();
    usize::try_from(bytes).map_err(|error| error.to_string())
}

/// Chemviz command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "CHEMVIZ_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8000, env = "CHEMVIZ_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "CHEMVIZ_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/chemviz/certs/cert.pem",
        env = "CHEMVIZ_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/chemviz/certs/key.pem",
        env = "CHEMVIZ_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "CHEMVIZ_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "CHEMVIZ_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Whether to use Rayon for execution of the analysis pipeline.
    #[arg(long, default_value_t = false, env = "CHEMVIZ_USE_RAYON")]
    pub use_rayon: bool,
    /// Path to the dataset store directory
    #[arg(long, default_value = "~/.local/share/chemviz/store", env = "CHEMVIZ_STORE_PATH")]
    pub store_path: String,
    /// Number of datasets kept per user
    #[arg(long, default_value_t = 5, env = "CHEMVIZ_HISTORY_LIMIT")]
    pub history_limit: usize,
    /// Maximum size of an uploaded file, e.g. 10MiB
    #[arg(
        long,
        default_value = "10MiB",
        value_parser = parse_byte_size,
        env = "CHEMVIZ_MAX_UPLOAD_SIZE"
    )]
    pub max_upload_size: usize,
    /// Directory holding the fonts used in PDF reports
    #[arg(
        long,
        default_value = "/usr/share/fonts/truetype/liberation",
        env = "CHEMVIZ_FONT_DIR"
    )]
    pub font_dir: String,
    /// Name of the font family used in PDF reports
    #[arg(long, default_value = "LiberationSans", env = "CHEMVIZ_FONT_FAMILY")]
    pub font_family: String,
    /// Temperatures at or above this are reported as high
    #[arg(long, default_value_t = 100.0, env = "CHEMVIZ_HIGH_TEMPERATURE_THRESHOLD")]
    pub high_temperature_threshold: f64,
    /// Maximum number of outliers listed per parameter
    #[arg(long, default_value_t = 10, env = "CHEMVIZ_OUTLIER_DISPLAY_LIMIT")]
    pub outlier_display_limit: usize,
    /// Outlier percentage above which a recommendation is made
    #[arg(long, default_value_t = 10.0, env = "CHEMVIZ_OUTLIER_RATE_THRESHOLD")]
    pub outlier_rate_threshold: f64,
    /// Absolute correlation above which parameters are reported as strongly correlated
    #[arg(long, default_value_t = 0.5, env = "CHEMVIZ_STRONG_CORRELATION_THRESHOLD")]
    pub strong_correlation_threshold: f64,
    /// Length of top performer and least efficient lists
    #[arg(long, default_value_t = 5, env = "CHEMVIZ_TOP_PERFORMER_COUNT")]
    pub top_performer_count: usize,
    /// Efficiency score weight of flowrate
    #[arg(long, default_value_t = 1.0, env = "CHEMVIZ_FLOWRATE_WEIGHT")]
    pub flowrate_weight: f64,
    /// Efficiency score weight of temperature
    #[arg(long, default_value_t = 1.0, env = "CHEMVIZ_TEMPERATURE_WEIGHT")]
    pub temperature_weight: f64,
    /// Efficiency score weight of inverse pressure
    #[arg(long, default_value_t = 1.0, env = "CHEMVIZ_PRESSURE_WEIGHT")]
    pub pressure_weight: f64,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
