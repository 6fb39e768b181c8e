use crate::cli::CommandLineArgs;
use crate::config::AnalysisConfig;
use crate::report;
use crate::store::{DatasetStore, SledStore};

use expanduser::expanduser;
use genpdf::fonts::{FontData, FontFamily};
use std::sync::Arc;
use tracing::{event, Level};
use validator::Validate;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Validated analysis configuration.
    pub config: AnalysisConfig,

    /// Dataset store.
    pub store: Arc<dyn DatasetStore>,

    // Fonts for PDF reports, if they could be loaded.
    pub fonts: Option<FontFamily<FontData>>,
}

impl AppState {
    /// Create and return an [AppState].
    ///
    /// Aborts if the analysis configuration is invalid or the store cannot be opened.
    pub fn new(args: &CommandLineArgs) -> Self {
        let store_path = expanduser(&args.store_path)
            .expect("Failed to expand ~ to user name. Please provide an absolute path instead.");
        let store = SledStore::open(store_path, args.history_limit)
            .expect("failed to open dataset store");
        let fonts = match report::load_fonts(&args.font_dir, &args.font_family) {
            Ok(fonts) => Some(fonts),
            Err(error) => {
                event!(
                    Level::WARN,
                    font_dir = %args.font_dir,
                    font_family = %args.font_family,
                    "failed to load report fonts, reports are disabled: {}",
                    error
                );
                None
            }
        };
        Self::with_store(args, Arc::new(store), fonts)
    }

    /// Create and return an [AppState] using the given store.
    ///
    /// # Arguments
    ///
    /// * `args`: Command line arguments
    /// * `store`: Dataset store
    /// * `fonts`: Fonts for PDF reports
    pub fn with_store(
        args: &CommandLineArgs,
        store: Arc<dyn DatasetStore>,
        fonts: Option<FontFamily<FontData>>,
    ) -> Self {
        let config = AnalysisConfig::from(args);
        if let Err(errors) = config.validate() {
            panic!("invalid analysis configuration: {errors}");
        }
        Self {
            args: args.clone(),
            config,
            store,
            fonts,
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
