use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cmr_stac_cli::commands::{
    catalog::handle_catalog,
    collection::handle_collection,
    collections::handle_collections,
    search::handle_search,
    translate::handle_translate,
    validate::{handle_validate, SchemaArg},
    RequestArgs, VocabularyArg,
};
use cmr_stac_cli::{exit_code, EXIT_FAILURE};
use cmr_stac_lib::Settings;

const LOG_FORMAT_ENV: &str = "CMR_STAC_LOG_FORMAT";

#[derive(Parser, Debug)]
#[command(author, version, about = "CMR to STAC translation utilities")]
struct Cli {
    /// Override the gateway base URL used in emitted links.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate request parameters into the CMR granule search `search` runs.
    Translate {
        #[arg(long, value_enum, default_value = "stac-query")]
        vocabulary: VocabularyArg,
        /// Provider to restrict the search to.
        #[arg(long)]
        provider: Option<String>,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Search granules of a provider and print them as a STAC FeatureCollection.
    Search {
        #[arg(long)]
        provider: String,
        #[arg(long, value_enum, default_value = "stac-query")]
        vocabulary: VocabularyArg,
        /// Check every item against the item schema.
        #[arg(long)]
        validate: bool,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Print the catalog of a provider's collections.
    Collections {
        #[arg(long)]
        provider: String,
        /// Check the catalog and collections against their schemas.
        #[arg(long)]
        validate: bool,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Print one collection of a provider, looked up by its STAC id.
    Collection {
        #[arg(long)]
        provider: String,
        /// STAC collection id (`short.vVERSION`).
        id: String,
    },
    /// Print the root catalog with one child per provider.
    Catalog {
        /// Provider to list; defaults to every provider CMR knows about.
        #[arg(long = "provider")]
        providers: Vec<String>,
    },
    /// Validate a STAC document file against a JSON Schema.
    Validate {
        #[arg(long, value_enum)]
        schema: SchemaArg,
        /// Document to validate.
        file: PathBuf,
        /// Directory holding `<schema>.json`; defaults to the configured one.
        #[arg(long)]
        schema_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::from_env();
    if let Some(base_url) = cli.base_url {
        settings.stac_base_url = base_url.trim_end_matches('/').to_string();
    }

    match cli.command {
        Command::Translate {
            vocabulary,
            provider,
            request,
        } => handle_translate(
            settings,
            vocabulary.into(),
            &request.to_params()?,
            provider.as_deref(),
        )?,
        Command::Search {
            provider,
            vocabulary,
            validate,
            request,
        } => handle_search(
            settings,
            &provider,
            vocabulary.into(),
            &request.to_params()?,
            validate,
        )?,
        Command::Collections {
            provider,
            validate,
            request,
        } => handle_collections(settings, &provider, &request.to_params()?, validate)?,
        Command::Collection { provider, id } => handle_collection(settings, &provider, &id)?,
        Command::Catalog { providers } => handle_catalog(settings, &providers)?,
        Command::Validate {
            schema,
            file,
            schema_dir,
        } => {
            let schema_dir = schema_dir.unwrap_or(settings.schema_dir);
            if !handle_validate(schema.into(), &file, &schema_dir)? {
                return Ok(ExitCode::from(EXIT_FAILURE));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Logs go to stderr. `CMR_STAC_LOG_FORMAT=json` switches to flattened JSON
/// events for log shippers.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .flatten_event(true)
            .with_writer(io::stderr);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    } else {
        let fmt_layer = fmt::layer().with_writer(io::stderr);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    }
}
