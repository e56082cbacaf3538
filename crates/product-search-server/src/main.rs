//! Product search server: entry point.

use std::path::Path;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use product_search::{
    validate_new_product, CatalogError, CatalogStore, GeneratorFactory, JsonProductLoader,
    ProductLoader, Recommender, StrategyKind,
};
use product_search_server::config::{
    resolve_db_path, resolve_inference, resolve_token, DEFAULT_ADDR,
};
use product_search_server::AppState;

#[derive(Parser)]
#[command(
    name = "product-search-server",
    about = "Product catalog HTTP API with strategy-based search and AI recommendations",
    version
)]
struct Cli {
    /// Path to the catalog database.
    #[arg(short, long)]
    db: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default).
    Serve {
        /// Listen address (host:port).
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: String,

        /// Bearer token required on /api routes.
        /// Also reads from PRODUCT_SEARCH_TOKEN env var.
        #[arg(long)]
        token: Option<String>,

        /// Inference API key.
        /// Also reads from HUGGINGFACE_API_KEY env var.
        #[arg(long)]
        api_key: Option<String>,

        /// Inference host base URL.
        /// Also reads from INFERENCE_BASE_URL env var.
        #[arg(long)]
        inference_url: Option<String>,
    },

    /// Import products from a JSON array file.
    Import {
        /// Path to the JSON file.
        file: String,
    },

    /// Print catalog and server information as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   product-search-server completions bash > ~/.local/share/bash-completion/completions/product-search-server
    ///   product-search-server completions zsh > ~/.zfunc/_product-search-server
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let db_path = resolve_db_path(cli.db.as_deref());

    match cli.command.unwrap_or(Commands::Serve {
        addr: DEFAULT_ADDR.to_string(),
        token: None,
        api_key: None,
        inference_url: None,
    }) {
        Commands::Serve {
            addr,
            token,
            api_key,
            inference_url,
        } => {
            let store = CatalogStore::open(Path::new(&db_path))?;
            let inference = resolve_inference(api_key, inference_url);
            let recommender = Recommender::new(GeneratorFactory::new(inference));
            let token = resolve_token(token);

            tracing::info!("Product search server");
            tracing::info!("Catalog: {db_path}");
            if token.is_some() {
                tracing::info!("Auth: bearer token required");
            }

            let state = Arc::new(AppState::new(store, recommender, token));
            product_search_server::run(state, &addr).await?;
        }

        Commands::Import { file } => {
            let store = CatalogStore::open(Path::new(&db_path))?;
            let records = JsonProductLoader::new(&file).load()?;

            let (mut imported, mut skipped, mut invalid) = (0usize, 0usize, 0usize);
            for record in records {
                let valid = match validate_new_product(record) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!("Skipping invalid record: {e}");
                        invalid += 1;
                        continue;
                    }
                };
                match store.create_unique_product(&valid) {
                    Ok(_) => imported += 1,
                    Err(CatalogError::DuplicateProduct(name)) => {
                        tracing::debug!("Skipping existing product: {name}");
                        skipped += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            println!("Imported {imported} products into {db_path}");
            println!("  Already present: {skipped}");
            println!("  Invalid: {invalid}");
        }

        Commands::Info => {
            let store = CatalogStore::open(Path::new(&db_path))?;
            let factory = GeneratorFactory::new(resolve_inference(None, None));
            let info = serde_json::json!({
                "server": {
                    "name": "product-search-server",
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "catalog": db_path,
                "products": store.count_products()?,
                "categories": store.categories()?,
                "search_strategies": StrategyKind::available(),
                "generators": factory.available_types(),
                "inference_url": factory.config().base_url,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "product-search-server",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
