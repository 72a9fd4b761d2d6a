use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tourcheckout::application::fragment_cache::LocalFragmentCache;
use tourcheckout::application::page::BookingPage;
use tourcheckout::config::{CheckoutConfig, GatewayMode};
use tourcheckout::domain::csrf::CSRF_COOKIE;
use tourcheckout::domain::money::{CurrencyCode, CurrencyDisplay, Money};
use tourcheckout::domain::payment::{CardDetails, PayPalApproval, PaymentDetails, PaymentMethod};
use tourcheckout::domain::ports::{Document, StorageRef, TransportRef};
use tourcheckout::domain::session::{BookingSession, PriceRole, Step};
use tourcheckout::infrastructure::clock::SystemClock;
use tourcheckout::infrastructure::http::ReqwestTransport;
use tourcheckout::infrastructure::in_memory::{InMemoryDocument, InMemoryStorage};
use tourcheckout::logger::init_logger;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one payment through the checkout of an in-memory booking page
    Pay(PayArgs),
    /// Inspect or maintain the fragment cache
    Cache {
        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,

        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args)]
struct PayArgs {
    /// paypal, card or bank
    #[arg(long)]
    method: PaymentMethod,

    #[arg(long, default_value = "1")]
    booking_id: String,

    /// Simulate every gateway instead of calling the backend
    #[arg(long)]
    simulated: bool,

    /// Backend origin, overrides TOURCHECKOUT_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, default_value = "0")]
    subtotal: Decimal,

    #[arg(long, default_value = "0")]
    discount: Decimal,

    #[arg(long)]
    total: Decimal,

    #[arg(long, default_value = "USD")]
    currency: String,

    /// code or symbol, overrides TOURCHECKOUT_CURRENCY_DISPLAY
    #[arg(long)]
    currency_display: Option<CurrencyDisplay>,

    /// Value of the csrftoken cookie on the page
    #[arg(long)]
    csrf_token: Option<String>,

    #[arg(long, default_value = "")]
    card_number: String,
    #[arg(long, default_value = "")]
    card_expiry: String,
    #[arg(long, default_value = "")]
    card_cvc: String,
    #[arg(long, default_value = "")]
    card_holder: String,

    /// PayPal order id approved by the buyer, defaults to the order created for this payment
    #[arg(long)]
    paypal_order_id: Option<String>,

    /// Close the PayPal window instead of approving
    #[arg(long)]
    cancel: bool,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Store a value (JSON, or a plain string) under a key
    Set {
        key: String,
        value: String,
        /// Lifetime in seconds, defaults to TOURCHECKOUT_CACHE_TTL_SECS
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Print the value stored under a key
    Get { key: String },
    /// List stored keys
    Keys,
    /// Remove expired and unreadable entries
    Sweep,
    /// Remove every cache entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger("tourcheckout");

    let config = CheckoutConfig::from_env().into_diagnostic()?;
    match cli.command {
        Command::Pay(args) => pay(config, args).await,
        Command::Cache { db_path, action } => cache(config, db_path, action),
    }
}

async fn pay(mut config: CheckoutConfig, args: PayArgs) -> Result<()> {
    if args.simulated {
        config.gateway_mode = GatewayMode::Simulated;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(display) = args.currency_display {
        config.currency_display = display;
    }

    let document = Arc::new(InMemoryDocument::booking_page(&args.booking_id));
    if let Some(token) = &args.csrf_token {
        document.set_cookie(&format!("{CSRF_COOKIE}={token}; path=/"));
    }
    let transport: TransportRef = Arc::new(
        ReqwestTransport::new(config.base_url.clone(), config.http_timeout).into_diagnostic()?,
    );

    let currency = CurrencyCode::new(&args.currency).into_diagnostic()?;
    let session = BookingSession::new(currency).with_prices(
        Money::new(args.subtotal),
        Money::new(args.discount),
        Money::new(args.total),
    );
    let page = BookingPage::mount(&config, document.clone(), session, transport).into_diagnostic()?;
    let price_follower = page.prices.clone().follow();

    page.steps.go_to_step(Step::PAYMENT.number()).await;

    let details = match args.method {
        PaymentMethod::PayPal if args.cancel => PaymentDetails::PayPal(PayPalApproval::Cancelled),
        PaymentMethod::PayPal => PaymentDetails::PayPal(PayPalApproval::Approved {
            order_id: args.paypal_order_id.unwrap_or_default(),
        }),
        PaymentMethod::Card => PaymentDetails::Card(CardDetails {
            number: args.card_number,
            expiry: args.card_expiry,
            cvc: args.card_cvc,
            holder_name: args.card_holder,
        }),
        PaymentMethod::Bank => PaymentDetails::Bank,
    };

    let attempt = page.checkout.pay(details).await.into_diagnostic()?;

    println!("step: {}", page.steps.current_step());
    for role in PriceRole::ALL {
        println!("{}: {}", role.as_str(), page.prices.formatted(role));
    }
    println!("status: {:?}", attempt.status);
    if let Some(reference) = &attempt.transaction_id {
        println!("transaction_id: {reference}");
    }
    if let Some(message) = &attempt.error_message {
        println!("error: {message}");
    }
    price_follower.abort();
    Ok(())
}

fn cache(config: CheckoutConfig, db_path: Option<PathBuf>, action: CacheAction) -> Result<()> {
    let storage = open_storage(db_path)?;
    let cache = LocalFragmentCache::from_config(&config, storage, Arc::new(SystemClock));

    match action {
        CacheAction::Set {
            key,
            value,
            ttl_secs,
        } => {
            let value = serde_json::from_str::<serde_json::Value>(&value)
                .unwrap_or(serde_json::Value::String(value));
            let ttl = ttl_secs.map_or(config.cache_ttl, Duration::from_secs);
            if cache.set_with_ttl(&key, &value, ttl) {
                println!("stored {key}");
            } else {
                eprintln!("Error storing {key}");
            }
        }
        CacheAction::Get { key } => match cache.get::<serde_json::Value>(&key) {
            Some(value) => println!("{value}"),
            None => println!("miss"),
        },
        CacheAction::Keys => {
            for key in cache.keys() {
                println!("{key}");
            }
        }
        CacheAction::Sweep => println!("removed {}", cache.clear_expired()),
        CacheAction::Clear => println!("removed {}", cache.clear_all()),
    }
    Ok(())
}

fn open_storage(db_path: Option<PathBuf>) -> Result<StorageRef> {
    match db_path {
        Some(db_path) => persistent_storage(db_path),
        None => Ok(Arc::new(InMemoryStorage::new())),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn persistent_storage(db_path: PathBuf) -> Result<StorageRef> {
    use tourcheckout::infrastructure::rocksdb::RocksDbStorage;

    let store = RocksDbStorage::open(db_path).into_diagnostic()?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn persistent_storage(_db_path: PathBuf) -> Result<StorageRef> {
    eprintln!(
        "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
    );
    Ok(Arc::new(InMemoryStorage::new()))
}
