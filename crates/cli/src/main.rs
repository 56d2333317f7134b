use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use zestraw_api::{HttpBackend, ShippingAddress, Storefront, ZestrawApi};
use zestraw_cart::CartSnapshot;
use zestraw_catalog::{FilterState, ShopFilter, SortKey};
use zestraw_core::{NewLineItem, Product};
use zestraw_persist::{MemoryStore, SqliteStore, Store};

#[derive(Parser, Debug)]
#[command(name = "zestrawctl", version, about = "Zestraw storefront CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Bearer token for authenticated calls (login prints one)
    #[arg(long = "token", global = true, env = "ZESTRAW_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Sort {
    Latest,
    Rating,
    PriceLow,
    PriceHigh,
}

impl From<Sort> for SortKey {
    fn from(s: Sort) -> Self {
        match s {
            Sort::Latest => SortKey::Latest,
            Sort::Rating => SortKey::Rating,
            Sort::PriceLow => SortKey::PriceLow,
            Sort::PriceHigh => SortKey::PriceHigh,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Browse the product catalog
    Products {
        /// Restrict to one product type (e.g. "Plates")
        #[arg(long = "type")]
        product_type: Option<String>,
        #[arg(long = "min-price", default_value_t = 0.0)]
        min_price: f64,
        #[arg(long = "max-price")]
        max_price: Option<f64>,
    },
    /// Show one product
    Product { id: String },
    /// Query the supplier marketplace
    Suppliers {
        /// Free-text search over company, industry and location
        query: Option<String>,
        /// Location filter; repeat for several (OR)
        #[arg(long = "location")]
        locations: Vec<String>,
        #[arg(long = "min-moq", default_value_t = 0)]
        min_moq: u32,
        /// Verified suppliers only
        #[arg(long = "verified", action = ArgAction::SetTrue)]
        verified: bool,
        #[arg(long = "sort", value_enum, default_value_t = Sort::Latest)]
        sort: Sort,
        #[arg(long = "page", default_value_t = 1)]
        page: usize,
        /// Print filter stage counts
        #[arg(long = "explain", action = ArgAction::SetTrue)]
        explain: bool,
    },
    /// Inspect or mutate the local cart
    Cart {
        #[command(subcommand)]
        op: CartCmd,
    },
    /// Place the current cart as an order
    Checkout {
        #[arg(long)]
        address: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        zip: String,
        /// Payment method tag passed to the backend (e.g. "cod", "upi")
        #[arg(long, default_value = "cod")]
        payment: String,
    },
    /// List your past orders
    Orders,
    /// Log in with email and password
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Phone OTP: request a code, or verify one with --code
    Otp {
        phone: String,
        #[arg(long)]
        code: Option<String>,
    },
    /// Print the effective runtime configuration
    Stats,
}

#[derive(Subcommand, Debug)]
enum CartCmd {
    /// Print the cart with derived totals
    Show,
    /// Add a product (metadata is copied from the catalog)
    Add {
        id: String,
        #[arg(long, default_value_t = 1)]
        qty: u32,
        /// Pack-size variant; same product in two sizes makes two rows
        #[arg(long)]
        size: Option<String>,
    },
    /// Remove one row
    Rm {
        id: String,
        #[arg(long)]
        size: Option<String>,
    },
    /// Set a row's quantity; zero or negative removes it
    Set {
        id: String,
        qty: i64,
        #[arg(long)]
        size: Option<String>,
    },
    /// Empty the cart
    Clear,
}

fn init_tracing() {
    let env = std::env::var("ZESTRAW_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("ZESTRAW_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid ZESTRAW_METRICS_ADDR; expected host:port");
        }
    }
}

fn open_store() -> Arc<dyn Store> {
    match SqliteStore::open_default() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            warn!(error = %e, "cart db unavailable; cart will not persist");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Catalog with offline fallback: the built-in listing stands in when the
/// backend is unreachable.
async fn load_products(front: &Storefront) -> Vec<Product> {
    match front.products().await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "backend unreachable; using built-in catalog");
            zestraw_core::builtin::products()
        }
    }
}

fn require_token(token: Option<String>) -> Result<String> {
    token.ok_or_else(|| anyhow::anyhow!("no token; run `zestrawctl login` or set ZESTRAW_TOKEN"))
}

fn print_product(p: &Product) {
    let size = p.size.as_deref().unwrap_or("-");
    let badge = p.badge.as_deref().unwrap_or("");
    println!(
        "{} • {} • ₹{:.2} • {} {}",
        p.id, p.name, p.price, size, badge
    );
}

fn print_cart(snap: &CartSnapshot) {
    if snap.items.is_empty() {
        println!("cart is empty");
        return;
    }
    for i in &snap.items {
        let size = i.variant.as_deref().unwrap_or("-");
        println!(
            "{} • {} • {} • {} x ₹{:.2} = ₹{:.2}",
            i.product_id,
            i.name,
            size,
            i.quantity,
            i.unit_price,
            i.unit_price * f64::from(i.quantity)
        );
    }
    println!("items: {} • subtotal: ₹{:.2}", snap.total_items(), snap.subtotal());
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let front = Storefront::new(open_store(), Arc::new(HttpBackend::new()));

    match cli.command {
        Commands::Products { product_type, min_price, max_price } => {
            let products = load_products(&front).await;
            let filter = ShopFilter {
                product_type,
                price_min: min_price,
                price_max: max_price.unwrap_or(f64::MAX),
            };
            let hits = zestraw_catalog::filter_products(&products, &filter);
            info!(total = products.len(), shown = hits.len(), "products listed");
            match cli.output {
                Output::Human => {
                    for p in &hits {
                        print_product(p);
                    }
                    println!("showing {} of {} items", hits.len(), products.len());
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&hits)?),
            }
        }
        Commands::Product { id } => match front.product(&id).await {
            Ok(p) => match cli.output {
                Output::Human => {
                    print_product(&p);
                    if let Some(score) = p.eco_score {
                        println!("eco score: {}", score);
                    }
                    for t in &p.tiers {
                        println!("  {} • ₹{:.2}", t.size, t.price);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&p)?),
            },
            Err(e) => {
                eprintln!("product error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Suppliers { query, locations, min_moq, verified, sort, page, explain } => {
            let mut filter = FilterState::default();
            if let Some(q) = query {
                filter.set_search(q);
            }
            for loc in locations {
                filter.toggle_location(&loc);
            }
            filter.set_min_moq(min_moq);
            filter.set_verified_only(verified);
            filter.set_sort(sort.into());
            filter.set_page(page);

            let (listing, dbg) = front.suppliers(&filter);
            match cli.output {
                Output::Human => {
                    for s in &listing.entries {
                        let badge = if s.verified { "verified" } else { "unverified" };
                        println!(
                            "{} • {} • {} • {}, {} • MOQ {} {} • ₹{:.0}-{:.0}/{} • rating {}",
                            s.id, s.name, badge, s.location, s.state, s.moq, s.unit,
                            s.price_min, s.price_max, s.price_unit, s.sustainability_rating
                        );
                    }
                    println!(
                        "{} suppliers • page {}/{}",
                        listing.total, listing.page, listing.total_pages
                    );
                    if explain {
                        println!(
                            "explain: total={} text={} locations={} moq={} verified={}",
                            dbg.total, dbg.after_text, dbg.after_locations, dbg.after_moq,
                            dbg.after_verified
                        );
                    }
                }
                Output::Json => {
                    if explain {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&serde_json::json!({
                                "page": listing,
                                "explain": dbg,
                            }))?
                        );
                    } else {
                        println!("{}", serde_json::to_string_pretty(&listing)?);
                    }
                }
            }
        }
        Commands::Cart { op } => {
            let snap = match op {
                CartCmd::Show => front.cart(),
                CartCmd::Add { id, qty, size } => {
                    let products = load_products(&front).await;
                    let Some(p) = products.iter().find(|p| p.id == id) else {
                        eprintln!("unknown product: {}", id);
                        std::process::exit(1);
                    };
                    let mut item = NewLineItem::from_product(p);
                    if let Some(s) = size.or_else(|| p.size.clone()) {
                        item = item.with_variant(s);
                    }
                    front.add_to_cart(item, qty)?
                }
                CartCmd::Rm { id, size } => front.remove_from_cart(&id, size.as_deref())?,
                CartCmd::Set { id, qty, size } => {
                    // Signed input: anything at or below zero removes the row.
                    let qty = u32::try_from(qty.max(0)).unwrap_or(u32::MAX);
                    front.update_cart_quantity(&id, qty, size.as_deref())?
                }
                CartCmd::Clear => front.clear_cart()?,
            };
            match cli.output {
                Output::Human => print_cart(&snap),
                Output::Json => println!("{}", serde_json::to_string_pretty(&*snap)?),
            }
        }
        Commands::Checkout { address, city, state, zip, payment } => {
            let token = require_token(cli.token)?;
            let shipping = ShippingAddress { address, city, state, zip };
            match front.checkout(&token, shipping, &payment).await {
                Ok(order) => match cli.output {
                    Output::Human => {
                        println!("order placed: {} • {} • ₹{:.2}", order.id, order.status, order.total_amount)
                    }
                    Output::Json => println!("{}", serde_json::to_string_pretty(&order)?),
                },
                Err(e) => {
                    eprintln!("checkout failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Orders => {
            let token = require_token(cli.token)?;
            let orders = front.orders(&token).await?;
            match cli.output {
                Output::Human => {
                    if orders.is_empty() {
                        println!("no orders yet");
                    }
                    for o in &orders {
                        println!(
                            "{} • {} • {} items • ₹{:.2}",
                            o.id,
                            o.status,
                            o.order_items.len(),
                            o.total_amount
                        );
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&orders)?),
            }
        }
        Commands::Login { email, password } => match front.login(&email, &password).await {
            Ok(session) => {
                info!(user = %session.user.email, "login ok");
                println!("{}", session.token);
            }
            Err(e) => {
                eprintln!("login failed: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Otp { phone, code } => match front.phone_auth(&phone, code.as_deref()).await {
            Ok(session) => {
                if session.token.is_empty() {
                    println!("code sent to {}", phone);
                } else {
                    println!("{}", session.token);
                }
            }
            Err(e) => {
                eprintln!("phone auth failed: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Stats => {
            let stats = front.stats();
            match cli.output {
                Output::Human => {
                    println!("base url: {}", stats.base_url);
                    println!("cart db: {}", stats.db_path.as_deref().unwrap_or("(default)"));
                    println!("http timeout: {}s", stats.http_timeout_secs);
                    println!("page size: {}", stats.page_size);
                    println!("metrics: {}", stats.metrics_addr.as_deref().unwrap_or("(off)"));
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            }
        }
    }

    Ok(())
}
