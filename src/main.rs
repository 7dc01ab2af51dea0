use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use million_listings::api::{
    ApiClient, NotificationRepository, OwnerRepository, PropertyRepository,
};
use million_listings::auth::{AuthSession, TokenStorage};
use million_listings::config::Config;
use million_listings::favorites::Favorites;
use million_listings::filter::{sort_properties, PropertyFilter, SortOrder};
use million_listings::fixtures::MockBackend;
use million_listings::models::{Property, PropertyDetail, PropertyType};
use million_listings::state::{
    AgentsState, NotificationsState, PropertiesState, PropertyDetailState,
};
use million_listings::storage::FileStore;
use million_listings::upload::{ImageSlot, ImageUploader};

#[derive(Parser)]
#[command(name = "million", about = "Browse and manage Million luxury listings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List properties, optionally filtered
    List(ListArgs),
    /// Show one property with its owner and sale history
    Show { id: String },
    /// List owners and agents
    Agents,
    /// Add or remove a property from favorites
    Favorite { id: String },
    /// Show saved favorites
    Favorites {
        #[arg(long)]
        clear: bool,
    },
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Keep the stored session fresh until interrupted
    Watch,
    Notifications {
        #[arg(long)]
        mark_all_read: bool,
        #[arg(long)]
        mark_read: Option<String>,
    },
    Health,
    Stats,
    /// Upload a cover or gallery image for a property
    Upload(UploadArgs),
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    min_price: Option<u64>,
    #[arg(long)]
    max_price: Option<u64>,
    #[arg(long, value_delimiter = ',')]
    bedrooms: Vec<u32>,
    #[arg(long, value_delimiter = ',')]
    bathrooms: Vec<u32>,
    #[arg(long = "type", value_delimiter = ',')]
    property_types: Vec<PropertyType>,
    #[arg(long)]
    location: Vec<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value = "newest")]
    sort: SortOrder,
    #[arg(long, default_value_t = 12)]
    page_size: u32,
    /// Keep loading pages until every match is shown
    #[arg(long)]
    all: bool,
}

impl ListArgs {
    fn filter(&self) -> PropertyFilter {
        PropertyFilter {
            min_price: self.min_price,
            max_price: self.max_price,
            bedrooms: self.bedrooms.clone(),
            bathrooms: self.bathrooms.clone(),
            property_types: self.property_types.clone(),
            locations: self.location.clone(),
            search: self.search.clone(),
        }
    }
}

#[derive(Args)]
struct UploadArgs {
    property_id: String,
    file: PathBuf,
    /// Gallery position; the cover is written when omitted
    #[arg(long)]
    gallery: Option<u32>,
    #[arg(long)]
    content_type: Option<String>,
}

/// Repositories behind the CLI: the REST backend or the built-in mock data
struct Backend {
    properties: Arc<dyn PropertyRepository>,
    owners: Arc<dyn OwnerRepository>,
    notifications: Arc<dyn NotificationRepository>,
}

impl Backend {
    fn new(config: &Config, client: &ApiClient) -> Self {
        if config.features.mock_data {
            let mock = Arc::new(MockBackend::new());
            Self {
                properties: mock.clone(),
                owners: mock.clone(),
                notifications: mock,
            }
        } else {
            let api = Arc::new(client.clone());
            Self {
                properties: api.clone(),
                owners: api.clone(),
                notifications: api,
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .init();

    if config.features.debug {
        info!(?config, "🔧 Debug mode enabled");
    }

    let client = ApiClient::new(&config).context("Failed to create API client")?;
    let store = Arc::new(
        FileStore::open(&config.storage_dir)
            .with_context(|| format!("Failed to open storage at {}", config.storage_dir.display()))?,
    );
    let session = AuthSession::new(client.clone(), TokenStorage::new(store.clone()));
    if session.restore().await.context("Failed to read stored session")? {
        info!("🔑 Restored stored session");
    }
    let backend = Backend::new(&config, &client);

    match cli.command {
        Command::List(args) => list(&backend, &args).await?,
        Command::Show { id } => show(&backend, &id).await?,
        Command::Agents => {
            let mut agents = AgentsState::new(backend.owners.clone());
            agents.fetch().await;
            while agents.load_more().await {}
            if let Some(err) = agents.error() {
                bail!("Could not load agents: {}", err);
            }
            for agent in agents.agents() {
                println!(
                    "{} ({}) - {} listings{}",
                    agent.name,
                    agent.role,
                    agent.listing_count(),
                    agent
                        .rating
                        .map(|r| format!(", rated {:.1}", r))
                        .unwrap_or_default()
                );
            }
        }
        Command::Favorite { id } => {
            let mut detail = PropertyDetailState::new(backend.properties.clone());
            detail.load(&id).await;
            let Some(loaded) = detail.detail() else {
                bail!("Could not load property {}: {}", id, detail.error().unwrap_or("unknown error"));
            };
            let favorites = Favorites::new(store.clone());
            let added = favorites.toggle(&loaded.property)?;
            if added {
                println!("❤️  Saved {}", loaded.property.name);
            } else {
                println!("Removed {} from favorites", loaded.property.name);
            }
        }
        Command::Favorites { clear } => {
            let favorites = Favorites::new(store.clone());
            if clear {
                favorites.clear()?;
                println!("Favorites cleared");
            } else {
                let saved = favorites.list()?;
                if saved.is_empty() {
                    println!("No favorites yet");
                }
                for property in &saved {
                    print_card(property);
                }
            }
        }
        Command::Login { email, password } => {
            let user = session
                .login(&email, &password)
                .await
                .context("Login failed")?;
            match user {
                Some(user) => println!("Signed in as {} <{}>", user.name, user.email),
                None => println!("Signed in as {}", email),
            }
        }
        Command::Logout => {
            session.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => {
            let user = session.current_user().await.context("Not signed in")?;
            println!("{} <{}> ({})", user.name, user.email, user.role);
        }
        Command::Watch => {
            if !session.tokens().has_session()? {
                bail!("No stored session; run `million login` first");
            }
            info!(
                interval_secs = config.token_refresh_interval.as_secs(),
                "⏱️  Watching access token"
            );
            let handle = session.watch(config.token_refresh_interval);
            tokio::signal::ctrl_c().await?;
            handle.abort();
        }
        Command::Notifications {
            mark_all_read,
            mark_read,
        } => {
            let mut notifications = NotificationsState::new(backend.notifications.clone());
            notifications.fetch().await;
            if let Some(err) = notifications.error() {
                bail!("Could not load notifications: {}", err);
            }
            if let Some(id) = mark_read {
                notifications.mark_read(&id).await?;
            }
            if mark_all_read {
                notifications.mark_all_read().await?;
            }
            println!("{} unread", notifications.unread_count());
            for n in notifications.notifications() {
                println!("{} {} - {}", if n.read { " " } else { "•" }, n.title, n.message);
            }
        }
        Command::Health => {
            let health = client.health().await?;
            println!(
                "{} {}",
                if health.is_healthy() { "✅" } else { "❌" },
                health.status
            );
        }
        Command::Stats => {
            let stats = client.stats().await?;
            println!("Properties: {} ({} active, {} sold)", stats.total_properties, stats.active_properties, stats.sold_properties);
            println!("Owners: {}", stats.total_owners);
            println!("Average price: {}", format_price(stats.average_price.round() as u64));
        }
        Command::Upload(args) => upload(&config, &client, args).await?,
    }

    Ok(())
}

async fn list(backend: &Backend, args: &ListArgs) -> anyhow::Result<()> {
    let mut state = PropertiesState::with_page_size(backend.properties.clone(), args.page_size);
    state.set_filter(args.filter()).await;
    if args.all {
        while state.load_more().await {}
    }
    if let Some(err) = state.error() {
        bail!("Could not load properties: {}", err);
    }

    let mut items = state.items().to_vec();
    sort_properties(&mut items, args.sort);

    let pager = state.pager();
    info!(
        shown = items.len(),
        total = pager.total_count,
        page = pager.current_page,
        pages = pager.total_pages,
        "Listings loaded"
    );
    for property in &items {
        print_card(property);
    }
    if state.has_more() {
        println!("… {} more, use --all to load every page", pager.total_count.saturating_sub(items.len() as u64));
    }
    Ok(())
}

async fn show(backend: &Backend, id: &str) -> anyhow::Result<()> {
    let mut state = PropertyDetailState::new(backend.properties.clone());
    state.load(id).await;
    match state.detail() {
        Some(detail) => {
            print_detail(detail);
            Ok(())
        }
        None => bail!("Could not load property {}: {}", id, state.error().unwrap_or("unknown error")),
    }
}

async fn upload(config: &Config, client: &ApiClient, args: UploadArgs) -> anyhow::Result<()> {
    let content_type = match args.content_type {
        Some(ct) => ct,
        None => guess_content_type(&args.file)
            .with_context(|| format!("Cannot tell the image type of {}", args.file.display()))?
            .to_string(),
    };
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let slot = args.gallery.map_or(ImageSlot::Cover, ImageSlot::Gallery);

    if config.blob_token.is_none() {
        warn!("BLOB_READ_WRITE_TOKEN is not set; the upload route may refuse the request");
    }
    let uploader = ImageUploader::new(client, config)?;
    let uploaded = uploader
        .upload(&args.property_id, slot, &content_type, bytes)
        .await
        .context("Upload failed")?;
    println!("📷 {}", uploaded.url);
    Ok(())
}

fn guess_content_type(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("${}", out)
}

fn print_card(property: &Property) {
    println!("{}. {} ({})", property.id, property.name, format_price(property.price));
    println!(
        "   {} bd, {} ba, {} sqft · {}",
        property.bedrooms, property.bathrooms, property.size_sqft, property.status
    );
    println!("   {}, {}", property.address, property.city);
    if let Some(cover) = property.cover_image() {
        println!("   Cover: {}", cover.url);
    }
    println!();
}

fn print_detail(detail: &PropertyDetail) {
    let property = &detail.property;
    print_card(property);
    if let Some(kind) = property.property_type {
        println!("Type: {}", kind);
    }
    if let Some(per_sqft) = property.price_per_sqft() {
        println!("Price per sqft: ${:.0}", per_sqft);
    }
    if !property.description.is_empty() {
        println!("{}", property.description);
    }
    if !property.features.is_empty() {
        println!("Features: {}", property.features.join(", "));
    }
    if !property.amenities.is_empty() {
        println!("Amenities: {}", property.amenities.join(", "));
    }
    println!("Gallery: {} images", property.images.len());
    if let Some(owner) = &detail.owner {
        println!("Listed by {} ({})", owner.name, owner.role);
    }

    let timeline = detail.timeline();
    if !timeline.is_empty() {
        println!("\nHistory:");
        for trace in timeline {
            println!(
                "  {}  {:<24} {} (tax {})",
                trace.date_sale.format("%Y-%m-%d"),
                trace.name,
                format_price(trace.value),
                format_price(trace.tax)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_prices_with_separators() {
        assert_eq!(format_price(0), "$0");
        assert_eq!(format_price(950), "$950");
        assert_eq!(format_price(1_150_000), "$1,150,000");
        assert_eq!(format_price(12_750_000), "$12,750,000");
    }

    #[test]
    fn list_args_keep_an_unset_price_bound_open() {
        let cli = Cli::parse_from(["million", "list", "--max-price", "3000000", "--type", "villa,condo"]);
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        let filter = args.filter();
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(3_000_000));
        assert_eq!(filter.property_types, vec![PropertyType::Villa, PropertyType::Condo]);
    }
}
