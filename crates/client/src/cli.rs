//! Command-line front end for the `storefront` binary.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

use storefront_core::{AggregateId, UserId};
use storefront_lists::ListId;
use storefront_products::{Category, ProductId};

use crate::api::{ApiClient, StorefrontApi};
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::session::{AppSession, Screen};
use crate::types::{ImageUpload, Product, Sale};
use crate::views::{CustomListsView, ProductEditForm, ProductForm, ProductListView, SaleCart, SalesSummaryView};

/// storefront - inventory and sales from the terminal
#[derive(Parser, Debug)]
#[command(name = "storefront", version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the storefront API
    #[arg(long, env = "STOREFRONT_URL", default_value = "http://localhost:8080")]
    pub url: String,

    /// Where the login is kept (defaults to the user data directory)
    #[arg(long, env = "STOREFRONT_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and remember the session
    Login {
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a seller account and log in
    Register {
        name: String,
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Change your display name
    Rename { name: String },

    /// List products
    Products {
        #[arg(long, value_parser = Category::from_str)]
        category: Option<Category>,
    },

    /// Add a product (admin)
    AddProduct {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Price in major units, e.g. 12.50
        #[arg(long)]
        price: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        category: String,
        /// JPEG, PNG, GIF or WebP file
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Change a product's fields (admin); omitted fields stay as they are
    EditProduct {
        #[arg(value_parser = parse_product_id)]
        id: ProductId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Price in major units, e.g. 12.50
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        quantity: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },

    /// Replace a product's image (admin)
    SetImage {
        #[arg(value_parser = parse_product_id)]
        id: ProductId,
        image: PathBuf,
    },

    /// Register a sale, e.g. `sell <product-id>:2 <product-id>:1`
    Sell {
        #[arg(required = true, value_parser = parse_sale_item)]
        items: Vec<(ProductId, u32)>,
    },

    /// List sales with totals
    Sales {
        /// Seller to show (admins only; sellers always see their own)
        #[arg(long, value_parser = UserId::from_str)]
        user: Option<UserId>,
    },

    /// Totals and commission per seller, as computed by the server
    Summary {
        #[arg(long, value_parser = UserId::from_str)]
        user: Option<UserId>,
    },

    /// Show custom lists, or one list's products
    Lists {
        #[arg(value_parser = parse_list_id)]
        id: Option<ListId>,
    },
}

/// Parse `PRODUCT_ID:QTY`.
pub fn parse_sale_item(raw: &str) -> Result<(ProductId, u32), String> {
    let (id, qty) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected PRODUCT_ID:QTY, got '{raw}'"))?;
    let id = AggregateId::from_str(id.trim()).map_err(|e| e.to_string())?;
    let qty: u32 = qty
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity '{qty}'"))?;
    if qty == 0 {
        return Err("quantity must be at least 1".to_string());
    }
    Ok((ProductId::new(id), qty))
}

fn parse_product_id(raw: &str) -> Result<ProductId, String> {
    AggregateId::from_str(raw.trim())
        .map(ProductId::new)
        .map_err(|e| e.to_string())
}

fn parse_list_id(raw: &str) -> Result<ListId, String> {
    AggregateId::from_str(raw.trim())
        .map(ListId::new)
        .map_err(|e| e.to_string())
}

fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let store: Arc<dyn CredentialStore> = match cli.credentials {
        Some(path) => Arc::new(FileCredentialStore::new(path)),
        None => Arc::new(FileCredentialStore::default_location()?),
    };
    let api: Arc<dyn StorefrontApi> = Arc::new(ApiClient::new(cli.url, store.clone()));
    let session = AppSession::new(api.clone(), store);

    match cli.command {
        Command::Login { email, password } => {
            let screen = session.login(&email, &password).await?;
            print_screen(&screen);
        }
        Command::Register { name, email, password } => {
            let screen = session.register(&name, &email, &password).await?;
            print_screen(&screen);
        }
        Command::Logout => {
            session.logout()?;
            println!("logged out");
        }
        Command::Whoami => print_screen(&session.start()?),
        Command::Rename { name } => {
            let user = api.rename_me(&name).await?;
            println!("now known as {}", user.name);
        }
        Command::EditProduct { id, name, description, price, quantity, category } => {
            let mut form = ProductEditForm::new(api.get_product(id).await?);
            for (field, value) in [
                (&mut form.name, name),
                (&mut form.description, description),
                (&mut form.price, price),
                (&mut form.quantity, quantity),
                (&mut form.category, category),
            ] {
                if let Some(value) = value {
                    *field = value;
                }
            }
            let product = form.submit(api.as_ref()).await?;
            print_product(&product);
        }
        Command::SetImage { id, image } => {
            let product = api.set_product_image(id, read_image(&image)?).await?;
            print_product(&product);
        }
        Command::Products { category } => {
            let view = ProductListView::new(api);
            view.set_category(category).await;
            let state = view.snapshot();
            if let Some(err) = state.error {
                bail!(err);
            }
            for p in &state.items {
                print_product(p);
            }
        }
        Command::AddProduct { name, description, price, quantity, category, image } => {
            let image = match image {
                Some(path) => Some(read_image(&path)?),
                None => None,
            };
            let mut form = ProductForm::new();
            form.name = name;
            form.description = description;
            form.price = price;
            form.quantity = quantity;
            form.category = category;
            form.image = image;
            let product = form.submit(api.as_ref()).await?;
            print_product(&product);
        }
        Command::Sell { items } => {
            let cart = SaleCart::new(api);
            for (product_id, quantity) in items {
                cart.add(product_id, quantity);
            }
            match cart.submit().await {
                Some(sale) => print_sale(&sale),
                None => bail!(cart.snapshot().error.unwrap_or_else(|| "sale not registered".to_string())),
            }
        }
        Command::Sales { user } => {
            let view = SalesSummaryView::new(api);
            view.load(user).await;
            let state = view.snapshot();
            if let Some(err) = state.error {
                bail!(err);
            }
            for sale in &state.sales {
                print_sale(sale);
            }
            println!(
                "{} sales, {} units, total {}, commission {}",
                state.summary.sale_count, state.summary.units, state.summary.total, state.summary.commission
            );
        }
        Command::Summary { user } => {
            let report = api.sales_summary(user).await?;
            println!("commission rate: {}.{:02}%", report.commission_rate_bps / 100, report.commission_rate_bps % 100);
            for row in &report.summary.by_user {
                println!(
                    "{}  sales {}  units {}  total {}  commission {}",
                    row.user_id, row.sale_count, row.units, row.total, row.commission
                );
            }
            println!("total {}  commission {}", report.summary.total, report.summary.commission);
        }
        Command::Lists { id } => {
            let view = CustomListsView::new(api);
            match id {
                Some(id) => {
                    view.open(id).await;
                    let state = view.snapshot();
                    if let Some(err) = state.error {
                        bail!(err);
                    }
                    if let Some(detail) = state.selected {
                        println!("{}: {}", detail.list.name, detail.list.description);
                        for p in &detail.products {
                            print_product(p);
                        }
                    }
                }
                None => {
                    view.load().await;
                    let state = view.snapshot();
                    if let Some(err) = state.error {
                        bail!(err);
                    }
                    for list in &state.lists {
                        let scope = if list.is_public { "public" } else { "shared" };
                        println!("{}  {} ({} products, {scope})", list.id.0, list.name, list.product_ids.len());
                    }
                }
            }
        }
    }
    Ok(())
}

fn read_image(path: &Path) -> anyhow::Result<ImageUpload> {
    let Some(content_type) = image_content_type(path) else {
        bail!("{}: only JPEG, PNG, GIF and WebP images are accepted", path.display());
    };
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(ImageUpload { file_name, content_type: content_type.to_string(), bytes })
}

fn print_screen(screen: &Screen) {
    match screen {
        Screen::Login => println!("not logged in"),
        Screen::Home { user } => {
            let role = if user.is_admin { "admin" } else { "seller" };
            println!("{} <{}> ({role})", user.name, user.email);
        }
    }
}

fn print_product(p: &Product) {
    println!("{}  {:<24} {:>10}  stock {:>4}  {}", p.id, p.name, p.price, p.quantity, p.category.as_str());
}

fn print_sale(s: &Sale) {
    println!(
        "{}  {}  {} units  total {}  commission {}",
        s.id.0,
        s.created_at.format("%Y-%m-%d %H:%M"),
        s.units(),
        s.total,
        s.commission
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sale_items() {
        let id = AggregateId::new();
        let (product, qty) = parse_sale_item(&format!("{id}:3")).unwrap();
        assert_eq!(product, ProductId::new(id));
        assert_eq!(qty, 3);

        assert!(parse_sale_item(&id.to_string()).is_err());
        assert!(parse_sale_item(&format!("{id}:0")).is_err());
        assert!(parse_sale_item(&format!("{id}:-1")).is_err());
        assert!(parse_sale_item("nope:1").is_err());
    }

    #[test]
    fn image_types_follow_extension() {
        assert_eq!(image_content_type(Path::new("a/lamp.JPG")), Some("image/jpeg"));
        assert_eq!(image_content_type(Path::new("lamp.webp")), Some("image/webp"));
        assert_eq!(image_content_type(Path::new("lamp.pdf")), None);
        assert_eq!(image_content_type(Path::new("lamp")), None);
    }

    #[test]
    fn cli_parses_commands() {
        let id = AggregateId::new();
        let cli = Cli::try_parse_from([
            "storefront",
            "--url",
            "http://127.0.0.1:9000",
            "sell",
            &format!("{id}:2"),
        ])
        .unwrap();
        assert_eq!(cli.url, "http://127.0.0.1:9000");
        assert!(matches!(cli.command, Command::Sell { ref items } if items == &vec![(ProductId::new(id), 2)]));

        let cli = Cli::try_parse_from(["storefront", "products", "--category", "electronics"]).unwrap();
        assert!(matches!(cli.command, Command::Products { category: Some(Category::Electronics) }));

        assert!(Cli::try_parse_from(["storefront", "sell"]).is_err());

        let cli = Cli::try_parse_from(["storefront", "edit-product", &id.to_string(), "--price", "9.99"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::EditProduct { price: Some(ref p), name: None, .. } if p == "9.99"
        ));

        let cli = Cli::try_parse_from(["storefront", "set-image", &id.to_string(), "lamp.png"]).unwrap();
        assert!(matches!(cli.command, Command::SetImage { id: p, .. } if p == ProductId::new(id)));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
