use std::sync::Arc;

use storefront_api::ApiConfig;
use storefront_api::config::BootstrapAdmin;
use storefront_client::types::{ImageUpload, ListUpdate, NewList};
use storefront_client::views::{ProductEditForm, ProductForm, ProductListView, SaleCart, SalesSummaryView};
use storefront_client::{ApiClient, AppSession, ClientError, CredentialStore, FileCredentialStore, Screen, StorefrontApi};
use storefront_core::Money;

const ADMIN_EMAIL: &str = "root@example.com";
const ADMIN_PASSWORD: &str = "changeme";

async fn spawn_server() -> String {
    let config = ApiConfig {
        jwt_secret: "client-test-secret".to_string(),
        bootstrap_admin: Some(BootstrapAdmin {
            name: "Root".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        }),
        ..ApiConfig::default()
    };
    let app = storefront_api::build_app(config).await.expect("failed to build app");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct Client {
    _dir: tempfile::TempDir,
    store: Arc<FileCredentialStore>,
    api: Arc<dyn StorefrontApi>,
    session: AppSession,
}

fn client(base_url: &str) -> Client {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCredentialStore::new(dir.path().join("credentials.json")));
    let api: Arc<dyn StorefrontApi> = Arc::new(ApiClient::new(base_url, store.clone()));
    let session = AppSession::new(api.clone(), store.clone());
    Client { _dir: dir, store, api, session }
}

#[tokio::test]
async fn seller_flow_against_live_server() {
    let base_url = spawn_server().await;

    let admin = client(&base_url);
    assert_eq!(admin.session.start().unwrap(), Screen::Login);
    let screen = admin.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    assert!(matches!(screen, Screen::Home { ref user } if user.is_admin));

    let mut form = ProductForm::new();
    form.name = "Desk lamp".to_string();
    form.description = "Warm light".to_string();
    form.price = "12.50".to_string();
    form.quantity = "5".to_string();
    form.category = "home".to_string();
    let lamp = form.submit(admin.api.as_ref()).await.unwrap();
    assert_eq!(lamp.price, Money::from_minor(1_250));

    let seller = client(&base_url);
    let screen = seller.session.register("Sam", "sam@example.com", "secret1").await.unwrap();
    let Screen::Home { user: sam } = screen else {
        panic!("expected home screen after registering");
    };
    assert!(!sam.is_admin);
    // A fresh start picks up the stored login.
    assert_eq!(seller.session.start().unwrap(), Screen::Home { user: sam.clone() });

    let products = ProductListView::new(seller.api.clone());
    products.load().await;
    assert_eq!(products.snapshot().items, vec![lamp.clone()]);

    let cart = SaleCart::new(seller.api.clone());
    cart.add(lamp.id, 1);
    cart.add(lamp.id, 1);
    let sale = cart.submit().await.expect("sale registered");
    assert_eq!(sale.total, Money::from_minor(2_500));
    assert_eq!(sale.commission, Money::from_minor(750));

    let after = seller.api.get_product(lamp.id).await.unwrap();
    assert_eq!(after.quantity, 3);

    let summary = SalesSummaryView::new(seller.api.clone());
    summary.load(Some(sam.id)).await;
    let state = summary.snapshot();
    assert_eq!(state.error, None);
    assert_eq!(state.summary.sale_count, 1);
    assert_eq!(state.summary.commission, Money::from_minor(750));

    let report = admin.api.sales_summary(None).await.unwrap();
    assert_eq!(report.commission_rate_bps, 3_000);
    assert_eq!(report.summary.for_user(sam.id).map(|r| r.total), Some(Money::from_minor(2_500)));

    // Removing the account invalidates the seller's stored token.
    admin.api.delete_user(sam.id).await.unwrap();
    let err = seller.api.me().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert!(seller.store.load().unwrap().is_none());
    assert_eq!(seller.session.start().unwrap(), Screen::Login);

    assert_eq!(admin.session.logout().unwrap(), Screen::Login);
    assert_eq!(admin.session.start().unwrap(), Screen::Login);
}

#[tokio::test]
async fn admin_maintains_images_lists_and_profile() {
    let base_url = spawn_server().await;
    let admin = client(&base_url);
    admin.api.health().await.unwrap();
    admin.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let me = admin.api.rename_me("Root Admin").await.unwrap();
    assert_eq!(me.name, "Root Admin");

    let mut form = ProductForm::new();
    form.name = "Mug".to_string();
    form.description = "Stoneware".to_string();
    form.price = "8".to_string();
    form.quantity = "10".to_string();
    form.category = "home".to_string();
    let mug = form.submit(admin.api.as_ref()).await.unwrap();
    assert_eq!(mug.image, None);

    let mut edit = ProductEditForm::new(mug.clone());
    edit.name = "Tea mug".to_string();
    edit.price = "9.25".to_string();
    let mug = edit.submit(admin.api.as_ref()).await.unwrap();
    assert_eq!(mug.name, "Tea mug");
    assert_eq!(mug.price, Money::from_minor(925));
    assert_eq!(mug.quantity, 10);

    let png = ImageUpload {
        file_name: "mug.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    };
    let updated = admin.api.set_product_image(mug.id, png).await.unwrap();
    assert!(updated.image.is_some());
    let image = admin.api.product_image(mug.id).await.unwrap();
    assert_eq!(image.content_type, "image/png");
    assert_eq!(image.bytes, vec![0x89, b'P', b'N', b'G']);

    let list = admin
        .api
        .create_custom_list(NewList {
            name: "Kitchen".to_string(),
            description: "Cups and such".to_string(),
            product_ids: vec![mug.id],
            ..NewList::default()
        })
        .await
        .unwrap();
    let update = ListUpdate { is_public: Some(true), ..ListUpdate::default() };
    let list = admin.api.update_custom_list(list.list.id, update).await.unwrap();
    assert!(list.list.is_public);
    assert_eq!(list.list.name, "Kitchen");
    assert_eq!(list.products, vec![updated]);
}

#[tokio::test]
async fn rejected_login_surfaces_server_message() {
    let base_url = spawn_server().await;
    let c = client(&base_url);

    let err = c.session.login(ADMIN_EMAIL, "wrong-password").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(c.session.start().unwrap(), Screen::Login);

    let err = c.session.register("Dup", ADMIN_EMAIL, "secret1").await.unwrap_err();
    assert_eq!(err.status(), Some(409));
}
