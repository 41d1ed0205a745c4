///  To run :
///  cargo r --example client_example
use reqwest::StatusCode;
use storefront_client::{CheckoutRequest, StorefrontClient};
use storefront_hex::inbound::http::{HttpServer, HttpServerConfig};
use storefront_repo::build_repo;
use storefront_repo::seed::demo_catalog;
use storefront_types::domain::cart::format_price;
use storefront_types::domain::status::{OrderStatus, StatusFilter, TransitionPolicy};
use tempfile::tempdir;

const ADMIN_TOKEN: &str = "example-admin-token";

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("storefront.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = build_repo(Some(&db_url)).await?;
    repo.seed_if_empty(demo_catalog()).await?;
    let server = HttpServer::new(
        repo,
        HttpServerConfig {
            port: port.to_string(),
            admin_token: Some(ADMIN_TOKEN.into()),
            status_policy: TransitionPolicy::Strict,
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let shopper = StorefrontClient::new(&addr)?;
    let foods = shopper.list_foods().await?;
    println!("Menu has {} dishes", foods.len());

    let pasta = shopper.get_food("italian-pasta-salad").await?;
    shopper.add_to_cart(pasta.to_cart_item()).await?;
    shopper.add_to_cart(pasta.to_cart_item()).await?;
    let cart = shopper.get_cart().await?;
    println!(
        "Cart {} holds {} items worth {}",
        shopper.session_id(),
        cart.item_count,
        format_price(cart.total)
    );

    let created = shopper
        .checkout(
            "example-customer",
            CheckoutRequest {
                customer_name: "Example".into(),
                customer_phone: "0812345678".into(),
            },
        )
        .await?;
    println!("Placed order id={} total={}", created.id, created.total_price);
    assert_eq!(created.status, OrderStatus::Processing);
    assert!(shopper.get_cart().await?.lines.is_empty());

    let ranked = shopper.recommendations("example-customer").await?;
    for entry in &ranked {
        println!("  {} (score {})", entry.food.name, entry.score);
    }

    let admin = StorefrontClient::builder(&addr)?
        .with_admin_token(ADMIN_TOKEN)
        .build()?;
    let processing = admin
        .admin_orders("", StatusFilter::Only(OrderStatus::Processing))
        .await?;
    println!("{} order(s) waiting", processing.len());

    let done = admin.update_status(&created.id, OrderStatus::Completed).await?;
    println!("Order {} is now {}", done.id, done.status);

    // Strict policy: completed orders stay completed.
    match admin.update_status(&created.id, OrderStatus::Processing).await {
        Ok(_) => anyhow::bail!("strict policy let a completed order reopen"),
        Err(err) => {
            let status = err.downcast_ref::<reqwest::Error>().and_then(|e| e.status());
            println!("Reopen refused with {:?}", status);
            assert_eq!(status, Some(StatusCode::CONFLICT));
        }
    }

    handle.abort();
    Ok(())
}
