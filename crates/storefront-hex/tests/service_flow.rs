use storefront_hex::application::auth::AdminAuthorizer;
use storefront_hex::application::cart_store::CartStore;
use storefront_hex::application::order_service::OrderService;
use storefront_hex::application::recommendation_service::RecommendationService;
use storefront_repo::memory::InMemoryRepo;
use storefront_repo::seed::demo_catalog;
use storefront_types::domain::order::filter_orders;
use storefront_types::domain::status::{OrderStatus, StatusFilter};
use storefront_types::ports::food_catalog::FoodCatalog;

// Browse, fill a cart, check out twice, then let an admin close one order.
#[tokio::test]
async fn cart_checkout_recommend_and_admin_flow() {
    let repo = InMemoryRepo::with_foods(demo_catalog());
    let orders = OrderService::new(repo.clone());
    let recs = RecommendationService::new(repo.clone());
    let grant = AdminAuthorizer::new(Some("admin".into()))
        .authorize(Some("Bearer admin"))
        .unwrap();

    let pasta = repo.get_food("italian-pasta-salad").await.unwrap().unwrap();
    let greek = repo.get_food("greek-salad").await.unwrap().unwrap();

    let mut cart = CartStore::open(repo.clone(), "session-eve").await.unwrap();
    let mut badge = cart.subscribe();
    cart.add_item(pasta.to_cart_item()).await.unwrap();
    cart.add_item(pasta.to_cart_item()).await.unwrap();
    cart.add_item(greek.to_cart_item()).await.unwrap();
    assert_eq!(badge.recv().await.unwrap().item_count, 1);
    assert_eq!(cart.item_count(), 3);
    assert_eq!(cart.total(), 2 * 90000 + 85000);

    let first = orders
        .checkout(&mut cart, "eve".into(), "Eve".into(), "0811".into())
        .await
        .unwrap();
    assert_eq!(first.total_price, 265000);
    assert!(cart.cart().is_empty());

    cart.add_item(pasta.to_cart_item()).await.unwrap();
    let second = orders
        .checkout(&mut cart, "eve".into(), "Eve".into(), "0811".into())
        .await
        .unwrap();

    let mine = orders.list_for_customer("eve").await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, second.id);

    let ranked = recs.recommend("eve").await.unwrap();
    assert_eq!(ranked[0].id, "italian-pasta-salad");

    orders
        .set_status(&grant, first.id, OrderStatus::Completed)
        .await
        .unwrap();
    let all = orders.list_all(&grant).await.unwrap();
    let done = filter_orders(&all, "greek", StatusFilter::Only(OrderStatus::Completed));
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, first.id);
    assert_eq!(filter_orders(&all, "", StatusFilter::All), all);
}
