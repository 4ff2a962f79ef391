mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use shop_admin::analytics::{week_start, Analytics, StateCount, MAX_SERIES_LENGTH};
use shop_admin::lifecycle;
use shop_admin::repository::SeaOrmRepository;

use common::{category, customer, placed_order, product, set_user_created_at, setup_db};

#[tokio::test]
async fn empty_shop_reports_zeros() {
    let db = setup_db().await;
    let analytics = Analytics::new(SeaOrmRepository::new(db.clone()));

    let totals = analytics.totals(None).await.expect("Failed to load totals");
    assert_eq!(totals.users, 0);
    assert_eq!(totals.orders, 0);
    assert_eq!(totals.revenue, Decimal::ZERO);
    assert_eq!(totals.average_order_value, Decimal::ZERO);
    assert_eq!(totals.largest_order_value, Decimal::ZERO);

    let superlatives = analytics
        .superlatives(None)
        .await
        .expect("Failed to load superlatives");
    assert!(superlatives.highest_single_order_value.is_none());
    assert!(superlatives.most_orders_placed.is_none());
}

#[tokio::test]
async fn superlatives_pick_the_best_customer() {
    let db = setup_db().await;
    let ada = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bob = customer(&db, "Bob", "Babbage", "Ohio").await;
    let bakery = category(&db).await;
    let small = product(&db, bakery.id, "Bagel", 50).await;
    let large = product(&db, bakery.id, "Cake", 150).await;
    let roll = product(&db, bakery.id, "Roll", 65).await;

    let now = Utc::now();
    placed_order(&db, ada.user.id, &[(small.id, 1)], now - Duration::days(2)).await;
    placed_order(&db, ada.user.id, &[(large.id, 1)], now - Duration::days(1)).await;
    placed_order(&db, bob.user.id, &[(roll.id, 2)], now - Duration::days(1)).await;

    let analytics = Analytics::at(SeaOrmRepository::new(db.clone()), now);

    let single = analytics
        .highest_single_order_value(None)
        .await
        .expect("Failed to compute superlative")
        .expect("Someone placed an order");
    assert_eq!(single.user_id, ada.user.id);
    assert_eq!(single.name, "Ada Lovelace");
    assert_eq!(single.value, Decimal::from(150));

    let lifetime = analytics
        .highest_lifetime_value(None)
        .await
        .expect("Failed to compute superlative")
        .expect("Someone placed an order");
    assert_eq!(lifetime.user_id, ada.user.id);
    assert_eq!(lifetime.value, Decimal::from(200));

    let average = analytics
        .highest_average_order_value(None)
        .await
        .expect("Failed to compute superlative")
        .expect("Someone placed an order");
    assert_eq!(average.user_id, bob.user.id);
    assert_eq!(average.value, Decimal::from(130));

    let most = analytics
        .most_orders_placed(None)
        .await
        .expect("Failed to compute superlative")
        .expect("Someone placed an order");
    assert_eq!(most.user_id, ada.user.id);
    assert_eq!(most.value, 2);

    let all = analytics
        .superlatives(None)
        .await
        .expect("Failed to compute superlatives");
    assert_eq!(all.highest_single_order_value, Some(single));
    assert_eq!(all.highest_average_order_value, Some(average));

    assert_eq!(
        analytics
            .average_order_value(None)
            .await
            .expect("Failed to compute average"),
        Decimal::from(110)
    );
    assert_eq!(
        analytics
            .largest_order_value(None)
            .await
            .expect("Failed to compute largest"),
        Decimal::from(150)
    );
}

#[tokio::test]
async fn ties_go_to_the_earliest_user() {
    let db = setup_db().await;
    let ada = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bob = customer(&db, "Bob", "Babbage", "Ohio").await;
    let bakery = category(&db).await;
    let bagel = product(&db, bakery.id, "Bagel", 20).await;

    let now = Utc::now();
    placed_order(&db, bob.user.id, &[(bagel.id, 1)], now).await;
    placed_order(&db, ada.user.id, &[(bagel.id, 1)], now).await;

    let analytics = Analytics::at(SeaOrmRepository::new(db.clone()), now);
    let winner = analytics
        .highest_lifetime_value(None)
        .await
        .expect("Failed to compute superlative")
        .expect("Someone placed an order");
    assert_eq!(winner.user_id, ada.user.id);
}

#[tokio::test]
async fn windows_use_checkout_and_creation_dates() {
    let db = setup_db().await;
    let ada = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bob = customer(&db, "Bob", "Babbage", "Ohio").await;
    let bakery = category(&db).await;
    let bagel = product(&db, bakery.id, "Bagel", 10).await;

    let now = Utc::now();
    set_user_created_at(&db, bob.user.id, now - Duration::days(40)).await;
    placed_order(&db, ada.user.id, &[(bagel.id, 1)], now - Duration::days(2)).await;
    placed_order(&db, bob.user.id, &[(bagel.id, 3)], now - Duration::days(10)).await;
    lifecycle::add_to_cart(&db, ada.user.id, bagel.id, 5)
        .await
        .expect("Failed to add to cart");

    let analytics = Analytics::at(SeaOrmRepository::new(db.clone()), now);

    let week = analytics.totals(Some(7)).await.expect("Failed to load totals");
    assert_eq!(week.orders, 1);
    assert_eq!(week.revenue, Decimal::from(10));
    assert_eq!(week.users, 1);

    let month = analytics.totals(Some(30)).await.expect("Failed to load totals");
    assert_eq!(month.orders, 2);
    assert_eq!(month.revenue, Decimal::from(40));
    assert_eq!(month.users, 1);

    let ever = analytics.totals(None).await.expect("Failed to load totals");
    assert_eq!(ever.users, 2);
    assert_eq!(ever.products, 1);
    assert_eq!(ever.revenue, Decimal::from(40));
    assert_eq!(ever.average_order_value, Decimal::from(20));
    assert_eq!(
        analytics
            .total_revenue(None)
            .await
            .expect("Failed to load revenue"),
        Decimal::from(40)
    );
    assert_eq!(
        analytics
            .total_orders(Some(7))
            .await
            .expect("Failed to count orders"),
        1
    );
}

#[tokio::test]
async fn orders_by_day_fills_empty_days() {
    let db = setup_db().await;
    let ada = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bakery = category(&db).await;
    let bagel = product(&db, bakery.id, "Bagel", 20).await;

    let now = Utc::now();
    placed_order(&db, ada.user.id, &[(bagel.id, 1)], now - Duration::days(1)).await;

    let analytics = Analytics::at(SeaOrmRepository::new(db.clone()), now);
    let days = analytics
        .orders_by_day(3)
        .await
        .expect("Failed to bucket orders");

    let today = now.date_naive();
    let starts: Vec<_> = days.iter().map(|bucket| bucket.start).collect();
    assert_eq!(
        starts,
        vec![today, today - Duration::days(1), today - Duration::days(2)]
    );
    let counts: Vec<u64> = days.iter().map(|bucket| bucket.order_count).collect();
    assert_eq!(counts, vec![0, 1, 0]);
    assert_eq!(days[1].revenue, Decimal::from(20));
    assert_eq!(days[0].revenue, Decimal::ZERO);
}

#[tokio::test]
async fn orders_by_week_starts_on_monday() {
    let db = setup_db().await;
    let ada = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bakery = category(&db).await;
    let bagel = product(&db, bakery.id, "Bagel", 5).await;

    let now = Utc::now();
    placed_order(&db, ada.user.id, &[(bagel.id, 1)], now).await;
    placed_order(&db, ada.user.id, &[(bagel.id, 2)], now - Duration::days(7)).await;
    placed_order(&db, ada.user.id, &[(bagel.id, 4)], now - Duration::days(30)).await;

    let analytics = Analytics::at(SeaOrmRepository::new(db.clone()), now);
    let weeks = analytics
        .orders_by_week(2)
        .await
        .expect("Failed to bucket orders");

    let this_week = week_start(now.date_naive());
    assert_eq!(weeks.len(), 2);
    assert_eq!(weeks[0].start, this_week);
    assert_eq!(weeks[1].start, this_week - Duration::weeks(1));
    assert_eq!(weeks[0].revenue, Decimal::from(5));
    assert_eq!(weeks[1].revenue, Decimal::from(10));
    assert!(weeks.iter().all(|bucket| bucket.order_count == 1));
}

#[tokio::test]
async fn top_states_count_billing_addresses() {
    let db = setup_db().await;
    customer(&db, "Ada", "Lovelace", "Texas").await;
    customer(&db, "Bob", "Babbage", "Ohio").await;
    customer(&db, "Cy", "Young", "Texas").await;

    let analytics = Analytics::new(SeaOrmRepository::new(db.clone()));
    let states = analytics
        .top_states_by_users(3)
        .await
        .expect("Failed to rank states");
    assert_eq!(
        states,
        vec![
            StateCount {
                state: "Texas".to_string(),
                users: 2
            },
            StateCount {
                state: "Ohio".to_string(),
                users: 1
            },
        ]
    );

    let top = analytics
        .top_states_by_users(1)
        .await
        .expect("Failed to rank states");
    assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn dashboard_collects_every_window() {
    let db = setup_db().await;
    let ada = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bakery = category(&db).await;
    let bagel = product(&db, bakery.id, "Bagel", 10).await;

    let now = Utc::now();
    placed_order(&db, ada.user.id, &[(bagel.id, 1)], now - Duration::days(3)).await;
    placed_order(&db, ada.user.id, &[(bagel.id, 2)], now - Duration::days(20)).await;
    placed_order(&db, ada.user.id, &[(bagel.id, 4)], now - Duration::days(90)).await;

    let dashboard = Analytics::at(SeaOrmRepository::new(db.clone()), now)
        .dashboard()
        .await
        .expect("Failed to build dashboard");

    assert_eq!(dashboard.last_7_days.orders, 1);
    assert_eq!(dashboard.last_30_days.orders, 2);
    assert_eq!(dashboard.totals.orders, 3);
    assert_eq!(dashboard.totals.revenue, Decimal::from(70));
    assert_eq!(dashboard.top_states.len(), 1);
    assert_eq!(
        dashboard
            .superlatives
            .most_orders_placed
            .map(|winner| winner.value),
        Some(3)
    );
}

#[tokio::test]
async fn oversized_windows_cover_all_time() {
    let db = setup_db().await;
    let ada = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bakery = category(&db).await;
    let bagel = product(&db, bakery.id, "Bagel", 10).await;

    let now = Utc::now();
    placed_order(&db, ada.user.id, &[(bagel.id, 2)], now - Duration::days(400)).await;

    let analytics = Analytics::at(SeaOrmRepository::new(db.clone()), now);
    assert_eq!(
        analytics
            .total_revenue(Some(u32::MAX))
            .await
            .expect("Failed to load revenue"),
        Decimal::from(20)
    );

    let totals = analytics
        .totals(Some(u32::MAX))
        .await
        .expect("Failed to load totals");
    assert_eq!(totals.orders, 1);
    assert_eq!(totals.users, 1);

    let superlatives = analytics
        .superlatives(Some(u32::MAX))
        .await
        .expect("Failed to load superlatives");
    assert!(superlatives.most_orders_placed.is_some());
}

#[tokio::test]
async fn oversized_series_are_capped() {
    let db = setup_db().await;
    let now = Utc::now();
    let analytics = Analytics::at(SeaOrmRepository::new(db.clone()), now);

    let weeks = analytics
        .orders_by_week(20_000_000)
        .await
        .expect("Failed to bucket orders");
    assert_eq!(weeks.len(), MAX_SERIES_LENGTH as usize);
    assert_eq!(weeks[0].start, week_start(now.date_naive()));

    let days = analytics
        .orders_by_day(u32::MAX)
        .await
        .expect("Failed to bucket orders");
    assert_eq!(days.len(), MAX_SERIES_LENGTH as usize);
    assert!(days.iter().all(|bucket| bucket.order_count == 0));
}
