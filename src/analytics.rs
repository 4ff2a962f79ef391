//! Dashboard statistics over users, products and placed orders.
//!
//! Every operation takes an optional trailing window in days. Orders are
//! windowed on their checkout date, users and products on their creation date.
//! Empty windows produce zeros, never errors.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::entities::user;
use crate::error::ShopError;
use crate::repository::ShopRepository;
use crate::valuation::{money, values_by_order};

pub const SHORT_WINDOW_DAYS: u32 = 7;
pub const LONG_WINDOW_DAYS: u32 = 30;
pub const TOP_STATES: usize = 3;
/// Upper bound on the buckets one series call builds.
pub const MAX_SERIES_LENGTH: u32 = 3660;

/// A placed order with its computed value.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedOrder {
    pub id: i32,
    pub user_id: i32,
    pub checkout_date: DateTime<Utc>,
    pub value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Superlative<T> {
    pub user_id: i32,
    pub name: String,
    pub value: T,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Superlatives {
    pub highest_single_order_value: Option<Superlative<Decimal>>,
    pub highest_lifetime_value: Option<Superlative<Decimal>>,
    pub highest_average_order_value: Option<Superlative<Decimal>>,
    pub most_orders_placed: Option<Superlative<u64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Totals {
    pub users: u64,
    pub orders: u64,
    pub products: u64,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub largest_order_value: Decimal,
}

/// One day or week of placed orders.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bucket {
    pub start: NaiveDate,
    pub order_count: u64,
    pub revenue: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StateCount {
    pub state: String,
    pub users: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dashboard {
    pub totals: Totals,
    pub last_7_days: Totals,
    pub last_30_days: Totals,
    pub superlatives: Superlatives,
    pub top_states: Vec<StateCount>,
}

pub struct Analytics<R> {
    repo: R,
    now: Option<DateTime<Utc>>,
}

impl<R: ShopRepository> Analytics<R> {
    pub fn new(repo: R) -> Self {
        Self { repo, now: None }
    }

    /// Evaluates windows and buckets relative to a fixed instant.
    pub fn at(repo: R, now: DateTime<Utc>) -> Self {
        Self {
            repo,
            now: Some(now),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Start of a trailing window. A window reaching past the representable
    /// calendar covers all time.
    fn since(&self, days: Option<u32>) -> Option<DateTime<Utc>> {
        let window = Duration::try_days(i64::from(days?))?;
        self.now().checked_sub_signed(window)
    }

    async fn placed_orders(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PlacedOrder>, ShopError> {
        let orders = self.repo.placed_orders_since(since).await?;
        let values = values_by_order(&self.repo.placed_line_items_since(since).await?);

        Ok(orders
            .into_iter()
            .filter_map(|order| {
                let checkout_date = order.checkout_date?;
                Some(PlacedOrder {
                    id: order.id,
                    user_id: order.user_id,
                    checkout_date,
                    value: values.get(&order.id).copied().unwrap_or_default(),
                })
            })
            .collect())
    }

    pub async fn total_users(&self, days: Option<u32>) -> Result<u64, ShopError> {
        Ok(self.repo.count_users_since(self.since(days)).await?)
    }

    pub async fn total_orders(&self, days: Option<u32>) -> Result<u64, ShopError> {
        Ok(self.repo.count_placed_orders_since(self.since(days)).await?)
    }

    pub async fn total_products(&self, days: Option<u32>) -> Result<u64, ShopError> {
        Ok(self.repo.count_products_since(self.since(days)).await?)
    }

    pub async fn total_revenue(&self, days: Option<u32>) -> Result<Decimal, ShopError> {
        let rows = self.repo.placed_line_items_since(self.since(days)).await?;
        Ok(money(rows.iter().map(|row| row.line_total()).sum()))
    }

    pub async fn largest_order_value(&self, days: Option<u32>) -> Result<Decimal, ShopError> {
        Ok(largest_value(&self.placed_orders(self.since(days)).await?))
    }

    pub async fn average_order_value(&self, days: Option<u32>) -> Result<Decimal, ShopError> {
        let orders = self.placed_orders(self.since(days)).await?;
        Ok(average(revenue(&orders), orders.len() as u64))
    }

    pub async fn totals(&self, days: Option<u32>) -> Result<Totals, ShopError> {
        let since = self.since(days);
        let orders = self.placed_orders(since).await?;
        let revenue = revenue(&orders);

        Ok(Totals {
            users: self.repo.count_users_since(since).await?,
            orders: orders.len() as u64,
            products: self.repo.count_products_since(since).await?,
            revenue,
            average_order_value: average(revenue, orders.len() as u64),
            largest_order_value: largest_value(&orders),
        })
    }

    pub async fn highest_single_order_value(
        &self,
        days: Option<u32>,
    ) -> Result<Option<Superlative<Decimal>>, ShopError> {
        let orders = self.placed_orders(self.since(days)).await?;
        self.named(top_single_order(&orders)).await
    }

    pub async fn highest_lifetime_value(
        &self,
        days: Option<u32>,
    ) -> Result<Option<Superlative<Decimal>>, ShopError> {
        let orders = self.placed_orders(self.since(days)).await?;
        self.named(top_lifetime_value(&orders)).await
    }

    pub async fn highest_average_order_value(
        &self,
        days: Option<u32>,
    ) -> Result<Option<Superlative<Decimal>>, ShopError> {
        let orders = self.placed_orders(self.since(days)).await?;
        self.named(top_average_order_value(&orders)).await
    }

    pub async fn most_orders_placed(
        &self,
        days: Option<u32>,
    ) -> Result<Option<Superlative<u64>>, ShopError> {
        let orders = self.placed_orders(self.since(days)).await?;
        self.named(top_order_count(&orders)).await
    }

    /// All four superlatives from a single read of the window.
    pub async fn superlatives(&self, days: Option<u32>) -> Result<Superlatives, ShopError> {
        let orders = self.placed_orders(self.since(days)).await?;
        let single = top_single_order(&orders);
        let lifetime = top_lifetime_value(&orders);
        let best_average = top_average_order_value(&orders);
        let count = top_order_count(&orders);

        let ids: Vec<i32> = [single, lifetime, best_average]
            .iter()
            .flatten()
            .map(|(user_id, _)| *user_id)
            .chain(count.map(|(user_id, _)| user_id))
            .collect();
        let names = self.names(&ids).await?;

        Ok(Superlatives {
            highest_single_order_value: attach_name(single, &names),
            highest_lifetime_value: attach_name(lifetime, &names),
            highest_average_order_value: attach_name(best_average, &names),
            most_orders_placed: attach_name(count, &names),
        })
    }

    /// The last `n` days, today first. `n` is capped at [`MAX_SERIES_LENGTH`].
    pub async fn orders_by_day(&self, n: u32) -> Result<Vec<Bucket>, ShopError> {
        let starts = series_starts(self.now().date_naive(), 1, n);
        self.bucketed(starts, |date| date).await
    }

    /// The last `n` weeks, this week first. Weeks start on Monday.
    pub async fn orders_by_week(&self, n: u32) -> Result<Vec<Bucket>, ShopError> {
        let starts = series_starts(week_start(self.now().date_naive()), 7, n);
        self.bucketed(starts, week_start).await
    }

    async fn bucketed<F>(
        &self,
        starts: Vec<NaiveDate>,
        bucket_of: F,
    ) -> Result<Vec<Bucket>, ShopError>
    where
        F: Fn(NaiveDate) -> NaiveDate,
    {
        let Some(earliest) = starts.last().copied() else {
            return Ok(vec![]);
        };
        let since = earliest.and_hms_opt(0, 0, 0).map(|start| start.and_utc());
        let orders = self.placed_orders(since).await?;
        Ok(fill_buckets(&starts, &orders, bucket_of))
    }

    /// States with the most users, by the state of each user's billing address.
    pub async fn top_states_by_users(&self, limit: usize) -> Result<Vec<StateCount>, ShopError> {
        let states = self.repo.billing_states().await?;
        Ok(rank_states(states, limit))
    }

    pub async fn dashboard(&self) -> Result<Dashboard, ShopError> {
        Ok(Dashboard {
            totals: self.totals(None).await?,
            last_7_days: self.totals(Some(SHORT_WINDOW_DAYS)).await?,
            last_30_days: self.totals(Some(LONG_WINDOW_DAYS)).await?,
            superlatives: self.superlatives(None).await?,
            top_states: self.top_states_by_users(TOP_STATES).await?,
        })
    }

    async fn names(&self, user_ids: &[i32]) -> Result<HashMap<i32, user::Model>, ShopError> {
        Ok(self
            .repo
            .find_users(user_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect())
    }

    async fn named<T>(
        &self,
        winner: Option<(i32, T)>,
    ) -> Result<Option<Superlative<T>>, ShopError> {
        let Some((user_id, _)) = winner else {
            return Ok(None);
        };
        let names = self.names(&[user_id]).await?;
        Ok(attach_name(winner, &names))
    }
}

fn attach_name<T>(
    winner: Option<(i32, T)>,
    users: &HashMap<i32, user::Model>,
) -> Option<Superlative<T>> {
    let (user_id, value) = winner?;
    let user = users.get(&user_id)?;
    Some(Superlative {
        user_id,
        name: user.full_name(),
        value,
    })
}

pub fn revenue(orders: &[PlacedOrder]) -> Decimal {
    money(orders.iter().map(|order| order.value).sum())
}

pub fn largest_value(orders: &[PlacedOrder]) -> Decimal {
    money(orders.iter().map(|order| order.value).max().unwrap_or_default())
}

/// `revenue / count`, zero when there is nothing to divide by.
pub fn average(revenue: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    money(revenue / Decimal::from(count))
}

/// Strictly greater wins, so on ties the first candidate in iteration order is kept.
fn pick_max<T: PartialOrd + Copy>(
    candidates: impl IntoIterator<Item = (i32, T)>,
) -> Option<(i32, T)> {
    let mut best: Option<(i32, T)> = None;
    for (user_id, value) in candidates {
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((user_id, value)),
        }
    }
    best
}

fn per_user(orders: &[PlacedOrder]) -> BTreeMap<i32, (Decimal, u64)> {
    let mut users: BTreeMap<i32, (Decimal, u64)> = BTreeMap::new();
    for order in orders {
        let entry = users.entry(order.user_id).or_default();
        entry.0 += order.value;
        entry.1 += 1;
    }
    users
}

/// Owner of the most valuable order; ties go to the lowest user id, then order id.
pub fn top_single_order(orders: &[PlacedOrder]) -> Option<(i32, Decimal)> {
    let mut sorted: Vec<&PlacedOrder> = orders.iter().collect();
    sorted.sort_by_key(|order| (order.user_id, order.id));
    pick_max(sorted.into_iter().map(|order| (order.user_id, money(order.value))))
}

pub fn top_lifetime_value(orders: &[PlacedOrder]) -> Option<(i32, Decimal)> {
    pick_max(
        per_user(orders)
            .into_iter()
            .map(|(user_id, (total, _))| (user_id, money(total))),
    )
}

pub fn top_average_order_value(orders: &[PlacedOrder]) -> Option<(i32, Decimal)> {
    pick_max(
        per_user(orders)
            .into_iter()
            .map(|(user_id, (total, count))| (user_id, average(total, count))),
    )
}

pub fn top_order_count(orders: &[PlacedOrder]) -> Option<(i32, u64)> {
    pick_max(
        per_user(orders)
            .into_iter()
            .map(|(user_id, (_, count))| (user_id, count)),
    )
}

/// `n` dates stepping back `step_days` at a time from `latest`, stopping early
/// at the start of the calendar.
fn series_starts(latest: NaiveDate, step_days: u64, n: u32) -> Vec<NaiveDate> {
    (0..u64::from(n.min(MAX_SERIES_LENGTH)))
        .map_while(|i| latest.checked_sub_days(Days::new(i * step_days)))
        .collect()
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// One bucket per start date, in the order given, zero-filled.
pub fn fill_buckets<F>(starts: &[NaiveDate], orders: &[PlacedOrder], bucket_of: F) -> Vec<Bucket>
where
    F: Fn(NaiveDate) -> NaiveDate,
{
    let mut totals: HashMap<NaiveDate, (u64, Decimal)> = HashMap::new();
    for order in orders {
        let entry = totals
            .entry(bucket_of(order.checkout_date.date_naive()))
            .or_default();
        entry.0 += 1;
        entry.1 += order.value;
    }

    starts
        .iter()
        .map(|start| {
            let (order_count, revenue) = totals.get(start).copied().unwrap_or_default();
            Bucket {
                start: *start,
                order_count,
                revenue: money(revenue),
            }
        })
        .collect()
}

pub fn rank_states(states: Vec<String>, limit: usize) -> Vec<StateCount> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for state in states {
        *counts.entry(state).or_default() += 1;
    }

    let mut ranked: Vec<StateCount> = counts
        .into_iter()
        .map(|(state, users)| StateCount { state, users })
        .collect();
    // stable sort keeps the alphabetical order of the map on equal counts
    ranked.sort_by(|a, b| b.users.cmp(&a.users));
    ranked.truncate(limit);
    ranked
}

/// Human label for a bucket date: `Today`, `Yesterday`, otherwise `MM/DD`.
pub fn bucket_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.pred_opt() {
        "Yesterday".to_string()
    } else {
        date.format("%m/%d").to_string()
    }
}
