//! Deal scanning: the derived view pairing the best buy and sell order for
//! each item type where the spread clears a caller-supplied threshold.
use crate::error::EsiError;
use crate::repository::EsiRepository;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub type_id: i64,
    /// Price of the best (highest) buy order.
    pub buy_price: f64,
    /// Price of the best (lowest) sell order.
    pub sell_price: f64,
    pub profit: f64,
}

pub struct DealFinder {
    repository: Arc<dyn EsiRepository>,
    concurrency: usize,
}

impl DealFinder {
    pub fn new(repository: Arc<dyn EsiRepository>, concurrency: usize) -> Self {
        Self {
            repository,
            concurrency: concurrency.max(1),
        }
    }

    /// Scan every item type in the region's market groups for spreads above
    /// `min_profit`, sorted by descending profit.
    ///
    /// Group details and per-type order books are fetched concurrently; the
    /// per-type fan-out is the heaviest one, so it runs under a counting
    /// semaphore. A failed sub-fetch is skipped, a failed group list
    /// propagates.
    pub async fn find_deals(
        &self,
        region_id: i64,
        min_profit: f64,
    ) -> Result<Vec<Deal>, EsiError> {
        let groups = self.repository.get_market_groups_list().await?;
        let group_ids: Vec<i64> = groups
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();

        let details = join_all(
            group_ids
                .iter()
                .map(|id| self.repository.get_market_group_details(*id)),
        )
        .await;

        let mut type_ids: Vec<i64> = Vec::new();
        for detail in details {
            match detail {
                Ok(detail) => {
                    if let Some(types) =
                        detail.get("types").and_then(Value::as_array)
                    {
                        type_ids.extend(types.iter().filter_map(Value::as_i64));
                    }
                }
                Err(err) => {
                    tracing::warn!("skipping market group: {}", err);
                }
            }
        }
        type_ids.sort_unstable();
        type_ids.dedup();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let scans = type_ids.iter().map(|type_id| {
            let semaphore = semaphore.clone();
            async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire().await.ok();
                (
                    *type_id,
                    self.repository
                        .get_market_orders(region_id, Some(*type_id))
                        .await,
                )
            }
        });

        let mut deals = Vec::new();
        for (type_id, orders) in join_all(scans).await {
            match orders {
                Ok(orders) => {
                    if let Some(deal) = best_spread(type_id, &orders, min_profit)
                    {
                        deals.push(deal);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        type_id,
                        "skipping type after failed order fetch: {}",
                        err
                    );
                }
            }
        }
        deals.sort_by(|a, b| {
            b.profit.partial_cmp(&a.profit).unwrap_or(Ordering::Equal)
        });
        Ok(deals)
    }
}

/// Pair the highest buy order with the lowest sell order; a deal exists when
/// the spread strictly exceeds the threshold.
fn best_spread(type_id: i64, orders: &Value, min_profit: f64) -> Option<Deal> {
    let orders = orders.as_array()?;
    let mut best_bid: Option<f64> = None;
    let mut best_ask: Option<f64> = None;
    for order in orders {
        let Some(price) = order.get("price").and_then(Value::as_f64) else {
            continue;
        };
        let is_buy = order
            .get("is_buy_order")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if is_buy {
            best_bid = Some(best_bid.map_or(price, |bid: f64| bid.max(price)));
        } else {
            best_ask = Some(best_ask.map_or(price, |ask: f64| ask.min(price)));
        }
    }
    let (bid, ask) = (best_bid?, best_ask?);
    let profit = bid - ask;
    (profit > min_profit).then(|| Deal {
        type_id,
        buy_price: bid,
        sell_price: ask,
        profit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_best_spread_picks_extremes() {
        let orders = json!([
            {"is_buy_order": true, "price": 90.0},
            {"is_buy_order": true, "price": 110.0},
            {"is_buy_order": false, "price": 60.0},
            {"is_buy_order": false, "price": 80.0},
        ]);
        let deal = best_spread(34, &orders, 10.0).unwrap();
        assert_eq!(deal.buy_price, 110.0);
        assert_eq!(deal.sell_price, 60.0);
        assert_eq!(deal.profit, 50.0);
    }

    #[test]
    fn test_spread_below_threshold_is_no_deal() {
        let orders = json!([
            {"is_buy_order": true, "price": 100.0},
            {"is_buy_order": false, "price": 95.0},
        ]);
        assert!(best_spread(34, &orders, 10.0).is_none());
    }

    #[test]
    fn test_one_sided_book_is_no_deal() {
        let only_sells = json!([{"is_buy_order": false, "price": 95.0}]);
        assert!(best_spread(34, &only_sells, 0.0).is_none());
        let only_buys = json!([{"is_buy_order": true, "price": 95.0}]);
        assert!(best_spread(34, &only_buys, 0.0).is_none());
    }
}
