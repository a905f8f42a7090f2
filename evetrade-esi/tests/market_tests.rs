#[cfg(test)]
mod tests {
    use evetrade_esi::test_utils::{StubRepository, StubResponse};
    use evetrade_esi::DealFinder;
    use serde_json::json;
    use std::sync::Arc;

    const THE_FORGE: i64 = 10000002;

    fn orders(bid: f64, ask: f64) -> StubResponse {
        StubResponse::Ok(json!([
            {"is_buy_order": true, "price": bid, "volume_remain": 100},
            {"is_buy_order": true, "price": bid - 5.0, "volume_remain": 40},
            {"is_buy_order": false, "price": ask, "volume_remain": 20},
            {"is_buy_order": false, "price": ask + 3.0, "volume_remain": 10},
        ]))
    }

    fn make_repo() -> Arc<StubRepository> {
        let repo = Arc::new(StubRepository::new());
        repo.insert(
            "get_market_groups_list",
            StubResponse::Ok(json!([1, 2, 3])),
        );
        repo.insert(
            "get_market_group_details:1",
            StubResponse::Ok(json!({"market_group_id": 1, "types": [34]})),
        );
        repo.insert(
            "get_market_group_details:2",
            StubResponse::Ok(json!({"market_group_id": 2, "types": [35]})),
        );
        repo.insert(
            "get_market_group_details:3",
            StubResponse::Ok(json!({"market_group_id": 3, "types": [36]})),
        );
        repo
    }

    #[tokio::test]
    async fn test_forge_scan_yields_deals_above_threshold_sorted() {
        let repo = make_repo();
        // Tritanium: profit 50, Pyerite: profit 5, Mexallon: profit 100.
        repo.insert("get_market_orders:10000002:34", orders(110.0, 60.0));
        repo.insert("get_market_orders:10000002:35", orders(20.0, 15.0));
        repo.insert("get_market_orders:10000002:36", orders(300.0, 200.0));

        let finder = DealFinder::new(repo.clone(), 10);
        let deals = finder.find_deals(THE_FORGE, 10.0).await.unwrap();

        // Exactly the two types whose spread clears the threshold, by
        // descending absolute profit.
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].type_id, 36);
        assert_eq!(deals[0].profit, 100.0);
        assert_eq!(deals[1].type_id, 34);
        assert_eq!(deals[1].profit, 50.0);
    }

    #[tokio::test]
    async fn test_failed_group_detail_is_skipped() {
        let repo = make_repo();
        repo.insert("get_market_group_details:2", StubResponse::ServerError);
        repo.insert("get_market_orders:10000002:34", orders(110.0, 60.0));
        repo.insert("get_market_orders:10000002:36", orders(300.0, 200.0));

        let finder = DealFinder::new(repo.clone(), 10);
        let deals = finder.find_deals(THE_FORGE, 10.0).await.unwrap();
        assert_eq!(deals.len(), 2);
        // The failed group's type was never scanned.
        assert_eq!(repo.calls("get_market_orders:10000002:35"), 0);
    }

    #[tokio::test]
    async fn test_failed_order_fetch_is_skipped() {
        let repo = make_repo();
        repo.insert("get_market_orders:10000002:34", orders(110.0, 60.0));
        repo.insert("get_market_orders:10000002:35", StubResponse::ServerError);
        repo.insert("get_market_orders:10000002:36", orders(300.0, 200.0));

        let finder = DealFinder::new(repo.clone(), 2);
        let deals = finder.find_deals(THE_FORGE, 10.0).await.unwrap();
        assert_eq!(deals.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_group_list_propagates() {
        let repo = Arc::new(StubRepository::new());
        repo.insert("get_market_groups_list", StubResponse::ServerError);

        let finder = DealFinder::new(repo, 10);
        assert!(finder.find_deals(THE_FORGE, 10.0).await.is_err());
    }
}
