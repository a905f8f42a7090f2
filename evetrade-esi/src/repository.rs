//! Typed facade over the ESI endpoints consumed by domain services.
use crate::client::EsiClient;
use crate::error::EsiError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Domain-facing contract. One production adapter talks to ESI; tests use
/// the in-memory stub from `test_utils`.
#[async_trait]
pub trait EsiRepository: Send + Sync {
    async fn get_regions_list(&self) -> Result<Value, EsiError>;
    async fn get_region_details(&self, region_id: i64)
        -> Result<Value, EsiError>;
    async fn get_constellation_details(
        &self,
        constellation_id: i64,
    ) -> Result<Value, EsiError>;
    async fn get_system_details(&self, system_id: i64)
        -> Result<Value, EsiError>;
    async fn get_item_type(&self, type_id: i64) -> Result<Value, EsiError>;
    async fn get_stargate_details(
        &self,
        stargate_id: i64,
    ) -> Result<Value, EsiError>;
    async fn get_station_details(
        &self,
        station_id: i64,
    ) -> Result<Value, EsiError>;
    async fn get_market_groups_list(&self) -> Result<Value, EsiError>;
    async fn get_market_group_details(
        &self,
        group_id: i64,
    ) -> Result<Value, EsiError>;
    async fn get_market_orders(
        &self,
        region_id: i64,
        type_id: Option<i64>,
    ) -> Result<Value, EsiError>;
    async fn get_route(
        &self,
        origin: i64,
        destination: i64,
    ) -> Result<Value, EsiError>;
    async fn get_route_with_details(
        &self,
        origin: i64,
        destination: i64,
    ) -> Result<Value, EsiError>;
}

/// Production adapter: translates each operation into a cached client GET.
pub struct EsiApiRepository {
    client: Arc<EsiClient>,
}

impl EsiApiRepository {
    pub fn new(client: Arc<EsiClient>) -> Self {
        Self { client }
    }

    async fn fetch_cached(
        &self,
        operation: &'static str,
        args: Vec<String>,
        path: String,
        params: Vec<(&'static str, String)>,
        ttl_hours: f64,
    ) -> Result<Value, EsiError> {
        let client = &self.client;
        client
            .cached(operation, &args, ttl_hours, || async move {
                client.get(&path, &params).await
            })
            .await
    }
}

#[async_trait]
impl EsiRepository for EsiApiRepository {
    async fn get_regions_list(&self) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_regions_list",
            vec![],
            "/universe/regions/".to_string(),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_region_details(
        &self,
        region_id: i64,
    ) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_region_details",
            vec![region_id.to_string()],
            format!("/universe/regions/{}/", region_id),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_constellation_details(
        &self,
        constellation_id: i64,
    ) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_constellation_details",
            vec![constellation_id.to_string()],
            format!("/universe/constellations/{}/", constellation_id),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_system_details(
        &self,
        system_id: i64,
    ) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_system_details",
            vec![system_id.to_string()],
            format!("/universe/systems/{}/", system_id),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_item_type(&self, type_id: i64) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_item_type",
            vec![type_id.to_string()],
            format!("/universe/types/{}/", type_id),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_stargate_details(
        &self,
        stargate_id: i64,
    ) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_stargate_details",
            vec![stargate_id.to_string()],
            format!("/universe/stargates/{}/", stargate_id),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_station_details(
        &self,
        station_id: i64,
    ) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_station_details",
            vec![station_id.to_string()],
            format!("/universe/stations/{}/", station_id),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_market_groups_list(&self) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_market_groups_list",
            vec![],
            "/markets/groups/".to_string(),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_market_group_details(
        &self,
        group_id: i64,
    ) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_market_group_details",
            vec![group_id.to_string()],
            format!("/markets/groups/{}/", group_id),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_market_orders(
        &self,
        region_id: i64,
        type_id: Option<i64>,
    ) -> Result<Value, EsiError> {
        let mut args = vec![region_id.to_string()];
        let mut params = vec![];
        if let Some(type_id) = type_id {
            args.push(type_id.to_string());
            params.push(("type_id", type_id.to_string()));
        }
        // Market data moves fast, so orders use the short TTL.
        self.fetch_cached(
            "get_market_orders",
            args,
            format!("/markets/{}/orders/", region_id),
            params,
            self.client.market_ttl_hours,
        )
        .await
    }

    async fn get_route(
        &self,
        origin: i64,
        destination: i64,
    ) -> Result<Value, EsiError> {
        self.fetch_cached(
            "get_route",
            vec![origin.to_string(), destination.to_string()],
            format!("/route/{}/{}/", origin, destination),
            vec![],
            self.client.default_ttl_hours,
        )
        .await
    }

    async fn get_route_with_details(
        &self,
        origin: i64,
        destination: i64,
    ) -> Result<Value, EsiError> {
        let route = self.get_route(origin, destination).await?;
        let system_ids: Vec<i64> = route
            .as_array()
            .map(|ids| ids.iter().filter_map(|id| id.as_i64()).collect())
            .unwrap_or_default();

        // Per-system fetches run concurrently; each one is cached on its own.
        let fetches = system_ids
            .iter()
            .map(|system_id| self.get_system_details(*system_id));
        let details: Vec<Value> = futures::future::join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;
        Ok(Value::Array(details))
    }
}
