//! In-memory repository double for tests: canned responses keyed by
//! operation signature, with per-key call counts to assert how often the
//! "network" was actually hit.
use crate::error::EsiError;
use crate::repository::EsiRepository;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum StubResponse {
    Ok(Value),
    BadRequest,
    NotFound,
    ServerError,
}

#[derive(Default)]
pub struct StubRepository {
    responses: Mutex<HashMap<String, StubResponse>>,
    call_counts: Mutex<HashMap<String, usize>>,
}

impl StubRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Can a response for an operation signature, e.g.
    /// `get_station_details:60003760`.
    pub fn insert(&self, key: &str, response: StubResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), response);
    }

    /// How many times an operation signature was invoked.
    pub fn calls(&self, key: &str) -> usize {
        *self.call_counts.lock().unwrap().get(key).unwrap_or(&0)
    }

    /// Total invocations across all operations.
    pub fn total_calls(&self) -> usize {
        self.call_counts.lock().unwrap().values().sum()
    }

    fn respond(&self, key: &str) -> Result<Value, EsiError> {
        *self
            .call_counts
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert(0) += 1;
        let url = format!("stub:{}", key);
        let response = self.responses.lock().unwrap().get(key).cloned();
        match response {
            Some(StubResponse::Ok(value)) => Ok(value),
            Some(StubResponse::BadRequest) => {
                Err(EsiError::BadRequest { url })
            }
            Some(StubResponse::NotFound) | None => {
                Err(EsiError::NotFound { url })
            }
            Some(StubResponse::ServerError) => {
                Err(EsiError::Server { url, status: 500 })
            }
        }
    }
}

#[async_trait]
impl EsiRepository for StubRepository {
    async fn get_regions_list(&self) -> Result<Value, EsiError> {
        self.respond("get_regions_list")
    }

    async fn get_region_details(
        &self,
        region_id: i64,
    ) -> Result<Value, EsiError> {
        self.respond(&format!("get_region_details:{}", region_id))
    }

    async fn get_constellation_details(
        &self,
        constellation_id: i64,
    ) -> Result<Value, EsiError> {
        self.respond(&format!(
            "get_constellation_details:{}",
            constellation_id
        ))
    }

    async fn get_system_details(
        &self,
        system_id: i64,
    ) -> Result<Value, EsiError> {
        self.respond(&format!("get_system_details:{}", system_id))
    }

    async fn get_item_type(&self, type_id: i64) -> Result<Value, EsiError> {
        self.respond(&format!("get_item_type:{}", type_id))
    }

    async fn get_stargate_details(
        &self,
        stargate_id: i64,
    ) -> Result<Value, EsiError> {
        self.respond(&format!("get_stargate_details:{}", stargate_id))
    }

    async fn get_station_details(
        &self,
        station_id: i64,
    ) -> Result<Value, EsiError> {
        self.respond(&format!("get_station_details:{}", station_id))
    }

    async fn get_market_groups_list(&self) -> Result<Value, EsiError> {
        self.respond("get_market_groups_list")
    }

    async fn get_market_group_details(
        &self,
        group_id: i64,
    ) -> Result<Value, EsiError> {
        self.respond(&format!("get_market_group_details:{}", group_id))
    }

    async fn get_market_orders(
        &self,
        region_id: i64,
        type_id: Option<i64>,
    ) -> Result<Value, EsiError> {
        match type_id {
            Some(type_id) => self
                .respond(&format!("get_market_orders:{}:{}", region_id, type_id)),
            None => self.respond(&format!("get_market_orders:{}", region_id)),
        }
    }

    async fn get_route(
        &self,
        origin: i64,
        destination: i64,
    ) -> Result<Value, EsiError> {
        self.respond(&format!("get_route:{}:{}", origin, destination))
    }

    async fn get_route_with_details(
        &self,
        origin: i64,
        destination: i64,
    ) -> Result<Value, EsiError> {
        self.respond(&format!(
            "get_route_with_details:{}:{}",
            origin, destination
        ))
    }
}
