//! CiviCRM Adapter
//!
//! Talks to a CiviCRM site through the APIv3 REST endpoint. Every call is a
//! form-encoded POST carrying `entity`, `action`, the parameters as `json`,
//! and the user and site keys:
//!
//! ```text
//! POST https://crm.example.org/civicrm/ajax/rest
//! entity=Contribution&action=create&json={...}&api_key=...&key=...
//! ```
//!
//! The adapter implements every port the bridge needs from CiviCRM:
//! [`CrmPort`] for recording donations, [`ReferenceDataPort`] for the profile
//! editor's option lists, and [`SettingsPort`] for keeping the profile
//! collection in CiviCRM's settings.
//!
//! # Error Handling
//!
//! - `is_error = 1` responses -> `PortError::Validation`
//! - 401/403 -> `PortError::Unauthorized`
//! - 429 -> `PortError::RateLimited`
//! - 5xx -> `PortError::ServiceUnavailable`
//! - Timeouts -> `PortError::Timeout`
//! - Undecodable responses -> `PortError::Transformation`
//!
//! Calls are not retried. Contact creation and contribution recording are
//! not idempotent on the CiviCRM side.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use core_kernel::lenient::{value_to_opt_i64, value_to_opt_string};
use core_kernel::{
    AdapterHealth, AddressId, CircuitBreakerConfig, ContactId, ContributionId, CrmDateTime,
    DomainPort, GroupId, HealthCheckResult, HealthCheckable, LocationTypeId, OperationMetadata,
    PortError,
};
use domain_profile::{OptionItem, ReferenceDataPort, SettingsPort, StoredProfiles, PROFILES_SETTING};

use crate::ports::{AddressRequest, ContactRequest, Contribution, ContributionRequest, CrmPort};
use crate::submission::AddressFields;

const ADAPTER_ID: &str = "civicrm-adapter";

/// Relationship type "Employee of"
const RELATIONSHIP_TYPE_EMPLOYEE_OF: i64 = 5;

const GROUP_TYPE_MAILING_LIST: &str = "Mailing List";

/// Separator CiviCRM uses in multi-value fields
const VALUE_SEPARATOR: char = '\u{1}';

/// Configuration for the CiviCRM adapter
#[derive(Debug, Clone)]
pub struct CiviCrmConfig {
    /// REST endpoint, e.g. `https://crm.example.org/civicrm/ajax/rest`
    pub base_url: String,

    /// API key of the CiviCRM user the bridge acts as
    pub api_key: String,

    /// Site key of the CiviCRM installation
    pub site_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl Default for CiviCrmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            site_key: String::new(),
            timeout_secs: 30,
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 5,
                success_threshold: 3,
                reset_timeout_secs: 60,
            }),
        }
    }
}

/// Circuit breaker state for fault tolerance
#[derive(Debug)]
struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failure_count: AtomicU64,
    success_count: AtomicU64,
    is_open: AtomicBool,
    last_failure_time: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            failure_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            is_open: AtomicBool::new(false),
            last_failure_time: RwLock::new(None),
        }
    }

    async fn is_available(&self) -> bool {
        if !self.is_open.load(Ordering::Relaxed) {
            return true;
        }

        // Half-open once the reset timeout has elapsed
        let last_failure = self.last_failure_time.read().await;
        match *last_failure {
            Some(time) => time.elapsed() > Duration::from_secs(self.config.reset_timeout_secs),
            None => false,
        }
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        if !self.is_open.load(Ordering::Relaxed) {
            return;
        }
        let success = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
        if success >= u64::from(self.config.success_threshold) {
            self.is_open.store(false, Ordering::Relaxed);
            self.success_count.store(0, Ordering::Relaxed);
        }
    }

    async fn record_failure(&self) {
        self.success_count.store(0, Ordering::Relaxed);
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= u64::from(self.config.failure_threshold) {
            self.is_open.store(true, Ordering::Relaxed);
            *self.last_failure_time.write().await = Some(Instant::now());
        }
    }
}

/// Envelope of every APIv3 response
#[derive(Debug, Clone, Deserialize)]
struct ApiResponse {
    #[serde(default, deserialize_with = "core_kernel::lenient::opt_int")]
    is_error: Option<i64>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default, deserialize_with = "core_kernel::lenient::opt_int")]
    id: Option<i64>,
    #[serde(default, deserialize_with = "core_kernel::lenient::opt_int")]
    count: Option<i64>,
    #[serde(default)]
    values: Value,
}

impl ApiResponse {
    fn count(&self) -> i64 {
        self.count.unwrap_or(0)
    }

    /// Returns the result records, whether keyed by id or listed
    fn records(&self) -> Vec<&Value> {
        match &self.values {
            Value::Object(map) => map.values().collect(),
            Value::Array(items) => items.iter().collect(),
            _ => Vec::new(),
        }
    }

    fn first_record(&self) -> Option<&Value> {
        self.records().into_iter().next()
    }
}

/// CiviCRM APIv3 adapter
#[derive(Debug)]
pub struct CiviCrmAdapter {
    config: CiviCrmConfig,
    client: reqwest::Client,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
}

impl CiviCrmAdapter {
    /// Creates an adapter with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(config: CiviCrmConfig) -> Result<Self, PortError> {
        reqwest::Url::parse(&config.base_url).map_err(|e| {
            PortError::validation_field(format!("invalid CiviCRM URL: {}", e), "base_url")
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortError::internal(format!("failed to build HTTP client: {}", e)))?;

        let circuit_breaker = config
            .circuit_breaker
            .clone()
            .map(|cb| Arc::new(CircuitBreaker::new(cb)));

        Ok(Self {
            config,
            client,
            circuit_breaker,
        })
    }

    /// Returns the REST endpoint
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Checks if the circuit breaker is open (blocking requests)
    pub async fn is_circuit_open(&self) -> bool {
        match self.circuit_breaker {
            Some(ref cb) => !cb.is_available().await,
            None => false,
        }
    }

    /// Performs one APIv3 call
    #[instrument(skip(self, params))]
    async fn call(&self, entity: &str, action: &str, params: Value) -> Result<ApiResponse, PortError> {
        if self.is_circuit_open().await {
            return Err(PortError::ServiceUnavailable {
                service: "CiviCRM (circuit breaker is open)".to_string(),
            });
        }

        let result = self.send(entity, action, &params).await;
        if let Some(ref cb) = self.circuit_breaker {
            match &result {
                Err(error) if error.is_transient() => cb.record_failure().await,
                _ => cb.record_success(),
            }
        }
        result
    }

    async fn send(&self, entity: &str, action: &str, params: &Value) -> Result<ApiResponse, PortError> {
        let json = params.to_string();
        let form = [
            ("entity", entity),
            ("action", action),
            ("json", json.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("key", self.config.site_key.as_str()),
        ];

        let started = Instant::now();
        let response = self
            .client
            .post(&self.config.base_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.request_error(entity, action, e))?;

        let status = response.status();
        debug!(%status, elapsed_ms = started.elapsed().as_millis() as u64, "CiviCRM responded");
        if let Some(error) = status_error(status, &response) {
            return Err(error);
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("invalid CiviCRM response: {}", e)))?;
        check_response(entity, action, body)
    }

    fn request_error(&self, entity: &str, action: &str, error: reqwest::Error) -> PortError {
        if error.is_timeout() {
            PortError::Timeout {
                operation: format!("{}.{}", entity, action),
                duration_ms: self.config.timeout_secs * 1000,
            }
        } else {
            PortError::Connection {
                message: format!("CiviCRM request {}.{} failed", entity, action),
                source: Some(Box::new(error)),
            }
        }
    }

    /// Resolves an ISO country code to CiviCRM's country id
    async fn country_id(&self, iso_code: &str) -> Result<Option<i64>, PortError> {
        let response = self
            .call("Country", "get", json!({"iso_code": iso_code, "return": "id"}))
            .await?;
        if response.count() == 0 {
            warn!(%iso_code, "Unknown country code");
            return Ok(None);
        }
        Ok(response.id)
    }

    /// Adds the address parts to API parameters
    async fn add_address_params(
        &self,
        params: &mut Map<String, Value>,
        address: &AddressFields,
    ) -> Result<(), PortError> {
        let parts = [
            ("street_address", &address.street_address),
            ("postal_code", &address.postal_code),
            ("city", &address.city),
        ];
        for (key, value) in parts {
            if let Some(value) = value {
                params.insert(key.to_string(), json!(value));
            }
        }
        if let Some(iso_code) = &address.country {
            if let Some(country_id) = self.country_id(iso_code).await? {
                params.insert("country_id".to_string(), json!(country_id));
            }
        }
        Ok(())
    }

    async fn options(
        &self,
        entity: &str,
        params: Value,
        value_key: &str,
        label_key: &str,
    ) -> Result<Vec<OptionItem>, PortError> {
        let response = self.call(entity, "get", params).await?;
        Ok(response
            .records()
            .into_iter()
            .filter_map(|record| {
                let value = value_to_opt_string(&record[value_key]).ok().flatten()?;
                let label = value_to_opt_string(&record[label_key])
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| value.clone());
                Some(OptionItem::new(value, label))
            })
            .collect())
    }
}

fn status_error(status: reqwest::StatusCode, response: &reqwest::Response) -> Option<PortError> {
    match status.as_u16() {
        401 | 403 => Some(PortError::Unauthorized {
            message: format!("CiviCRM rejected the API credentials ({})", status),
        }),
        429 => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or(60);
            Some(PortError::RateLimited { retry_after_secs })
        }
        500..=599 => Some(PortError::ServiceUnavailable {
            service: format!("CiviCRM ({})", status),
        }),
        _ if !status.is_success() => Some(PortError::internal(format!(
            "unexpected CiviCRM status {}",
            status
        ))),
        _ => None,
    }
}

fn check_response(entity: &str, action: &str, response: ApiResponse) -> Result<ApiResponse, PortError> {
    if response.is_error.unwrap_or(0) != 0 {
        let message = response
            .error_message
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(PortError::validation(format!("{}.{}: {}", entity, action, message)));
    }
    Ok(response)
}

fn contact_params(request: &ContactRequest) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("contact_type".to_string(), json!(request.contact_type.as_str()));
    let fields = [
        ("first_name", &request.first_name),
        ("last_name", &request.last_name),
        ("email", &request.email),
        ("organization_name", &request.organization_name),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            params.insert(key.to_string(), json!(value));
        }
    }
    if let Some(location_type_id) = request.location_type_id {
        params.insert("location_type_id".to_string(), json!(location_type_id.get()));
    }
    params
}

fn contribution_params(request: &ContributionRequest) -> Value {
    let mut params = Map::new();
    params.insert("contact_id".to_string(), json!(request.contact_id.get()));
    params.insert("financial_type_id".to_string(), json!(request.financial_type_id.get()));
    params.insert(
        "payment_instrument_id".to_string(),
        json!(request.payment_instrument_id.get()),
    );
    params.insert(
        "total_amount".to_string(),
        json!(request.total_amount.amount().to_string()),
    );
    params.insert(
        "currency".to_string(),
        json!(request.total_amount.currency().code()),
    );
    if let Some(trxn_id) = &request.trxn_id {
        params.insert("trxn_id".to_string(), json!(trxn_id));
    }
    if let Some(receive_date) = request.receive_date {
        params.insert("receive_date".to_string(), json!(receive_date.to_string()));
    }
    if let Some(campaign_id) = request.campaign_id {
        params.insert("campaign_id".to_string(), json!(campaign_id.get()));
    }
    Value::Object(params)
}

/// Builds a contribution from a CiviCRM record
fn parse_contribution(record: &Value) -> Result<Contribution, PortError> {
    fn id<T: TryFrom<i64>>(record: &Value, key: &str) -> Option<T> {
        value_to_opt_i64(&record[key])
            .ok()
            .flatten()
            .and_then(|raw| T::try_from(raw).ok())
    }

    let contribution_id: ContributionId = id(record, "id")
        .ok_or_else(|| PortError::transformation("contribution record without id"))?;
    let contact_id: ContactId = id(record, "contact_id")
        .ok_or_else(|| PortError::transformation("contribution record without contact_id"))?;

    let total_amount = value_to_opt_string(&record["total_amount"])
        .ok()
        .flatten()
        .map(|raw| Decimal::from_str(raw.trim()))
        .transpose()
        .map_err(|e| PortError::transformation(format!("invalid total_amount: {}", e)))?
        .unwrap_or_default();

    let receive_date = value_to_opt_string(&record["receive_date"])
        .ok()
        .flatten()
        .and_then(|raw| {
            let compact: String = raw.chars().filter(char::is_ascii_digit).collect();
            CrmDateTime::parse(&compact).ok()
        });

    Ok(Contribution {
        id: contribution_id,
        contact_id,
        financial_type_id: id(record, "financial_type_id"),
        payment_instrument_id: id(record, "payment_instrument_id"),
        total_amount,
        currency: value_to_opt_string(&record["currency"]).ok().flatten(),
        trxn_id: value_to_opt_string(&record["trxn_id"]).ok().flatten(),
        receive_date,
        campaign_id: id(record, "campaign_id"),
    })
}

impl DomainPort for CiviCrmAdapter {}

#[async_trait]
impl HealthCheckable for CiviCrmAdapter {
    /// Calls `System.get`, which any authenticated user may read
    async fn health_check(&self) -> HealthCheckResult {
        if self.is_circuit_open().await {
            return HealthCheckResult::now(
                ADAPTER_ID,
                AdapterHealth::Degraded,
                0,
                Some("Circuit breaker is open".to_string()),
            );
        }

        let start = Instant::now();
        let result = self.call("System", "get", json!({})).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::now(ADAPTER_ID, AdapterHealth::Healthy, latency_ms, None),
            Err(error) => HealthCheckResult::now(
                ADAPTER_ID,
                AdapterHealth::Unhealthy,
                latency_ms,
                Some(error.to_string()),
            ),
        }
    }
}

#[async_trait]
impl CrmPort for CiviCrmAdapter {
    /// Uses the extended contact matcher's `getorcreate` action
    async fn get_or_create_contact(
        &self,
        request: ContactRequest,
        _metadata: Option<OperationMetadata>,
    ) -> Result<ContactId, PortError> {
        let mut params = contact_params(&request);
        self.add_address_params(&mut params, &request.address).await?;

        let response = self
            .call("Contact", "getorcreate", Value::Object(params))
            .await?;
        let raw = response
            .id
            .ok_or_else(|| PortError::transformation("getorcreate returned no contact id"))?;
        ContactId::new(raw).map_err(|e| PortError::transformation(e.to_string()))
    }

    /// Links the individual to the organisation's work address and records
    /// them as an employee. Links that already exist are kept, so a returning
    /// donor is not linked twice.
    async fn share_work_address(
        &self,
        contact_id: ContactId,
        organisation_id: ContactId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<bool, PortError> {
        let addresses = self
            .call(
                "Address",
                "get",
                json!({
                    "contact_id": organisation_id.get(),
                    "location_type_id": LocationTypeId::WORK.get(),
                    "options": {"limit": 1},
                }),
            )
            .await?;

        let Some(master_id) = addresses
            .first_record()
            .and_then(|record| value_to_opt_i64(&record["id"]).ok().flatten())
        else {
            debug!(%organisation_id, "Organisation has no work address");
            return Ok(false);
        };

        let shared = self
            .call(
                "Address",
                "get",
                json!({
                    "contact_id": contact_id.get(),
                    "master_id": master_id,
                    "options": {"limit": 1},
                }),
            )
            .await?;
        if shared.first_record().is_some() {
            debug!(%contact_id, master_id, "Work address already shared");
        } else {
            self.call(
                "Address",
                "create",
                json!({
                    "contact_id": contact_id.get(),
                    "location_type_id": LocationTypeId::WORK.get(),
                    "master_id": master_id,
                }),
            )
            .await?;
        }

        let relationship = json!({
            "contact_id_a": contact_id.get(),
            "contact_id_b": organisation_id.get(),
            "relationship_type_id": RELATIONSHIP_TYPE_EMPLOYEE_OF,
        });
        let mut lookup = relationship.clone();
        lookup["is_active"] = json!(1);
        lookup["options"] = json!({"limit": 1});
        let existing = self.call("Relationship", "get", lookup).await?;
        if existing.first_record().is_some() {
            debug!(%contact_id, %organisation_id, "Employee relationship already exists");
        } else {
            self.call("Relationship", "create", relationship).await?;
        }

        Ok(true)
    }

    async fn create_address(
        &self,
        request: AddressRequest,
        _metadata: Option<OperationMetadata>,
    ) -> Result<AddressId, PortError> {
        let mut params = Map::new();
        params.insert("contact_id".to_string(), json!(request.contact_id.get()));
        params.insert("location_type_id".to_string(), json!(request.location_type_id.get()));
        self.add_address_params(&mut params, &request.address).await?;

        let response = self.call("Address", "create", Value::Object(params)).await?;
        let raw = response
            .id
            .ok_or_else(|| PortError::transformation("Address.create returned no id"))?;
        AddressId::new(raw).map_err(|e| PortError::transformation(e.to_string()))
    }

    async fn create_contribution(
        &self,
        request: ContributionRequest,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Contribution, PortError> {
        let response = self
            .call("Contribution", "create", contribution_params(&request))
            .await?;
        let record = response
            .first_record()
            .ok_or_else(|| PortError::transformation("Contribution.create returned no record"))?;
        parse_contribution(record)
    }

    async fn add_to_group(
        &self,
        contact_id: ContactId,
        group_id: GroupId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.call(
            "GroupContact",
            "create",
            json!({"group_id": group_id.get(), "contact_id": contact_id.get()}),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ReferenceDataPort for CiviCrmAdapter {
    async fn location_types(&self) -> Result<Vec<OptionItem>, PortError> {
        self.options(
            "LocationType",
            json!({"is_active": 1, "options": {"limit": 0}}),
            "id",
            "name",
        )
        .await
    }

    async fn financial_types(&self) -> Result<Vec<OptionItem>, PortError> {
        self.options(
            "FinancialType",
            json!({"is_active": 1, "options": {"limit": 0}, "return": "id,name"}),
            "id",
            "name",
        )
        .await
    }

    async fn campaigns(&self) -> Result<Vec<OptionItem>, PortError> {
        self.options(
            "Campaign",
            json!({"is_active": 1, "options": {"limit": 0}, "return": "id,title"}),
            "id",
            "title",
        )
        .await
    }

    async fn payment_instruments(&self) -> Result<Vec<OptionItem>, PortError> {
        self.options(
            "OptionValue",
            json!({
                "option_group_id": "payment_instrument",
                "is_active": 1,
                "options": {"limit": 0},
                "return": "value,label",
            }),
            "value",
            "label",
        )
        .await
    }

    async fn mailing_list_groups(&self) -> Result<Vec<OptionItem>, PortError> {
        let group_types = self
            .call(
                "OptionValue",
                "get",
                json!({"option_group_id": "group_type", "name": GROUP_TYPE_MAILING_LIST}),
            )
            .await?;
        let Some(group_type) = group_types
            .first_record()
            .and_then(|record| value_to_opt_string(&record["value"]).ok().flatten())
        else {
            return Ok(Vec::new());
        };

        let pattern = format!("%{sep}{}{sep}%", group_type, sep = VALUE_SEPARATOR);
        self.options(
            "Group",
            json!({
                "is_active": 1,
                "group_type": {"LIKE": pattern},
                "options": {"limit": 0},
                "return": "id,name",
            }),
            "id",
            "name",
        )
        .await
    }
}

#[async_trait]
impl SettingsPort for CiviCrmAdapter {
    async fn load_profiles(&self) -> Result<Option<StoredProfiles>, PortError> {
        let response = self
            .call("Setting", "get", json!({"return": PROFILES_SETTING}))
            .await?;
        let stored = response
            .first_record()
            .map(|record| &record[PROFILES_SETTING])
            .filter(|value| !value.is_null());

        match stored {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(
                map.iter().map(|(name, data)| (name.clone(), data.clone())).collect(),
            )),
            Some(other) => Err(PortError::transformation(format!(
                "{} is not a profile map: {}",
                PROFILES_SETTING, other
            ))),
        }
    }

    async fn store_profiles(&self, profiles: &StoredProfiles) -> Result<(), PortError> {
        let mut params = Map::new();
        params.insert(PROFILES_SETTING.to_string(), json!(profiles));
        self.call("Setting", "create", Value::Object(params)).await?;
        Ok(())
    }
}
