//! Core Kernel - Foundational types for the betterplace bridge
//!
//! This crate provides the building blocks shared by the profile and donation
//! domains:
//! - CRM identifiers (CiviCRM uses positive integer ids for every entity)
//! - Money types with precise decimal arithmetic
//! - Conversion of epoch timestamps into CRM date-time values
//! - Lenient decoding of CiviCRM-style request and settings values
//! - Port infrastructure shared by all adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod lenient;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{CrmDateTime, Timezone, TemporalError};
pub use identifiers::{
    ContactId, ContributionId, AddressId, GroupId, CampaignId,
    FinancialTypeId, LocationTypeId, PaymentInstrumentId, IdError,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    OperationMetadata, CircuitBreakerConfig,
};
