//! Donation Domain
//!
//! Records betterplace.org donations in CiviCRM. A [`Submission`] is routed
//! to the profile responsible for its form, the donor (and their
//! organisation) is matched or created, and a contribution is recorded with
//! the financial type, campaign and payment instrument the profile dictates.
//!
//! # Examples
//!
//! ```rust,ignore
//! use domain_donation::{HandlerOptions, Submission, SubmissionHandler};
//!
//! let handler = SubmissionHandler::new(registry, crm, HandlerOptions::default());
//! let receipt = handler.submit(submission, None).await?;
//! println!("recorded contribution {}", receipt.foreign_id);
//! ```

pub mod submission;
pub mod error;
pub mod ports;
pub mod handler;
pub mod adapters;

pub use submission::{Submission, AddressFields};
pub use error::DonationError;
pub use ports::{
    CrmPort, ContactType, ContactRequest, AddressRequest, ContributionRequest, Contribution,
};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{MockCrmPort, CrmCalls};
pub use handler::{SubmissionHandler, HandlerOptions, DonationReceipt};
pub use adapters::{CiviCrmAdapter, CiviCrmConfig};
