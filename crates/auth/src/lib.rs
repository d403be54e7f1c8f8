//! Account-security core for the Tavola platform: TOTP factor lifecycle,
//! single-use backup recovery codes, and session bookkeeping.
//!
//! Factor management (enroll, challenge, verify, unenroll) is delegated to an
//! identity provider behind the [`IdentityProvider`] trait; this crate owns
//! the backup-code table, the session audit trail, and the flow state
//! machines driving the provider.

pub mod context;
pub mod error;
pub mod flows;
pub mod jwt;
pub mod mfa;
pub mod provider;
pub mod sessions;

#[cfg(test)]
pub(crate) mod testing;

pub use context::UserContext;
pub use error::{AuthError, Result};
pub use flows::disable::DisableFlow;
pub use flows::enroll::{EnrollmentFlow, EnrollmentState};
pub use flows::step_up::{StepUpFlow, StepUpMethod, StepUpOutcome, StepUpState};
pub use jwt::{Claims, JwtService};
pub use mfa::manager::{BackupCodeManager, LOW_CODE_WARNING_THRESHOLD};
pub use mfa::store::BackupCodeStore;
pub use provider::{
    find_verified_factor,
    hosted::{HostedProvider, HostedProviderConfig},
    local::LocalProvider,
    Challenge, IdentityProvider, TotpProvisioning,
};
pub use sessions::SessionTracker;
