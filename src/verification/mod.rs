pub mod types;

pub use types::{
    AttemptEntry, AuditEntry, AuditEntryType, SettingsUpdate, VerificationClaim,
    VerificationConfig, VerificationMethod, VerificationResponse, VerificationSetup,
    VerificationStats,
};
