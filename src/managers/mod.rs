pub mod audit_log;
pub mod config_manager;
pub mod join_handler;
pub mod removal_scheduler;
pub mod stats;
pub mod verification_manager;

pub use audit_log::{create_shared_audit_log, SharedAuditLog};
pub use config_manager::{create_shared_config_manager, ConfigManager, SharedConfigManager};
pub use join_handler::{create_shared_join_handler, MemberJoin, SharedJoinHandler};
pub use removal_scheduler::{create_shared_pending_removals, SharedPendingRemovals};
pub use stats::guild_stats;
pub use verification_manager::{create_shared_verification_manager, SharedVerificationManager};
