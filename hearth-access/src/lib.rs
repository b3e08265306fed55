//! hearth-access - Family permission evaluation engine
//!
//! Decides whether a family member may see or change something. Three sources
//! feed one fail-closed answer: role defaults per category, per-member override
//! rules with optional item scope and expiry, and an action grant for
//! additional adults. State is loaded asynchronously into immutable snapshots;
//! every check after that is a synchronous call against a snapshot.

pub mod access;
pub mod action;
pub mod cache;
pub mod category;
pub mod config;
pub mod defaults;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod gate;
pub mod level;
pub mod loader;
pub mod request;
pub mod resolver;
pub mod role;
pub mod rule;
pub mod snapshot;
pub mod store;
pub mod workflow;

pub use error::{AccessError, AccessResult};

// Domain model
pub use action::{ActionGroup, AdditionalAdultGrant, GrantEvaluator, GrantLevel, PermissionAction};
pub use category::{CategoryMap, PermissionCategory};
pub use defaults::defaults_for;
pub use level::{PermissionLevel, at_least};
pub use request::{AccessRequest, RequestDecision, RequestStatus};
pub use resolver::{CategoryResolver, resolve};
pub use role::{FamilyMember, MemberId, Role};
pub use rule::{ItemId, PermissionRule, RuleUpdate, normalize_items};

// Runtime
pub use access::{ActionAccess, CategoryAccess};
pub use cache::{LoadTicket, SnapshotCache};
pub use config::{
    DiagnosticsConfig, EngineConfig, LoadingConfig, RequestConfig, default_config_path,
    load_config_from_file, load_config_or_default, parse_config, validate_config,
};
pub use diagnostics::{DiagnosticEvent, Diagnostics};
pub use engine::PermissionEngine;
pub use gate::{DeniedNotice, Gate, GateDecision, Rendered, Requirement, RequirementKind};
pub use loader::{LoadResult, SnapshotLoader, spawn_refresh_loop};
pub use snapshot::{LoadFailure, MemberSnapshot};
pub use store::{MemoryPermissionStore, PermissionStore};
pub use workflow::{AccessRequestWorkflow, RequestStats};
