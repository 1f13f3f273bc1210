//! Reconciliation engine for remote resource inventories.
//!
//! Given a declared list of desired records and a remote API that lists the
//! current ones, the engine computes the smallest set of create, update and
//! delete calls that makes the remote side match, and runs them. Running it
//! twice in a row makes no changes the second time.
//!
//! # Example
//!
//! ```ignore
//! use converge_core::{InMemoryInventory, State, converge, resources};
//! use serde_json::json;
//!
//! let profile = resources::lookup("netconf-credentials")?;
//! let api = InMemoryInventory::new().with_envelope("response");
//! let report = converge(&profile, &api, &[json!({"port": 830})], State::Present, false).await?;
//! assert_eq!(report.added, vec![json!(830)]);
//! ```

pub mod engine;
pub mod error;
pub mod executor;
pub mod field_map;
pub mod matcher;
pub mod memory;
pub mod operations;
pub mod profile;
pub mod reconciler;
pub mod record;
pub mod remote;
pub mod report;
pub mod resources;
pub mod schema;
pub mod serializer;

pub use engine::{converge, plan};
pub use error::{
    ConvergeError, ErrorCategory, OperationKind, Result, SchemaError, TransportError,
};
pub use executor::Executor;
pub use field_map::{FieldMap, MapEntry, Transform};
pub use matcher::{Coercion, MatchRule, Matcher};
pub use memory::{InMemoryInventory, RecordedCall};
pub use operations::{OperationSet, State, UpdateOp};
pub use profile::{
    Endpoints, Identity, ProfileBuilder, ResourceProfile, UpdateAddressing, WriteMode,
};
pub use reconciler::Reconciler;
pub use record::{Desired, Field, ID_FIELD, Observed, RawRecord, Side, TypedRecord, decode_observed};
pub use remote::{RemoteApi, Verb};
pub use report::{ChangeReport, Modified};
pub use schema::{ConfigSpec, FieldSpec, FieldType};
pub use serializer::{render, render_batch, render_fields};
