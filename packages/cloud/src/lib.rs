//! # cloudsync
//!
//! Client-side cloud backup for game settings and assets.
//!
//! A [`CloudCoordinator`] signs in, pushes and pulls settings, uploads and
//! downloads files, and keeps a cached [`Inventory`] of what is stored
//! remotely. Operations never block: each one issues a request through a
//! [`Transport`](cloudsync_http::Transport) and returns, and the host calls
//! [`CloudCoordinator::tick`] from its update loop to apply results as
//! requests finish. Outcomes are reported as [`CloudEvent`]s.
//!
//! The coordinator only touches the outside world through its
//! collaborators:
//!
//! - [`FileStore`]: files under the save directory ([`LocalFileStore`],
//!   [`MemoryFileStore`])
//! - [`ConfigStore`]: the local settings document ([`JsonConfigStore`])
//! - [`ScriptExecutor`]: optional, runs downloaded `.cfg` files

pub mod config;
pub mod coordinator;
pub mod endpoints;
pub mod error;
pub mod event;
pub mod inventory;
pub mod path;
pub mod presets;
pub mod script;
pub mod session;
pub mod settings;
pub mod slot;
pub mod storage;
pub mod transfer;

pub use config::CloudConfig;
pub use coordinator::{CloudCoordinator, SyncDirection};
pub use error::{CloudError, CloudResult};
pub use event::{CloudEvent, FailureKind, Operation, Outcome};
pub use inventory::{AssetKind, Inventory, InventoryAsset, StorageSummary};
pub use path::{AssetPath, PathError};
pub use presets::UploadSelection;
pub use script::ScriptExecutor;
pub use session::Session;
pub use settings::{ConfigStore, JsonConfigStore};
pub use storage::{DirEntry, FileStore, LocalFileStore, MemoryFileStore};
