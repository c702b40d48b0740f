//! Resource lifecycle protocol
//!
//! The pieces every resource type shares:
//!
//! - [`pagination`] - follow opaque page tokens until a listing is exhausted
//! - [`poll`] - wait for asynchronous provisioning to reach a terminal status
//! - [`import`] - split composite import ids
//! - [`orchestrator`] - sequence Create/Read/Update/Delete/Import

pub mod import;
pub mod orchestrator;
pub mod pagination;
pub mod poll;

pub use import::parse_import_id;
pub use orchestrator::{read_data_source, CreateError, Lifecycle, LifecycleState, ResourceInstance};
pub use pagination::{fetch_all, Page, PageCursor, LIST_PAGE_SIZE};
pub use poll::{Observation, ProvisioningHandle, Target};
