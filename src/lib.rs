pub mod data;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod stores;
pub mod vpath;

pub use error::AppError;
pub use models::entry::{Entry, EntryKind, Origin};
pub use models::navigation::{Address, Section};
pub use models::share::{FileSnapshot, SharePermission, ShareLink, ShareType};
pub use services::navigation_service::{
    Navigation, NavigationController, NavigationOutcome, NavigationTicket,
};
pub use state::AppState;
pub use stores::{BlobStore, MetadataStore};
