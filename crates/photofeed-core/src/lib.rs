// # photofeed-core
//
// Core library for the paginated photo feed cache.
//
// ## Architecture Overview
//
// This library keeps a locally cached, ordered list of remote photos that is
// grown page by page from a paginated HTTP API:
// - **Transport**: Trait for executing HTTP requests against the photo API
// - **DateParser**: Trait for turning wire timestamps into `DateTime<Utc>`
// - **PhotoStore**: Single task that owns the cache, the page cursor and the
//   in-flight slot; driven through a cloneable `PhotoStoreHandle`
// - **ChangeNotifier**: Payload-less broadcast fired whenever a page lands
//
// ## Design Principles
//
// 1. **Single Writer**: Only the store task reads or writes cache state
// 2. **Single Flight**: At most one network operation is outstanding
// 3. **Stale-Safe**: Completions are matched by task identity before applying
// 4. **Library-First**: The binary is a thin driver over this crate

pub mod traits;
pub mod model;
pub mod request;
pub mod notifier;
pub mod store;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DateParser, Rfc3339DateParser, Transport};
pub use model::{Dimensions, PhotoRecord, RawLikeResponse, RawPhotoPayload, RawPhotoUrls};
pub use request::{ApiRequest, HttpMethod, RequestFactory};
pub use notifier::{ChangeNotifier, ChangeObserver, ObserverId};
pub use store::{PhotoStore, PhotoStoreHandle, StoreEvent, StoreSnapshot};
pub use config::StoreConfig;
pub use error::{Error, Result, TransportError};
