// Client-side synchronization: caching, cancellation, pagination, polling.

pub mod cache;
pub mod generation;
pub mod paginate;
pub mod poll;
pub mod store;
