//! Media asset handling: classification, scanning, upload, delete
//!
//! The filesystem is the source of truth at all times. Assets are created
//! by [`upload`], observed by [`scan`] (read-only, recomputed per request,
//! never cached), and destroyed by [`delete`]. All three resolve storage
//! directories through [`roots::RootSet`] so the components cannot disagree
//! about which roots are in play.

pub mod classify;
pub mod delete;
pub mod roots;
pub mod scan;
pub mod upload;

pub use classify::MediaTag;
pub use roots::RootSet;
pub use scan::{Asset, ScanOptions};
pub use upload::StoredUpload;
