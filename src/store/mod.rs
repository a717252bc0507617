// src/store/mod.rs

//! Object-storage access for training artifacts.
//!
//! This module provides [`BucketStore`], a synchronous convenience facade
//! over an S3-compatible bucket (OSS, MinIO, AWS, ...). It exposes
//! directory listing, read, write, download, recursive upload, and image
//! decoding; everything else — networking, retries, consistency — is owned
//! by the wrapped `object_store` client.
//!
//! # Example
//!
//! ```no_run
//! use tablefeed::config::StoreConfig;
//! use tablefeed::store::BucketStore;
//!
//! # fn main() -> tablefeed::Result<()> {
//! let store = BucketStore::new(&StoreConfig {
//!     access_id: "id".into(),
//!     access_key: "key".into(),
//!     endpoint: "https://oss.example.com".into(),
//!     bucket_name: "training-data".into(),
//!     ..Default::default()
//! })?;
//!
//! for name in store.listdir("datasets/train")? {
//!     let image = store.read_image(&format!("datasets/train/{name}"))?;
//!     let _ = image.to_rgb8();
//! }
//! # Ok(())
//! # }
//! ```

mod facade;

pub use facade::BucketStore;
