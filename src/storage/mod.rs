use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Error;

pub mod filesystem;
pub mod s3;

/// Persistence boundary the sink controller drives. Every method may
/// suspend; the controller never issues more demand while a call is in
/// flight, so adapters do not need internal backpressure of their own.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn store_init(&self, name: &str, bytes: Bytes) -> Result<(), Error>;
    async fn store_segment(&self, name: &str, bytes: Bytes) -> Result<(), Error>;
    async fn store_manifests(&self, manifests: &[(String, String)]) -> Result<(), Error>;
    async fn remove_segments(&self, names: &[String]) -> Result<(), Error>;
}
