//! Transport capability shared by every background stage.

mod client;

pub use client::ReqwestClient;

use crate::errors::Result;

/// Blocking fetch-by-URL. Implementations must be safe to call from several
/// background tasks at once through a shared `Arc`.
pub trait HttpClient: Send + Sync {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;

    fn get_string(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url)?;
        Ok(String::from_utf8(bytes)?)
    }
}
