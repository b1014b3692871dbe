mod select;

pub use select::{find_native_variant, select_native_variant};

use crate::errors::{Result, ResultExt};
use crate::net::HttpClient;
use crate::types::{BuildInfo, ReleaseChannel};

/// Channel-parameterised manifest endpoint; `{channel}` is substituted.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://tf2bd-util.pazer.us/AppInstaller/LatestVersion.json?type={channel}";

/// Resolve a manifest URL template for `channel`.
pub fn manifest_url(template: &str, channel: ReleaseChannel) -> String {
    template.replace("{channel}", channel.as_str())
}

/// Fetch and decode the version manifest (blocking).
pub fn fetch_build_info(client: &dyn HttpClient, url: &str) -> Result<BuildInfo> {
    let bytes = client.get_bytes(url)?;
    serde_json::from_slice::<BuildInfo>(&bytes)
        .with_context(|| format!("invalid manifest JSON from {url}"))
}

pub fn parse_build_info(json: &str) -> Result<BuildInfo> {
    Ok(serde_json::from_str(json)?)
}
