//! Adapter lookup and name-filtered discovery.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::DiscoveryFilter;

/// How often the peripheral list is checked while scanning.
const SCAN_POLL_STEP: Duration = Duration::from_millis(250);

/// Get the first available Bluetooth adapter.
///
/// Both a failing manager and an empty adapter list mean the platform cannot
/// do Bluetooth, so both map to [`Error::CapabilityUnavailable`].
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new()
        .await
        .map_err(|e| Error::capability_unavailable(e.to_string()))?;
    let adapters = manager
        .adapters()
        .await
        .map_err(|e| Error::capability_unavailable(e.to_string()))?;

    adapters
        .into_iter()
        .next()
        .ok_or_else(|| Error::capability_unavailable("no Bluetooth adapter found"))
}

/// Scan until a peripheral advertising exactly `filter.name` shows up.
///
/// The scan is bounded by `filter.scan_timeout`. Peripherals the adapter
/// already knows about are checked before scanning starts.
pub async fn find_by_name(adapter: &Adapter, filter: &DiscoveryFilter) -> Result<Peripheral> {
    info!("Looking for device: {}", filter.name);

    if let Some(peripheral) = find_known_peripheral(adapter, filter).await? {
        info!("Found device in cache (no scan needed)");
        return Ok(peripheral);
    }

    adapter.start_scan(ScanFilter::default()).await?;
    let deadline = Instant::now() + filter.scan_timeout;

    let found = loop {
        if let Some(peripheral) = find_known_peripheral(adapter, filter).await? {
            break Some(peripheral);
        }
        if Instant::now() >= deadline {
            break None;
        }
        sleep(SCAN_POLL_STEP).await;
    };

    if let Err(e) = adapter.stop_scan().await {
        debug!("Failed to stop scan: {}", e);
    }

    match found {
        Some(peripheral) => {
            info!("Found device: {}", filter.name);
            Ok(peripheral)
        }
        None => {
            warn!(
                "Device not found after {:?}: {}",
                filter.scan_timeout, filter.name
            );
            Err(Error::DeviceNotFound {
                name: filter.name.clone(),
                duration: filter.scan_timeout,
            })
        }
    }
}

/// Search the adapter's known peripherals for a name match.
async fn find_known_peripheral(
    adapter: &Adapter,
    filter: &DiscoveryFilter,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        if let Ok(Some(props)) = peripheral.properties().await
            && let Some(name) = &props.local_name
            && filter.matches_name(name)
        {
            debug!("Matched by name: {} ({})", name, props.address);
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}
