//! Ambient light sensor (lmu) reader
//!
//! Finds the `AppleLMUController` service, opens a connection for the current
//! task, asks it for its two raw channel values and hands back the first one.
//! Every handle acquired on the way is released before returning.

use chrono::{DateTime, Utc};
use rmcp::{model::*, ErrorData as McpError};
use serde::Serialize;
use thiserror::Error;

use crate::shared::internal_error;

/// IOKit service that owns the ambient light sensor
pub const SERVICE_NAME: &str = "AppleLMUController";

/// Method selector returning the raw sensor channels
pub const SELECTOR: u32 = 0;

/// Number of scalar outputs the sensor reports
pub const OUTPUT_COUNT: usize = 2;

/// Kernel return code (`kern_return_t` / `IOReturn`)
pub type KernReturn = i32;

pub const KERN_SUCCESS: KernReturn = 0;

/// `kIOReturnUnderrun`, used when a call succeeds but reports no values
pub const IO_RETURN_UNDERRUN: KernReturn = 0xe000_02e7_u32 as KernReturn;

// === Types ===

#[derive(Debug, Error)]
pub enum LmuError {
    #[error("failed to find ambient light sensor service '{service}'")]
    ServiceNotFound { service: String },

    #[error("IOServiceOpen: {message} (0x{code:08x})")]
    ConnectionOpenFailed { code: KernReturn, message: String },

    /// `code` is `IO_RETURN_UNDERRUN` when the call itself succeeded but
    /// reported no values; otherwise it is what the call returned.
    #[error("could not get sensor value (0x{code:08x})")]
    QueryFailed { code: KernReturn },
}

/// Which service and method to query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub service: String,
    pub selector: u32,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            selector: SELECTOR,
        }
    }
}

/// One raw sample from the sensor
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    /// First channel; this is the reading
    pub value: u64,
    /// Second channel, when the service reported one
    pub secondary: Option<u64>,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// The three registry operations the reader needs.
///
/// Releasing a service reference or closing a connection is done by dropping
/// the handle, so implementations put their release calls in `Drop`.
pub trait ServiceRegistry {
    type Service;
    type Connection;

    /// Look up the single service registered under `name`.
    fn find_service(&self, name: &str) -> Option<Self::Service>;

    /// Open a connection to `service` on behalf of the current task.
    fn open(&self, service: &Self::Service) -> Result<Self::Connection, KernReturn>;

    /// Synchronous scalar-output call. Fills `outputs` from the front and
    /// returns how many values the service wrote.
    fn call_method(
        &self,
        connection: &Self::Connection,
        selector: u32,
        outputs: &mut [u64],
    ) -> Result<usize, KernReturn>;

    /// Human-readable text for a return code
    fn describe(&self, code: KernReturn) -> String {
        format!("error 0x{:08x}", code)
    }
}

/// Registry for platforms without IOKit: nothing is ever registered.
pub struct UnsupportedRegistry;

impl ServiceRegistry for UnsupportedRegistry {
    type Service = std::convert::Infallible;
    type Connection = std::convert::Infallible;

    fn find_service(&self, name: &str) -> Option<Self::Service> {
        tracing::debug!("No IOKit on this platform, '{}' cannot be found", name);
        None
    }

    fn open(&self, service: &Self::Service) -> Result<Self::Connection, KernReturn> {
        match *service {}
    }

    fn call_method(
        &self,
        connection: &Self::Connection,
        _selector: u32,
        _outputs: &mut [u64],
    ) -> Result<usize, KernReturn> {
        match *connection {}
    }
}

#[cfg(target_os = "macos")]
pub fn platform_registry() -> impl ServiceRegistry {
    crate::macos::iokit::IoKitRegistry
}

#[cfg(not(target_os = "macos"))]
pub fn platform_registry() -> impl ServiceRegistry {
    UnsupportedRegistry
}

pub fn backend_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "IOKit"
    } else {
        "unavailable (IOKit is macOS only)"
    }
}

// === Reader ===

/// Run one query against `registry`.
pub fn read_with<R: ServiceRegistry>(registry: &R, probe: &Probe) -> Result<Reading, LmuError> {
    tracing::debug!("Looking up service {}", probe.service);
    let service = registry
        .find_service(&probe.service)
        .ok_or_else(|| LmuError::ServiceNotFound {
            service: probe.service.clone(),
        })?;

    tracing::debug!("Opening connection to {}", probe.service);
    let opened = registry.open(&service);
    drop(service);
    let connection = opened.map_err(|code| LmuError::ConnectionOpenFailed {
        code,
        message: registry.describe(code),
    })?;

    tracing::debug!("Calling selector {}", probe.selector);
    let mut values = [0u64; OUTPUT_COUNT];
    let count = registry
        .call_method(&connection, probe.selector, &mut values)
        .map_err(|code| LmuError::QueryFailed { code })?
        .min(OUTPUT_COUNT);
    drop(connection);

    if count == 0 {
        return Err(LmuError::QueryFailed {
            code: IO_RETURN_UNDERRUN,
        });
    }

    tracing::debug!("Sensor reported {} value(s): {:?}", count, &values[..count]);
    Ok(Reading {
        value: values[0],
        secondary: (count > 1).then_some(values[1]),
        service: probe.service.clone(),
        timestamp: Utc::now(),
    })
}

/// Full reading from this platform's ambient light sensor.
pub fn read() -> Result<Reading, LmuError> {
    read_with(&platform_registry(), &Probe::default())
}

/// Raw first-channel value from the ambient light sensor.
pub fn read_ambient_light() -> Result<u64, LmuError> {
    read().map(|reading| reading.value)
}

fn format_sensor_info(probe: &Probe) -> String {
    format!(
        "Ambient Light Sensor:\n\n  Service: {}\n  Selector: {}\n  Outputs: {}\n  Backend: {}\n",
        probe.service,
        probe.selector,
        OUTPUT_COUNT,
        backend_name()
    )
}

// === Tool Functions ===

pub async fn get_ambient_light() -> Result<CallToolResult, McpError> {
    let result = tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| internal_error(format!("Task failed: {}", e)))?;

    match result {
        Ok(reading) => {
            let json = serde_json::to_string_pretty(&reading)
                .map_err(|e| internal_error(format!("Serialization error: {}", e)))?;
            Ok(CallToolResult::success(vec![Content::text(json)]))
        }
        Err(e) => Ok(CallToolResult::success(vec![Content::text(format!(
            "Failed to read ambient light: {}",
            e
        ))])),
    }
}

pub async fn get_sensor_info() -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        format_sensor_info(&Probe::default()),
    )]))
}
