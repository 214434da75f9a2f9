//! Line delimited json bridge for UI layers living in another process. Every request line is a
//! [MethodCall], every response line a [MethodResponse].

pub mod server;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::stats::UsageStatsService;

pub const CHECK_USAGE_PERMISSION: &str = "checkUsagePermission";
pub const REQUEST_USAGE_PERMISSION: &str = "requestUsagePermission";
pub const GET_APP_USAGE_STATS: &str = "getAppUsageStats";

/// Argument of [GET_APP_USAGE_STATS] naming the application left out of the statistics.
pub const PACKAGE_NAME_ARGUMENT: &str = "packageName";

#[derive(Debug, Clone, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Extracts a named argument. Missing or mistyped arguments come out as `None`.
    pub fn argument<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.arguments
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    Success { result: Value },
    NotImplemented,
    Error { message: String },
}

impl MethodResponse {
    fn success(result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self::Success { result },
            Err(e) => Self::Error {
                message: format!("Failed to serialize result: {e}"),
            },
        }
    }
}

/// Executes a single call against `service`.
pub async fn handle_call(service: &UsageStatsService, call: &MethodCall) -> MethodResponse {
    debug!("Handling {call:?}");
    match call.method.as_str() {
        CHECK_USAGE_PERMISSION => {
            let granted = service.has_permission().await.unwrap_or_else(|e| {
                error!("Failed to check usage access {e:?}");
                false
            });
            MethodResponse::success(granted)
        }
        REQUEST_USAGE_PERMISSION => {
            let launched = service.request_permission().await.unwrap_or_else(|e| {
                error!("Failed to request usage access {e:?}");
                false
            });
            MethodResponse::success(launched)
        }
        GET_APP_USAGE_STATS => {
            let excluded = call
                .argument::<String>(PACKAGE_NAME_ARGUMENT)
                .unwrap_or_default();
            MethodResponse::success(service.app_usage_today(&excluded).await)
        }
        _ => MethodResponse::NotImplemented,
    }
}
