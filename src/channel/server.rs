use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    select,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::stats::UsageStatsService;

use super::{handle_call, MethodCall, MethodResponse};

/// Answers calls read from `reader` until the input ends or `shutdown` is cancelled. Calls are
/// handled one at a time, so responses come out in request order.
pub async fn serve_channel(
    service: &UsageStatsService,
    mut reader: impl AsyncBufRead + Unpin,
    mut writer: impl AsyncWrite + Unpin,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        // Partially read input is dropped on cancellation, which is fine since we stop anyway.
        let read = select! {
            _ = shutdown.cancelled() => {
                info!("Channel shut down");
                return Ok(());
            }
            read = reader.read_until(b'\n', &mut line) => read?,
        };

        if read == 0 {
            info!("Channel input closed");
            return Ok(());
        }
        if line.trim_ascii().is_empty() {
            continue;
        }

        let response = match serde_json::from_slice::<MethodCall>(&line) {
            Ok(call) => handle_call(service, &call).await,
            Err(e) => {
                warn!("Malformed call {}: {e}", String::from_utf8_lossy(&line));
                MethodResponse::Error {
                    message: format!("Malformed call: {e}"),
                }
            }
        };

        let mut buffer = serde_json::to_vec(&response)?;
        buffer.push(b'\n');
        writer.write_all(&buffer).await?;
        writer.flush().await?;
    }
}
