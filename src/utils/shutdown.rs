use tokio::select;
use tokio_util::sync::CancellationToken;

/// Cancels `cancelation` on ctrl-c, or returns once it's cancelled by someone else.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
