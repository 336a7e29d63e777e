//! External-media UDP sink: binds the loopback port the call driver's
//! `external_media` channels stream to, and discards every datagram. No RTP
//! decoding is in scope — the driver only needs somewhere for Asterisk to
//! send the audio.

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const EXTERNAL_MEDIA_BIND: &str = "127.0.0.1:55444";

/// Binds the sink and drains datagrams until `shutdown` is cancelled.
pub async fn run(shutdown: CancellationToken) {
    let socket = match UdpSocket::bind(EXTERNAL_MEDIA_BIND).await {
        Ok(s) => s,
        Err(err) => {
            warn!(error = %err, bind = EXTERNAL_MEDIA_BIND, "failed to bind external-media udp sink");
            return;
        }
    };
    info!(bind = EXTERNAL_MEDIA_BIND, "external-media udp sink listening");

    let mut buf = [0u8; 2048];
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("external-media udp sink shutting down");
                return;
            }
            result = socket.recv_from(&mut buf) => {
                if let Err(err) = result {
                    warn!(error = %err, "external-media udp sink receive error");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shuts_down_promptly_on_cancellation() {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run(shutdown.clone()));
        shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("sink should shut down promptly")
            .expect("sink task should not panic");
    }
}
