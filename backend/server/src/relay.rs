use protocol::{events::ServerEvent, id::ConnId};
use serde_json::Value;
use tracing::debug;

use crate::pairing::Matchmaker;

impl Matchmaker {
    /// Forwards `data` untouched to `to`, tagged with the sender. Unknown recipients are dropped.
    pub async fn relay(&self, from: ConnId, to: ConnId, data: Value) -> bool {
        let inner = self.inner.lock().await;

        let delivered = inner.registry.notify(to, ServerEvent::Signal { from, data });
        if !delivered {
            debug!("Signal from {from} to unknown {to} dropped");
        }

        #[cfg(feature = "verbose")]
        tracing::info!("Relayed signal {from} -> {to}: {delivered}");

        delivered
    }
}

#[cfg(test)]
mod tests {
    use protocol::events::Filters;
    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::fallback::FallbackConfig;

    use super::*;

    #[tokio::test]
    async fn test_relay_between_partners() {
        let mm = Matchmaker::new(FallbackConfig::default());
        let (tx_x, mut rx_x) = mpsc::unbounded_channel();
        let (tx_y, mut rx_y) = mpsc::unbounded_channel();
        let x = mm.connect(tx_x).await;
        let y = mm.connect(tx_y).await;
        mm.find_partner(x, &Filters::default()).await;
        mm.find_partner(y, &Filters::default()).await;
        while rx_y.try_recv().is_ok() {}

        let offer = json!({ "type": "offer", "sdp": "v=0\r\no=- 42 2 IN IP4 127.0.0.1" });
        assert!(mm.relay(x, y, offer.clone()).await);

        assert_eq!(
            rx_y.try_recv().unwrap(),
            ServerEvent::Signal { from: x, data: offer }
        );
        while let Ok(event) = rx_x.try_recv() {
            assert!(!matches!(event, ServerEvent::Signal { .. }));
        }
    }

    #[tokio::test]
    async fn test_relay_to_unknown_is_dropped() {
        let mm = Matchmaker::new(FallbackConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let x = mm.connect(tx).await;
        rx.try_recv().unwrap();

        assert!(!mm.relay(x, ConnId::new(), json!("candidate")).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_relay_after_disconnect() {
        let mm = Matchmaker::new(FallbackConfig::default());
        let (tx_x, _rx_x) = mpsc::unbounded_channel();
        let (tx_y, _rx_y) = mpsc::unbounded_channel();
        let x = mm.connect(tx_x).await;
        let y = mm.connect(tx_y).await;

        mm.disconnect(y).await;

        assert!(!mm.relay(x, y, Value::Null).await);
    }
}
