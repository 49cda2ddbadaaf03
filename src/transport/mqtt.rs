//! MQTT transport (§6). Grounded on `rumqttc`'s `AsyncClient`/`EventLoop` split and its
//! `Event::Incoming(Packet::Publish(..))` polling loop, generalized from a single
//! broker-wide client (the CSMS doesn't dial one client per charger — it authenticates to
//! the broker itself and receives every charger's traffic on a wildcard subscription) to
//! OCPP's per-charger CALL/CALLRESULT semantics, and to a transport where "connected" is
//! synthesized from traffic rather than a handshake.
//!
//! Topic convention: chargers publish CALLs on `{type_code}/{serial}/user/up` and the CSMS
//! publishes CALLs/responses on `{type_code}/{serial}/user/down`; the charger id used
//! throughout the rest of the core is the serial (see [`crate::domain::Device`]).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tracing::{error, warn};

use crate::codec::OcppFrame;
use crate::config::MqttConfig;
use crate::router::Router;
use crate::support::errors::CsmsError;
use crate::transport::{InboundQueue, OutboundChannel};

const UP_SUFFIX: &str = "/user/up";
const DOWN_SUFFIX: &str = "/user/down";

fn qos_from(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// Publishes server-initiated CALLs and CALL replies back down `{type_code}/{serial}/user/down`.
struct MqttChannel {
    client: AsyncClient,
    down_topic: String,
    qos: QoS,
}

#[async_trait]
impl OutboundChannel for MqttChannel {
    async fn send(&self, frame: &OcppFrame) -> Result<(), CsmsError> {
        self.client
            .publish(&self.down_topic, self.qos, false, frame.serialize_mqtt())
            .await
            .map_err(|e| CsmsError::Transport(e.to_string()))
    }

    async fn close(&self) {}
}

/// Parses `{type_code}/{serial}/user/up` into `(type_code, serial)`. The serial doubles as
/// the charger id used by `Router`/`Session`/`Store`.
fn parse_up_topic(topic: &str) -> Option<(&str, &str)> {
    let rest = topic.strip_suffix(UP_SUFFIX)?;
    let (type_code, serial) = rest.split_once('/')?;
    if type_code.is_empty() || serial.is_empty() {
        return None;
    }
    Some((type_code, serial))
}

fn down_topic(type_code: &str, serial: &str) -> String {
    format!("{type_code}/{serial}{DOWN_SUFFIX}")
}

/// Runs the MQTT transport until the connection is closed for good (rumqttc retries
/// transient network errors internally via its event loop; this only returns on a
/// configuration-level failure).
pub async fn run(config: MqttConfig, offline_timeout: Duration, inbound_buffer_depth: usize, router: Arc<Router>) {
    let stripped = config
        .broker_url
        .trim_start_matches("mqtt://")
        .trim_start_matches("tcp://");
    let mut parts = stripped.splitn(2, ':');
    let host = parts.next().unwrap_or("127.0.0.1").to_string();
    let port: u16 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1883);

    let mut opts = MqttOptions::new("csms-core", host, port);
    opts.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(opts, 256);
    let qos = qos_from(config.qos);

    if let Err(e) = client.subscribe("+/+/user/up", qos).await {
        error!(error = %e, "failed to subscribe to MQTT uplink topics");
        return;
    }

    // Per-charger down-topic cache so inbound CALLs from chargers we haven't seen before
    // get an `OutboundChannel` wired up without a round trip through the broker.
    let known_down_topics: DashMap<String, String> = DashMap::new();
    let last_seen: Arc<DashMap<String, Instant>> = Arc::new(DashMap::new());

    // One shared bounded buffer ahead of `Router::on_inbound` (§5) — the broker connection
    // is itself the only "channel" MQTT has, so this bounds the whole transport rather than
    // one per charger.
    let queue: Arc<InboundQueue<(String, OcppFrame)>> = Arc::new(InboundQueue::new(inbound_buffer_depth));
    {
        let router = router.clone();
        let queue = queue.clone();
        tokio::spawn(async move {
            loop {
                let (charger_id, frame) = queue.pop().await;
                if let Some(reply) = router.on_inbound(&charger_id, frame).await {
                    if let Some(session) = router.session(&charger_id) {
                        let _ = session.send_direct(&reply).await;
                    }
                }
            }
        });
    }

    {
        let router = router.clone();
        let last_seen = last_seen.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(offline_timeout / 2);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let stale: Vec<String> = last_seen
                    .iter()
                    .filter(|e| now.duration_since(*e.value()) >= offline_timeout)
                    .map(|e| e.key().clone())
                    .collect();
                for charger_id in stale {
                    last_seen.remove(&charger_id);
                    router.on_disconnected(&charger_id).await;
                }
            }
        });
    }

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Some((type_code, serial)) = parse_up_topic(&publish.topic) else {
                    warn!(topic = publish.topic.as_str(), "MQTT publish on unrecognized topic shape");
                    continue;
                };
                let charger_id = serial.to_string();

                let payload = match std::str::from_utf8(&publish.payload) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(charge_point_id = charger_id.as_str(), error = %e, "non-UTF8 MQTT payload");
                        continue;
                    }
                };

                let first_seen = last_seen.insert(charger_id.clone(), Instant::now()).is_none();
                if first_seen {
                    let down = known_down_topics
                        .entry(charger_id.clone())
                        .or_insert_with(|| down_topic(type_code, serial))
                        .clone();
                    let channel: Arc<dyn OutboundChannel> =
                        Arc::new(MqttChannel { client: client.clone(), down_topic: down, qos });
                    router.on_connected(&charger_id, channel).await;
                }

                match OcppFrame::parse_mqtt(payload) {
                    Ok(frame) => {
                        router.clear_decode_failures(&charger_id);
                        if queue.push((charger_id.clone(), frame)).await.is_some() {
                            warn!(charge_point_id = charger_id.as_str(), "inbound buffer full, dropped oldest frame");
                        }
                    }
                    Err(e) => {
                        warn!(charge_point_id = charger_id.as_str(), error = %e, "malformed OCPP MQTT frame");
                        if router.on_decode_failure(&charger_id, e.to_string()).await {
                            warn!(charge_point_id = charger_id.as_str(), "synthesizing disconnect after repeated decode failures");
                            last_seen.remove(&charger_id);
                            router.on_disconnected(&charger_id).await;
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "MQTT event loop error, rumqttc will reconnect");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_up_topic() {
        assert_eq!(parse_up_topic("AC22/SN12345/user/up"), Some(("AC22", "SN12345")));
        assert_eq!(parse_up_topic("garbage"), None);
        assert_eq!(parse_up_topic("/user/up"), None);
    }

    #[test]
    fn builds_down_topic() {
        assert_eq!(down_topic("AC22", "SN12345"), "AC22/SN12345/user/down");
    }
}
