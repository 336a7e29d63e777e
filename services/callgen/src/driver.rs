//! Call driver (component G): admission-controlled origination loop plus the
//! per-call state machine that rides on top of the ARI client runtime.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ari_client::{AnyEntity, AriClient, Channel, EntityKind, Event, EventType};
use rand::Rng;
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::CallsConfig;

const EXTERNAL_MEDIA_HOST: &str = "127.0.0.1:55444";
const EXTERNAL_MEDIA_FORMAT: &str = "slin16";
const ORIGINATE_TIMEOUT_SECONDS: i64 = 30;
const ROBOT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Running counters the driver accumulates across every call, printed as the
/// final statistics block on shutdown.
#[derive(Default)]
pub struct Stats {
    pub sent_calls: AtomicU64,
    pub answered: AtomicU64,
    pub bridge_created: AtomicU64,
    pub channel_added: AtomicU64,
    pub playback_started: AtomicU64,
    pub playback_finished: AtomicU64,
    pub finished: AtomicU64,
}

impl Stats {
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("answered", self.answered.load(Ordering::SeqCst)),
            ("bridge_created", self.bridge_created.load(Ordering::SeqCst)),
            ("channel_added", self.channel_added.load(Ordering::SeqCst)),
            ("playback_started", self.playback_started.load(Ordering::SeqCst)),
            ("playback_finished", self.playback_finished.load(Ordering::SeqCst)),
            ("finished", self.finished.load(Ordering::SeqCst)),
        ]
    }
}

/// Composes the dial string ARI originates against. `driver == "PJSIP"`
/// collapses to the `PJSIP/{phone}@{trunk}` shorthand; every other driver
/// name uses the generic `{driver}/{trunk}/{phone}` channel spec.
pub fn dial_string(driver: &str, trunk: &str, phone: &str) -> String {
    if driver.eq_ignore_ascii_case("PJSIP") {
        format!("PJSIP/{phone}@{trunk}")
    } else {
        format!("{driver}/{trunk}/{phone}")
    }
}

/// 20-character mixed-case call identifier used to namespace a call's
/// derived resources (recording name, robot channel id, callback tokens).
pub fn random_call_id() -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    (0..20).map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char).collect()
}

/// `Local/x`, `Snoop/x`, `UnicastRTP/x` channels never start a call; only
/// channels created by the trunks this driver dials out on do.
fn is_callable_protocol(protocol: &str) -> bool {
    matches!(protocol, "PJSIP" | "SIP")
}

pub struct CallDriver {
    client: Arc<AriClient>,
    config: CallsConfig,
    sounds_dir: String,
    semaphore: Arc<Semaphore>,
    stats: Arc<Stats>,
    next_channel_id: AtomicU32,
    shutdown: CancellationToken,
}

impl CallDriver {
    pub fn new(client: Arc<AriClient>, config: CallsConfig, sounds_dir: String, shutdown: CancellationToken) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(config.count as usize));
        let driver = Arc::new(CallDriver {
            client,
            config,
            sounds_dir,
            semaphore,
            stats: Arc::new(Stats::default()),
            next_channel_id: AtomicU32::new(1),
            shutdown,
        });
        driver.register_stasis_start_handler();
        driver
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    /// Registers the always-on class-level `StasisStart` handler that gates
    /// new channels by protocol and kicks off the per-call state machine.
    fn register_stasis_start_handler(self: &Arc<Self>) {
        let driver = self.clone();
        let cb: ari_client::ClassCallback = Arc::new(move |_client, event| {
            let Event::StasisStart(e) = event else { return };
            let protocol = e.channel.protocol();
            if !is_callable_protocol(&protocol) {
                debug!(channel_id = %e.channel.id, protocol, "ignoring non-callable channel");
                return;
            }
            let driver = driver.clone();
            let channel = e.channel.clone();
            tokio::spawn(async move { driver.run_call(channel).await });
        });
        self.client.register_class_callback(EventType::new("StasisStart"), "callgen-stasis-start", cb);
    }

    /// Admission-controlled origination loop. Runs until `shutdown` fires.
    pub async fn run_origination_loop(self: Arc<Self>) {
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            let permit = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return,
                permit = self.semaphore.clone().acquire_owned() => permit,
            };
            let Ok(permit) = permit else { return };

            let driver = self.clone();
            tokio::spawn(async move {
                driver.originate_one(permit).await;
            });
        }
    }

    async fn originate_one(self: Arc<Self>, permit: tokio::sync::OwnedSemaphorePermit) {
        let channel_id = self.next_channel_id.fetch_add(1, Ordering::SeqCst).to_string();
        let dial = dial_string(&self.config.driver, &self.config.trunk, &self.config.phone);

        match self
            .client
            .create_channel(&channel_id, &dial, &self.config.callerid, ORIGINATE_TIMEOUT_SECONDS)
            .await
        {
            Ok(channel) => {
                self.stats.sent_calls.fetch_add(1, Ordering::SeqCst);
                // Forget the permit: capacity is restored only when this
                // channel is torn down (ChannelDestroyed), never earlier.
                //
                // Registered class-level rather than per-entity: StasisEnd is
                // also a finish event for Channel and fires first, evicting
                // every per-entity callback keyed to this channel id before
                // ChannelDestroyed ever arrives. A class callback survives
                // that eviction, so it filters on the channel id itself and
                // removes itself once it fires.
                permit.forget();
                let semaphore = self.semaphore.clone();
                let released_channel_id = channel.id.clone();
                let token = format!("callgen-release-permit-{}", channel.id);
                let token_for_removal = token.clone();
                let cb: ari_client::ClassCallback = Arc::new(move |client, event| {
                    let Event::ChannelDestroyed(e) = event else { return };
                    if e.channel.id != released_channel_id {
                        return;
                    }
                    semaphore.add_permits(1);
                    client.remove_class_callback(&EventType::new("ChannelDestroyed"), &token_for_removal);
                });
                self.client.register_class_callback(EventType::new("ChannelDestroyed"), token, cb);
            }
            Err(err) => {
                warn!(channel_id, error = %err, "create_channel failed, releasing admission permit");
                drop(permit);
            }
        }
    }

    /// Per-call state machine: answer -> bridge -> record -> snoop ->
    /// external-media -> play -> teardown.
    async fn run_call(self: Arc<Self>, channel: Arc<Channel>) {
        let call_id = random_call_id();
        let client = self.client.clone();
        let stats = self.stats.clone();
        info!(channel_id = %channel.id, call_id, "starting call state machine");

        if let Err(err) = client.answer(&channel.id).await {
            error!(channel_id = %channel.id, error = %err, "answer failed, abandoning call");
            return;
        }
        stats.answered.fetch_add(1, Ordering::SeqCst);

        let sound_bridge = match client.create_bridge("mixing").await {
            Ok(b) => b,
            Err(err) => {
                error!(channel_id = %channel.id, error = %err, "create_bridge (sound) failed");
                return;
            }
        };
        stats.bridge_created.fetch_add(1, Ordering::SeqCst);

        if let Err(err) = client.add_to_bridge(&sound_bridge.id, &channel.id).await {
            error!(channel_id = %channel.id, error = %err, "add_to_bridge (sound) failed");
            return;
        }
        stats.channel_added.fetch_add(1, Ordering::SeqCst);

        if let Err(err) = client.record_bridge(&sound_bridge.id, &format!("test_{call_id}")).await {
            warn!(channel_id = %channel.id, error = %err, "record_bridge failed, continuing");
        }

        let media_bridge = match client.create_bridge("mixing").await {
            Ok(b) => b,
            Err(err) => {
                error!(channel_id = %channel.id, error = %err, "create_bridge (media) failed");
                return;
            }
        };

        let snoop_channel = match client.start_snoop(&channel.id, "in").await {
            Ok(s) => s,
            Err(err) => {
                error!(channel_id = %channel.id, error = %err, "start_snoop failed");
                return;
            }
        };
        channel.push_snoop_channel(snoop_channel.id.clone());

        let robot_id = format!("robot_{call_id}");
        let robot_channel = match self.await_robot_join(&robot_id, &channel.id).await {
            Some(c) => c,
            None => {
                error!(channel_id = %channel.id, robot_id, "robot channel never entered stasis, abandoning call");
                return;
            }
        };

        if let Err(err) = client.add_to_bridge(&media_bridge.id, &snoop_channel.id).await {
            warn!(channel_id = %channel.id, error = %err, "add_to_bridge (snoop into media) failed");
        }
        if let Err(err) = client.add_to_bridge(&media_bridge.id, &robot_channel.id).await {
            warn!(channel_id = %channel.id, error = %err, "add_to_bridge (robot into media) failed");
        }

        let playback = match client
            .play_bridge(&sound_bridge.id, &format!("sound:{}/mid_sound", self.sounds_dir))
            .await
        {
            Ok(p) => p,
            Err(err) => {
                error!(channel_id = %channel.id, error = %err, "play_bridge failed");
                return;
            }
        };
        stats.playback_started.fetch_add(1, Ordering::SeqCst);

        self.register_playback_finished_teardown(
            &playback.id,
            TeardownTargets {
                channel_id: channel.id.clone(),
                snoop_channel_id: snoop_channel.id.clone(),
                robot_channel_id: robot_channel.id.clone(),
                sound_bridge_id: sound_bridge.id.clone(),
                media_bridge_id: media_bridge.id.clone(),
            },
        );
    }

    /// Registers a one-shot `StasisStart` class callback scoped to
    /// `robot_id`, issues `external_media`, and waits for the robot
    /// pseudo-channel to actually enter Stasis (or times out).
    async fn await_robot_join(&self, robot_id: &str, originating_channel_id: &str) -> Option<Arc<Channel>> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let token = format!("callgen-robot-join-{robot_id}");
        let robot_id_owned = robot_id.to_owned();
        let client = self.client.clone();
        let token_for_removal = token.clone();

        let cb: ari_client::ClassCallback = Arc::new(move |client, event| {
            let Event::StasisStart(e) = event else { return };
            if e.channel.id != robot_id_owned {
                return;
            }
            if let Some(sender) = tx.lock().expect("lock poisoned").take() {
                let _ = sender.send(e.channel.clone());
            }
            client.remove_class_callback(&EventType::new("StasisStart"), &token_for_removal);
        });
        client.register_class_callback(EventType::new("StasisStart"), token, cb);

        if let Err(err) = client
            .external_media(robot_id, EXTERNAL_MEDIA_HOST, EXTERNAL_MEDIA_FORMAT)
            .await
        {
            error!(channel_id = originating_channel_id, error = %err, "external_media failed");
            return None;
        }

        match tokio::time::timeout(ROBOT_JOIN_TIMEOUT, rx).await {
            Ok(Ok(channel)) => Some(channel),
            _ => None,
        }
    }

    fn register_playback_finished_teardown(&self, playback_id: &str, targets: TeardownTargets) {
        let client = self.client.clone();
        let stats = self.stats.clone();
        let token = format!("callgen-playback-finished-{playback_id}");

        let cb: ari_client::EntityCallback = Arc::new(move |_client, _event, entity| {
            let AnyEntity::Playback(_) = entity else { return };
            stats.playback_finished.fetch_add(1, Ordering::SeqCst);
            let client = client.clone();
            let stats = stats.clone();
            let targets = targets.clone();
            tokio::spawn(async move {
                teardown_call(&client, &targets).await;
                stats.finished.fetch_add(1, Ordering::SeqCst);
            });
        });

        self.client.register_entity_callback(
            EventType::new("PlaybackFinished"),
            EntityKind::Playback,
            playback_id.to_owned(),
            token,
            cb,
        );
    }
}

#[derive(Clone)]
struct TeardownTargets {
    channel_id: String,
    snoop_channel_id: String,
    robot_channel_id: String,
    sound_bridge_id: String,
    media_bridge_id: String,
}

async fn teardown_call(client: &AriClient, targets: &TeardownTargets) {
    for channel_id in [&targets.channel_id, &targets.snoop_channel_id, &targets.robot_channel_id] {
        if let Err(err) = client.close_channel(channel_id).await {
            debug!(channel_id, error = %err, "close_channel failed during teardown");
        }
    }
    for bridge_id in [&targets.sound_bridge_id, &targets.media_bridge_id] {
        if let Err(err) = client.close_bridge(bridge_id).await {
            debug!(bridge_id, error = %err, "close_bridge failed during teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dial_string_pjsip_uses_at_shorthand() {
        assert_eq!(dial_string("PJSIP", "local", "79000000004"), "PJSIP/79000000004@local");
    }

    #[test]
    fn dial_string_other_driver_uses_slash_form() {
        assert_eq!(dial_string("SIP", "local", "79000000004"), "SIP/local/79000000004");
    }

    #[test]
    fn protocol_gate_allows_only_pjsip_and_sip() {
        assert!(is_callable_protocol("PJSIP"));
        assert!(is_callable_protocol("SIP"));
        assert!(!is_callable_protocol("Local"));
        assert!(!is_callable_protocol("Snoop"));
        assert!(!is_callable_protocol("UnicastRTP"));
    }

    #[test]
    fn random_call_id_is_twenty_ascii_letters() {
        let id = random_call_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphabetic()));
    }
}
