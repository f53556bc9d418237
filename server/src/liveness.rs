//! Periodic liveness sweep.
//!
//! Silence longer than the short threshold marks a player disconnected and
//! pauses their match. Silence longer than the long threshold forfeits the
//! match to the opponent.

use crate::dispatcher::{forward, Outbox, Outgoing};
use crate::lobby::LobbyId;
use crate::world::World;
use log::{debug, info};
use shared::ServerPacket;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

impl World {
    /// Runs one sweep over every lobby and returns the resulting packets.
    pub fn sweep(&mut self, now: Instant) -> Outbox {
        let mut outbox = Outbox::new();
        let short = self.config.short_threshold;
        let long = self.config.long_threshold;

        for id in self.lobbies.ids() {
            let Some(lobby) = self.lobbies.get(id) else {
                continue;
            };
            let names: Vec<String> = lobby.occupants().map(str::to_string).collect();

            for name in &names {
                let gone_quiet = self
                    .sessions
                    .get(name)
                    .is_some_and(|s| s.is_connected() && s.is_timed_out(short, now));
                if gone_quiet {
                    info!("Player {} silent for over {:?}", name, short);
                    self.demote(name, now, &mut outbox);
                }
            }

            if !self.lobbies.get(id).is_some_and(|lobby| lobby.is_full()) {
                continue;
            }
            let forfeiter = names.iter().find(|name| match self.sessions.get(name.as_str()) {
                Some(session) => !session.is_connected() && session.is_timed_out(long, now),
                None => true,
            });
            if let Some(loser) = forfeiter.cloned() {
                self.forfeit(id, &loser, now, &mut outbox);
            }
        }

        debug!(
            "Sweep done: {} sessions, {} lobbies, {} packets queued",
            self.sessions.len(),
            self.lobbies.len(),
            outbox.len()
        );
        outbox
    }

    fn forfeit(&mut self, id: LobbyId, loser: &str, now: Instant, outbox: &mut Outbox) {
        let winner = self
            .lobbies
            .get(id)
            .and_then(|lobby| lobby.opponent_of(loser))
            .map(str::to_string);
        match self.sessions.get(loser).and_then(|s| s.away_for(now)) {
            Some(away) => info!("Player {} forfeits {} after {:?} away", loser, id, away),
            None => info!("Player {} forfeits {}", loser, id),
        }

        if let Some(winner) = winner {
            if let Some(addr) = self.sessions.connected_addr(&winner) {
                outbox.push(Outgoing::new(
                    addr,
                    ServerPacket::GameOver {
                        winner,
                        message: "Game Over! Opponent was disconnected for too long".to_string(),
                    },
                ));
            }
        }
        self.end_match(id);
    }
}

/// Spawns the task that sweeps the world every `sweep_interval` until
/// `cancel_token` fires.
///
/// Packets are queued while the world lock is still held, so they reach the
/// sender in the same order as the transitions that produced them.
pub fn spawn_supervisor(
    world: Arc<Mutex<World>>,
    outbound: mpsc::UnboundedSender<Outgoing>,
    sweep_interval: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(sweep_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Liveness supervisor started, sweeping every {:?}", sweep_interval);

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("Liveness supervisor shutting down");
                    break;
                }

                _ = tick.tick() => {
                    let mut guard = world.lock().await;
                    let outbox = guard.sweep(Instant::now());
                    if !forward(outbox, &outbound) {
                        break;
                    }
                }
            }
        }
    })
}
