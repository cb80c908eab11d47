use std::collections::HashMap;
use std::pin::pin;
use std::time::Instant;

use tokio::sync::mpsc;

use ticksync::arena::{self, ArenaLevel};
use ticksync::{Connection, ConnectionId, DelayedConnection, Schedule, Server, TickScheduler};

use crate::config::ServerConfig;
use crate::net::NetEvent;
use crate::rules;

pub struct GameServer {
    server: Server,
    scheduler: TickScheduler,
    sockets: HashMap<u64, ConnectionId>,
    delay_ms: u32,
    delay_ticks: u32,
}

impl GameServer {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let server = Server::new(
            config.game,
            arena::protocol(),
            Box::new(ArenaLevel::new()),
        )?;
        Ok(Self {
            server,
            scheduler: TickScheduler::new(config.game.tick_rate),
            sockets: HashMap::new(),
            delay_ms: config.delay_ms,
            delay_ticks: config.delay_ticks(),
        })
    }

    /// Runs until ctrl-c. Socket events are handled before every scheduler
    /// poll so no message is interleaved with a step.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<NetEvent>) {
        let mut shutdown = pin!(tokio::signal::ctrl_c());

        loop {
            while let Ok(event) = events.try_recv() {
                self.handle(event);
            }
            rules::apply(&mut self.server);

            match self.scheduler.poll(Instant::now()) {
                Schedule::Tick => self.server.step(),
                Schedule::Spin => tokio::task::yield_now().await,
                Schedule::Sleep(duration) => {
                    tokio::select! {
                        _ = tokio::time::sleep(duration) => {}
                        event = events.recv() => match event {
                            Some(event) => self.handle(event),
                            None => break,
                        },
                        _ = &mut shutdown => break,
                    }
                }
            }
        }

        log::info!("Shutting down");
        self.server.shutdown();
    }

    fn handle(&mut self, event: NetEvent) {
        match event {
            NetEvent::Connected { key, address, link } => {
                let (link, address): (Box<dyn Connection>, String) = if self.delay_ticks > 0 {
                    (
                        Box::new(DelayedConnection::new(link, self.delay_ticks)),
                        format!("{} (+{}ms)", address, self.delay_ms),
                    )
                } else {
                    (Box::new(link), address.to_string())
                };
                let connection = self.server.on_connection(link, address);
                self.sockets.insert(key, connection);
            }
            NetEvent::Frame { key, frame } => {
                if let Some(&connection) = self.sockets.get(&key) {
                    // Failures are logged by the server.
                    let _ = self.server.on_message(connection, &frame);
                }
            }
            NetEvent::Closed { key, reason } => {
                if let Some(connection) = self.sockets.remove(&key) {
                    self.server.on_close(connection, &reason);
                }
            }
        }
    }
}
