mod config;
mod game;
mod net;
mod rules;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use config::ServerConfig;
use game::GameServer;
use ticksync::GameConfig;

#[derive(Parser)]
#[command(name = "ticksync-server")]
#[command(about = "Authoritative arena server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = ticksync::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = ticksync::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 8)]
    max_players: u32,

    #[arg(long, default_value_t = 10.0, help = "Maximum distance a player may move per tick")]
    max_speed: f32,

    #[arg(long, default_value_t = 40, help = "Ticks of state history kept for lag compensation")]
    history: u32,

    #[arg(long, default_value_t = 255)]
    max_entities: u32,

    #[arg(long, default_value_t = 0, help = "Artificial latency in ms added to every outgoing frame")]
    delay: u32,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            port: self.port,
            delay_ms: self.delay,
            game: GameConfig {
                tick_rate: self.tick_rate,
                max_players: self.max_players,
                max_player_speed: self.max_speed,
                max_state_buffer_size: self.history,
                max_entities: self.max_entities,
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    let mut game = GameServer::new(&config)?;

    let listener = TcpListener::bind(config.address()).await?;
    log::info!(
        "Server started on {} at {} Hz",
        listener.local_addr()?,
        config.game.tick_rate
    );
    if config.delay_ms > 0 {
        log::info!("Delaying outgoing frames by {} ms", config.delay_ms);
    }

    let (events, incoming) = mpsc::unbounded_channel();
    tokio::spawn(net::accept_loop(listener, events));

    game.run(incoming).await;
    Ok(())
}
