mod bot;
mod config;

use std::pin::pin;

use anyhow::{Result, bail};
use clap::Parser;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use bot::{Bot, Pattern};
use config::ClientConfig;
use ticksync::arena::{self, ArenaLevel, Tag};
use ticksync::net::{TcpConnection, read_frame, write_loop};
use ticksync::{Client, EventTarget};

#[derive(Parser)]
#[command(name = "ticksync-client")]
#[command(about = "Headless arena client")]
struct Args {
    #[arg(
        short,
        long,
        default_value = "127.0.0.1:27015",
        help = "Server address to connect to"
    )]
    server: String,

    #[arg(short, long, default_value = "bot")]
    name: String,

    #[arg(short, long, value_enum, default_value_t = Pattern::Circle)]
    pattern: Pattern,

    #[arg(long, help = "Attempt a tag every N ticks")]
    tag_every: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ClientConfig {
        server: args.server,
        name: args.name,
        pattern: args.pattern,
        tag_every: args.tag_every.filter(|&n| n > 0),
    };
    run(config).await
}

async fn run(config: ClientConfig) -> Result<()> {
    let stream = TcpStream::connect(&config.server).await?;
    stream.set_nodelay(true)?;
    log::info!("Connected to {} as \"{}\"", config.server, config.name);

    let (mut reader, writer) = stream.into_split();
    let (outbound, queued) = mpsc::unbounded_channel();
    tokio::spawn(write_loop(writer, queued));

    let mut client = Client::new(
        config.name.clone(),
        arena::protocol(),
        Box::new(ArenaLevel::new()),
        Box::new(Bot::new(config.pattern)),
    );
    client.on_connected(Box::new(TcpConnection::new(outbound)));

    let mut shutdown = pin!(tokio::signal::ctrl_c());
    let mut last_tick = 0;

    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(Some(frame)) => {
                    // Failures are logged by the client.
                    let _ = client.on_message(&frame);
                }
                Ok(None) => {
                    log::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    log::warn!("Connection lost: {}", e);
                    break;
                }
            },
            _ = &mut shutdown => break,
        }

        if let Some(reason) = client.rejection().map(str::to_owned) {
            client.on_close();
            bail!("join rejected: {reason}");
        }

        let full_tick = client.context().clock().full();
        if full_tick != last_tick {
            last_tick = full_tick;
            on_tick(&mut client, &config, full_tick);
        }
    }

    client.on_close();
    Ok(())
}

fn on_tick(client: &mut Client, config: &ClientConfig, full_tick: u64) {
    let Some(entity) = client.controlled_entity() else {
        return;
    };

    if let Some(every) = config.tag_every
        && full_tick % every == 0
    {
        client.send_event(EventTarget::Entity, &Tag);
    }

    let tick_rate = u64::from(client.context().config().tick_rate);
    if full_tick % tick_rate == 0
        && let Ok(walker) = client.context().entity(entity)
    {
        let state = walker.state();
        log::info!(
            "tick {} at ({:.2}, {:.2}) heading {:.2}, rtt {} ms",
            full_tick,
            state.position.x,
            state.position.y,
            state.heading,
            client.round_trip()
        );
    }
}
