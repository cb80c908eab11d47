use ticksync::GameConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub delay_ms: u32,
    pub game: GameConfig,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Server steps each outgoing frame is held back for.
    pub fn delay_ticks(&self) -> u32 {
        self.game.ticks_for_ms(self.delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_converted_to_server_steps() {
        let mut config = ServerConfig {
            bind: "127.0.0.1".to_owned(),
            port: ticksync::DEFAULT_PORT,
            delay_ms: 0,
            game: GameConfig::default(),
        };
        assert_eq!(config.delay_ticks(), 0);

        config.game.tick_rate = 10;
        config.delay_ms = 250;
        assert_eq!(config.delay_ticks(), 3);
        assert_eq!(config.address(), format!("127.0.0.1:{}", ticksync::DEFAULT_PORT));
    }
}
