use crate::bot::Pattern;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: String,
    pub name: String,
    pub pattern: Pattern,
    /// Try to tag someone every this many ticks.
    pub tag_every: Option<u64>,
}
