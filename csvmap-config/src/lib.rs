use envconfig::Envconfig;
use lazy_static::lazy_static;

#[derive(Debug, Clone, Envconfig)]
pub struct Config {
    #[envconfig(from = "CSVMAP_LOG_LEVEL", default = "info")]
    pub log_level: String,
    /// How duplicate column names in the header row are resolved: `last_wins` or `reject`.
    #[envconfig(from = "CSVMAP_DUPLICATE_HEADERS", default = "last_wins")]
    pub duplicate_headers: String,
    //Read buffer size in bytes
    #[envconfig(from = "CSVMAP_BUFFER_CAPACITY", default = "8192")]
    pub buffer_capacity: usize,
}

impl Config {
    pub fn init() -> Config {
        Config::init_from_env().expect("Failed to load config")
    }

    pub fn try_init() -> Result<Config, envconfig::Error> {
        Config::init_from_env()
    }
}

lazy_static! {
    pub static ref CONFIG: Config = Config::init();
}
