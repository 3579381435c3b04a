mod defaults;
mod deserialize;
mod resolve;
mod types;
mod util;

pub use self::defaults::parse_duration;
pub use self::resolve::{
    default_config_search_paths, load_config, minimal_config_template, parse_config,
    resolve_config_path, ConfigSource, CONFIG_ENV_VAR,
};
pub use self::types::{LogImageConfig, MediaGateConfig, XpackConfig, MAX_IMAGE_SIDE};
pub use self::util::expand_tilde;
