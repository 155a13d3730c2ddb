mod loader;
mod schema;

pub use loader::{load_from_env, load_from_figment, load_from_path, validate, CONFIG_PATH_VAR, ENV_PREFIX};
pub use schema::{Config, LogFormat};
