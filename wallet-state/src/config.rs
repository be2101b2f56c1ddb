use std::path::PathBuf;

/// On-disk location and tuning knobs for a [`crate::Store`]'s `sled`
/// database.
///
/// Mirrors the shape of the (unretrieved but referenced) teacher
/// `zebra_state::Config`: a path plus a builder method that turns it
/// into a `sled::Config`, so `Store::open`/`Store::create` never touch
/// `sled::Config` fields directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory the sled database lives in.
    pub path: PathBuf,

    /// Keep the database entirely in memory; useful for tests. When
    /// set, `path` is ignored.
    pub ephemeral: bool,
}

impl Config {
    pub fn persistent(path: impl Into<PathBuf>) -> Config {
        Config {
            path: path.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral() -> Config {
        Config {
            path: PathBuf::new(),
            ephemeral: true,
        }
    }

    pub(crate) fn sled_config(&self) -> sled::Config {
        let config = sled::Config::new().path(&self.path);
        if self.ephemeral {
            config.temporary(true)
        } else {
            config
        }
    }
}
