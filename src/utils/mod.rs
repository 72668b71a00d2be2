pub mod config;
pub(crate) mod credsink_toml;
pub mod fd_limit;
pub mod logger;
pub mod passphrase;

pub use config::*;
pub use fd_limit::{FDS_PER_WORKER, max_open_fds, max_workers_by_fd_limit};
pub use logger::{Colors, setup_logging};
pub use passphrase::get_passphrase;
