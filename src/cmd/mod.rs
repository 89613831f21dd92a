//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `watch`  | `Watch`          |
//! | `config` | `CheckConfig`    |

pub mod config;
pub mod watch;

pub use config::cmd_check_config;
pub use watch::cmd_watch;
