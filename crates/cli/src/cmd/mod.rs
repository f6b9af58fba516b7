pub mod compile;
pub mod profile;
pub mod settings;

mod batch;
mod history;
mod info;
mod install;
mod recent;
mod toolchains;

pub use batch::cmd_batch;
pub use compile::cmd_compile;
pub use history::cmd_history;
pub use info::cmd_info;
pub use install::cmd_install;
pub use recent::cmd_recent;
pub use toolchains::{cmd_probe, cmd_toolchains};
