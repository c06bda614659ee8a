mod build;
mod install;
mod resolve;

pub use build::cmd_build;
pub use install::cmd_install;
pub use resolve::cmd_resolve;
