pub mod config;
mod expand;
mod families;
mod install;
mod order;
mod packages;

pub use config::Config;
pub use expand::expand;
pub use families::families;
pub use install::install;
pub use order::order;
pub use packages::packages;
