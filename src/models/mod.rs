mod appointment;
mod availability;
mod business;
mod config;
mod duration;
mod service;
mod slot;

pub use appointment::*;
pub use availability::*;
pub use business::*;
pub use config::*;
pub use duration::*;
pub use service::*;
pub use slot::*;
