//! Vendor bindings for real barrier controllers and cameras.

pub mod dahua;
pub mod gpio;
pub mod hikvision;
pub mod http;

pub use dahua::{DahuaBarrier, DahuaCamera};
pub use gpio::GpioBarrier;
pub use hikvision::{HikvisionBarrier, HikvisionCamera};
pub use http::{HttpBarrier, HttpCamera, HttpEndpoint};
