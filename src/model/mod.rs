pub mod device;
pub mod objection;
pub mod rfi;
pub mod user;
