pub mod app;
pub mod timing;
pub mod utils;

pub mod debugging;
