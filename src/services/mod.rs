pub mod logger;
pub mod opener;
pub mod platform;
