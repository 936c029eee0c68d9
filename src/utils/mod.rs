pub mod code;
pub mod format;
pub mod jwt;
