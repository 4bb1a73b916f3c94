pub mod hid;
pub mod models;
pub mod notice;
pub mod peripheral;
pub mod screen;
pub mod serial;
pub mod settings;
