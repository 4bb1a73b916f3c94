pub mod app;
pub mod components;
pub mod controller;
pub mod theme;
pub mod views;
