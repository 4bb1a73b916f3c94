pub mod bluetooth;
pub mod camera;
pub mod logging;
pub mod ocr;
pub mod permissions;
pub mod process;
pub mod webhook;
pub mod worker;
