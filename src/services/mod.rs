pub mod cycle_list;
pub mod gesture_controller;
pub mod hotkeys;
pub mod preview;
pub mod service;
pub mod window_monitor;
pub mod window_system;

pub use cycle_list::CycleList;
pub use gesture_controller::{GestureController, GestureDeps};
pub use hotkeys::create_hotkey_backend;
pub use preview::TextPreview;
pub use service::{shutdown_channel, Service};
pub use window_monitor::WindowMonitor;
pub use window_system::create_window_system;
