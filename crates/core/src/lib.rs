#![forbid(unsafe_code)]

pub mod countdown;
pub mod model;
pub mod settings;
pub mod time;

pub use settings::{QuizSettings, SettingsError};
pub use time::Clock;
