pub mod clock;
pub mod models;
pub mod retry;
pub mod settings;
pub mod state;
pub mod tracker;
