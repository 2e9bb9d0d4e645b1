pub mod fake_fleet;
pub mod fake_storage;
pub mod prompts;
