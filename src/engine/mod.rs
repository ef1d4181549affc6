pub mod due_date;
pub mod instantiate;
pub mod objection;
pub mod outbox;
pub mod scoring;
pub mod service;
pub mod state_machine;
pub mod trigger;
