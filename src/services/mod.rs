pub mod batch_sender;
pub mod drip_scheduler;
pub mod email_dispatcher;
pub mod plan_catalog;
pub mod progress_service;
pub mod quota_gate;
pub mod recruiter_directory;
pub mod tick_job;
pub mod wave_clock;
