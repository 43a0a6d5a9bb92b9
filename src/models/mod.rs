pub mod campaign;
pub mod recruiter;
