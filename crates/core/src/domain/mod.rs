pub mod analysis;
pub mod client;
pub mod context;
pub mod email;
pub mod outreach;
