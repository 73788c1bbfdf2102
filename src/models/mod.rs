pub mod health;
pub mod message;
pub mod metrics;
pub mod response;
pub mod retry;
pub mod status;
pub mod validation;
pub mod webhook;
