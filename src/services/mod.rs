pub mod dispatcher;
pub mod ingress;
pub mod metrics;
pub mod webhook;
pub mod worker;
