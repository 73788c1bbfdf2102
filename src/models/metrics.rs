use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::status::AggregateStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_sent: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub by_status: BTreeMap<AggregateStatus, u64>,
}
