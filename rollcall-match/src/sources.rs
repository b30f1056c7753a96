//! Record sources feeding a reconciliation run
//!
//! Sources must be fully materialized before matching begins; a load error
//! fails the whole run.

use crate::models::{AttendeeRecord, MenteeRecord};
use async_trait::async_trait;
use rollcall_common::Result;

/// Supplies the roster in a stable order
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn load(&self) -> Result<Vec<MenteeRecord>>;
}

/// Supplies session-call attendance records
#[async_trait]
pub trait AttendeeSource: Send + Sync {
    async fn load(&self) -> Result<Vec<AttendeeRecord>>;
}

#[async_trait]
impl RosterSource for Vec<MenteeRecord> {
    async fn load(&self) -> Result<Vec<MenteeRecord>> {
        Ok(self.clone())
    }
}

#[async_trait]
impl AttendeeSource for Vec<AttendeeRecord> {
    async fn load(&self) -> Result<Vec<AttendeeRecord>> {
        Ok(self.clone())
    }
}
