use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::store::{
    AttendanceFilter, AttendancePage, AttendanceRecord, AttendanceStore, CheckOutPatch,
    NewCheckIn, OpenOutcome,
};
use crate::error::AttendanceError;

/// In-memory `AttendanceStore`. The single mutex makes every call atomic.
#[derive(Default)]
pub struct FakeAttendanceStore {
    pub records: Mutex<Vec<AttendanceRecord>>,
    pub next_id: AtomicU64,
    pub fail_writes: AtomicBool,
}

impl FakeAttendanceStore {
    pub fn snapshot(&self) -> Vec<AttendanceRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn open_count(&self, employee_id: u64) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.employee_id == employee_id && r.is_open())
            .count()
    }

    fn check_writable(&self) -> Result<(), AttendanceError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(AttendanceError::Storage("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for FakeAttendanceStore {
    async fn open_session(
        &self,
        new: NewCheckIn,
        exclusive: bool,
    ) -> Result<OpenOutcome, AttendanceError> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();

        if exclusive {
            if let Some(open) = records
                .iter()
                .rev()
                .find(|r| r.employee_id == new.employee_id && r.is_open())
            {
                return Ok(OpenOutcome::AlreadyOpen(open.clone()));
            }
        }

        let record = AttendanceRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            employee_id: new.employee_id,
            check_in: new.at,
            check_out: None,
            in_location: new.location,
            out_location: None,
            in_selfie: new.selfie,
            out_selfie: None,
            status: Some(new.status),
            is_outside_zone: new.is_outside_zone,
        };
        records.push(record.clone());
        Ok(OpenOutcome::Opened(record))
    }

    async fn close_latest_open(
        &self,
        employee_id: u64,
        patch: CheckOutPatch,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();

        let Some(record) = records
            .iter_mut()
            .rev()
            .find(|r| r.employee_id == employee_id && r.is_open())
        else {
            return Ok(None);
        };

        if patch.at < record.check_in {
            return Err(AttendanceError::validation(
                "Check-out time precedes check-in time",
            ));
        }

        record.check_out = Some(patch.at);
        record.out_location = patch.location;
        record.out_selfie = patch.selfie;
        record.is_outside_zone |= patch.outside_zone;
        Ok(Some(record.clone()))
    }

    async fn recent(
        &self,
        employee_id: u64,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.employee_id == employee_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &AttendanceFilter) -> Result<AttendancePage, AttendanceError> {
        let records = self.records.lock().unwrap();
        let matching: Vec<_> = records
            .iter()
            .rev()
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| filter.outside_zone.is_none_or(|flag| r.is_outside_zone == flag))
            .filter(|r| filter.date.is_none_or(|d| r.check_in.date() == d))
            .cloned()
            .collect();

        Ok(AttendancePage {
            total: matching.len() as i64,
            records: matching
                .into_iter()
                .skip(filter.offset as usize)
                .take(filter.limit as usize)
                .collect(),
        })
    }
}
