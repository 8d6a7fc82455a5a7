//! Attendance repository.
//!
//! # Invariants
//! - One row per (student, course, day).
//! - Day-level replacement is two idempotent steps (delete, insert batch)
//!   orchestrated by the lifecycle layer; this repository only exposes the
//!   steps.

use super::{parse_uuid, RepoResult};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::course::CourseId;
use crate::model::principal::PrincipalId;
use crate::repo::RepoError;
use rusqlite::{params, Connection, Row};

/// Present/total counters for one student in one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttendanceCounts {
    pub present: u32,
    pub total_marked: u32,
}

/// Repository interface for attendance rows.
pub trait AttendanceRepository {
    /// Removes every row for the (course, day) pair; returns removed count.
    fn delete_for_day(&self, course_id: CourseId, day: &str) -> RepoResult<usize>;
    fn insert_batch(&self, records: &[AttendanceRecord]) -> RepoResult<usize>;
    fn list_for_day(&self, course_id: CourseId, day: &str) -> RepoResult<Vec<AttendanceRecord>>;
    /// Present vs total marked days; `late` does not count as present.
    fn counts_for_student(
        &self,
        student_id: PrincipalId,
        course_id: CourseId,
    ) -> RepoResult<AttendanceCounts>;
}

/// SQLite-backed attendance repository.
pub struct SqliteAttendanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AttendanceRepository for SqliteAttendanceRepository<'_> {
    fn delete_for_day(&self, course_id: CourseId, day: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM attendance_records WHERE course_uuid = ?1 AND day = ?2;",
            params![course_id.to_string(), day],
        )?;
        Ok(changed)
    }

    fn insert_batch(&self, records: &[AttendanceRecord]) -> RepoResult<usize> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO attendance_records (student_uuid, course_uuid, day, status, marked_by)
             VALUES (?1, ?2, ?3, ?4, ?5);",
        )?;
        for record in records {
            record.validate()?;
            stmt.execute(params![
                record.student_id.to_string(),
                record.course_id.to_string(),
                record.day.as_str(),
                record.status.as_str(),
                record.marked_by.to_string(),
            ])?;
        }
        Ok(records.len())
    }

    fn list_for_day(&self, course_id: CourseId, day: &str) -> RepoResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT student_uuid, course_uuid, day, status, marked_by
             FROM attendance_records
             WHERE course_uuid = ?1 AND day = ?2
             ORDER BY student_uuid ASC;",
        )?;
        let mut rows = stmt.query(params![course_id.to_string(), day])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_attendance_row(row)?);
        }
        Ok(records)
    }

    fn counts_for_student(
        &self,
        student_id: PrincipalId,
        course_id: CourseId,
    ) -> RepoResult<AttendanceCounts> {
        let (present, total): (u32, u32) = self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN status = 'present' THEN 1 ELSE 0 END), 0),
                COUNT(*)
             FROM attendance_records
             WHERE student_uuid = ?1 AND course_uuid = ?2;",
            params![student_id.to_string(), course_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(AttendanceCounts {
            present,
            total_marked: total,
        })
    }
}

fn parse_attendance_row(row: &Row<'_>) -> RepoResult<AttendanceRecord> {
    let student_text: String = row.get("student_uuid")?;
    let course_text: String = row.get("course_uuid")?;
    let marker_text: String = row.get("marked_by")?;
    let status_text: String = row.get("status")?;
    let status = AttendanceStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in attendance_records.status"
        ))
    })?;

    Ok(AttendanceRecord {
        student_id: parse_uuid(&student_text, "attendance_records.student_uuid")?,
        course_id: parse_uuid(&course_text, "attendance_records.course_uuid")?,
        day: row.get("day")?,
        status,
        marked_by: parse_uuid(&marker_text, "attendance_records.marked_by")?,
    })
}
