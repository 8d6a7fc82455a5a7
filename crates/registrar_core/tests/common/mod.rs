//! Shared seeding helpers for integration suites.

use registrar_core::model::assignment::{Assignment, Submission};
use registrar_core::model::course::Course;
use registrar_core::model::principal::{Principal, Role};
use registrar_core::model::stored_file::StoredFile;
use registrar_core::repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
use registrar_core::repo::course_repo::{CourseRepository, SqliteCourseRepository};
use registrar_core::repo::file_repo::{FileRepository, SqliteFileRepository};
use registrar_core::repo::principal_repo::{PrincipalRepository, SqlitePrincipalRepository};
use registrar_core::{Actor, Enrollment, InlineDispatcher, LifecycleManager, RecordsService};
use rusqlite::Connection;

pub fn service(conn: &Connection) -> RecordsService<'_, InlineDispatcher<'_>> {
    RecordsService::new(conn, InlineDispatcher::new(conn))
}

pub fn seed_principal(conn: &Connection, role: Role, email: &str) -> Principal {
    let principal = Principal::new(role, email, "hash");
    SqlitePrincipalRepository::new(conn)
        .create(&principal)
        .expect("principal insert");
    principal
}

pub fn seed_admin(conn: &Connection) -> Actor {
    seed_principal(conn, Role::Admin, "admin@example.edu").actor()
}

pub fn seed_course(conn: &Connection, code: &str, credits: u8) -> Course {
    let course = Course::new(code, format!("Course {code}"), credits);
    SqliteCourseRepository::new(conn)
        .create(&course)
        .expect("course insert");
    course
}

pub fn seed_enrollment(conn: &Connection, student: &Principal, course: &Course) {
    SqliteCourseRepository::new(conn)
        .enroll(&Enrollment {
            student_id: student.uuid,
            course_id: course.uuid,
        })
        .expect("enrollment insert");
}

pub fn seed_faculty_primary(conn: &Connection, faculty: &Principal, course: &Course) {
    LifecycleManager::new(conn)
        .assign_faculty(course.uuid, faculty.uuid, true)
        .expect("faculty assignment");
}

pub fn seed_assignment(conn: &Connection, course: &Course, title: &str, max_marks: f64) -> Assignment {
    let assignment = Assignment::new(course.uuid, title, 1_000, max_marks);
    SqliteAssignmentRepository::new(conn)
        .create_assignment(&assignment)
        .expect("assignment insert");
    assignment
}

pub fn seed_submission(
    conn: &Connection,
    assignment: &Assignment,
    student: &Principal,
    submitted_at: i64,
) -> Submission {
    let submission = Submission::new(assignment.uuid, student.uuid, submitted_at);
    SqliteAssignmentRepository::new(conn)
        .create_submission(&submission)
        .expect("submission insert");
    submission
}

pub fn seed_assignment_with_file(
    conn: &Connection,
    course: &Course,
    title: &str,
    filename: &str,
) -> Assignment {
    let mut assignment = Assignment::new(course.uuid, title, 1_000, 10.0);
    assignment.filename = Some(filename.to_string());
    SqliteAssignmentRepository::new(conn)
        .create_assignment(&assignment)
        .expect("assignment insert");
    assignment
}

pub fn seed_submission_with_file(
    conn: &Connection,
    assignment: &Assignment,
    student: &Principal,
    filename: &str,
) -> Submission {
    let mut submission = Submission::new(assignment.uuid, student.uuid, 500);
    submission.filename = Some(filename.to_string());
    SqliteAssignmentRepository::new(conn)
        .create_submission(&submission)
        .expect("submission insert");
    submission
}

pub fn seed_file(conn: &Connection, owner: &Principal, filename: &str) {
    SqliteFileRepository::new(conn)
        .insert(&StoredFile::new(
            owner.uuid,
            filename,
            "application/pdf",
            vec![1, 2, 3],
        ))
        .expect("file insert");
}

pub fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).expect("count query")
}
