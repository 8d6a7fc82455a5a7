mod common;

use common::{
    count, seed_admin, seed_assignment, seed_assignment_with_file, seed_course, seed_enrollment,
    seed_faculty_primary, seed_file, seed_principal, seed_submission, seed_submission_with_file,
    service,
};
use registrar_core::db::open_db_in_memory;
use registrar_core::{AttendanceEntry, AttendanceStatus, Role};

#[test]
fn deleting_a_course_removes_all_dependents_and_keeps_principals() {
    let conn = open_db_in_memory().unwrap();
    let admin = seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);
    seed_enrollment(&conn, &student, &course);
    let assignment = seed_assignment(&conn, &course, "Quiz 1", 10.0);
    seed_submission(&conn, &assignment, &student, 500);

    let svc = service(&conn);
    svc.mark_attendance_batch(
        faculty.actor(),
        course.uuid,
        "2024-03-01",
        &[AttendanceEntry {
            student_id: student.uuid,
            status: AttendanceStatus::Late,
        }],
    )
    .unwrap();

    let report = svc.delete_course(admin, course.uuid).unwrap();
    assert!(report.root_deleted);

    for table in [
        "courses",
        "assignments",
        "submissions",
        "enrollments",
        "faculty_assignments",
        "attendance_records",
    ] {
        assert_eq!(
            count(&conn, &format!("SELECT COUNT(*) FROM {table};")),
            0,
            "{table} not swept"
        );
    }
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM principals;"), 3);
}

#[test]
fn assigned_faculty_may_delete_their_own_course() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);

    let svc = service(&conn);
    let report = svc.delete_course(faculty.actor(), course.uuid).unwrap();
    assert!(report.root_deleted);
}

#[test]
fn unassigned_faculty_may_not_delete_a_course() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let outsider = seed_principal(&conn, Role::Faculty, "other@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);

    let svc = service(&conn);
    let err = svc.delete_course(outsider.actor(), course.uuid).unwrap_err();
    assert!(matches!(
        err,
        registrar_core::EngineError::Denied {
            reason: registrar_core::DenyReason::NotOwner
        }
    ));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM courses;"), 1);
}

#[test]
fn course_delete_sweeps_files_orphaned_by_its_assignments_and_submissions() {
    let conn = open_db_in_memory().unwrap();
    let admin = seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course_x = seed_course(&conn, "CS101", 3);
    let course_y = seed_course(&conn, "CS102", 4);
    seed_faculty_primary(&conn, &faculty, &course_x);
    seed_enrollment(&conn, &student, &course_x);

    let assignment = seed_assignment_with_file(&conn, &course_x, "Project", "brief.pdf");
    seed_submission_with_file(&conn, &assignment, &student, "essay.pdf");
    // Another course also references essay.pdf; it must survive the sweep.
    seed_assignment_with_file(&conn, &course_y, "Reading", "essay.pdf");

    seed_file(&conn, &faculty, "brief.pdf");
    seed_file(&conn, &student, "essay.pdf");
    seed_file(&conn, &faculty, "unrelated.pdf");

    let svc = service(&conn);
    svc.delete_course(admin, course_x.uuid).unwrap();

    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM stored_files WHERE filename = 'brief.pdf';"),
        0
    );
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM stored_files WHERE filename = 'essay.pdf';"),
        1
    );
    // Files nothing in the deleted course referenced are untouched.
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM stored_files WHERE filename = 'unrelated.pdf';"),
        1
    );
}

#[test]
fn second_course_delete_is_a_noop() {
    let conn = open_db_in_memory().unwrap();
    let admin = seed_admin(&conn);
    let course = seed_course(&conn, "CS101", 3);

    let svc = service(&conn);
    assert!(svc.delete_course(admin, course.uuid).unwrap().root_deleted);
    let second = svc.delete_course(admin, course.uuid).unwrap();
    assert!(!second.root_deleted);
    assert_eq!(second.rows_deleted, 0);
}
