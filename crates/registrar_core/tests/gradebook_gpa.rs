mod common;

use common::{
    seed_admin, seed_assignment, seed_course, seed_enrollment, seed_faculty_primary,
    seed_principal, seed_submission, service,
};
use registrar_core::db::open_db_in_memory;
use registrar_core::model::assignment::SubmissionStatus;
use registrar_core::{EngineError, Role};

#[test]
fn gradebook_totals_count_graded_cells_only() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);
    seed_enrollment(&conn, &student, &course);

    let graded = seed_assignment(&conn, &course, "Quiz 1", 20.0);
    let ungraded = seed_assignment(&conn, &course, "Quiz 2", 50.0);
    let missing = seed_assignment(&conn, &course, "Quiz 3", 30.0);
    let graded_sub = seed_submission(&conn, &graded, &student, 500);
    seed_submission(&conn, &ungraded, &student, 600);

    let svc = service(&conn);
    svc.post_grade(faculty.actor(), graded_sub.uuid, 18.0, Some("good"))
        .unwrap();

    let gradebook = svc.compute_gradebook(faculty.actor(), course.uuid).unwrap();
    assert_eq!(gradebook.assignments.len(), 3);
    assert_eq!(gradebook.rows.len(), 1);

    let row = &gradebook.rows[0];
    // Quiz 2 is submitted but ungraded and Quiz 3 has no submission; neither
    // contributes to either side of the ratio.
    assert_eq!(row.total_earned, 18.0);
    assert_eq!(row.total_possible, 20.0);
    assert_eq!(row.average_percentage, 90.0);
    assert_eq!(row.letter_grade, "A-");

    let by_assignment = |id: uuid::Uuid| row.cells.iter().find(|c| c.assignment_id == id).unwrap();
    assert_eq!(by_assignment(graded.uuid).status, SubmissionStatus::Graded);
    assert_eq!(
        by_assignment(ungraded.uuid).status,
        SubmissionStatus::Submitted
    );
    assert_eq!(
        by_assignment(missing.uuid).status,
        SubmissionStatus::NotSubmitted
    );
}

#[test]
fn late_submission_is_flagged_until_graded() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);
    seed_enrollment(&conn, &student, &course);

    // Due at 1_000; handed in at 5_000.
    let assignment = seed_assignment(&conn, &course, "HW 1", 10.0);
    seed_submission(&conn, &assignment, &student, 5_000);

    let svc = service(&conn);
    let gradebook = svc.compute_gradebook(faculty.actor(), course.uuid).unwrap();
    assert_eq!(
        gradebook.rows[0].cells[0].status,
        SubmissionStatus::LateSubmitted
    );
}

#[test]
fn gpa_is_credit_weighted_across_courses() {
    let conn = open_db_in_memory().unwrap();
    let admin = seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");

    // Course A: 4 credits, average 95% -> 3.7 points.
    let course_a = seed_course(&conn, "CS101", 4);
    seed_faculty_primary(&conn, &faculty, &course_a);
    seed_enrollment(&conn, &student, &course_a);
    let a1 = seed_assignment(&conn, &course_a, "A1", 100.0);
    let sub_a = seed_submission(&conn, &a1, &student, 500);

    // Course B: 3 credits, average 87% -> 3.0 points.
    let course_b = seed_course(&conn, "CS102", 3);
    seed_faculty_primary(&conn, &faculty, &course_b);
    seed_enrollment(&conn, &student, &course_b);
    let b1 = seed_assignment(&conn, &course_b, "B1", 100.0);
    let sub_b = seed_submission(&conn, &b1, &student, 500);

    // Course C: enrolled, nothing graded. Contributes no credits.
    let course_c = seed_course(&conn, "CS103", 5);
    seed_enrollment(&conn, &student, &course_c);

    let svc = service(&conn);
    svc.post_grade(faculty.actor(), sub_a.uuid, 95.0, None).unwrap();
    svc.post_grade(faculty.actor(), sub_b.uuid, 87.0, None).unwrap();

    // (4 * 3.7 + 3 * 3.0) / 7 = 3.4
    let gpa = svc.overall_gpa(admin, student.uuid).unwrap();
    assert!((gpa - 3.4).abs() < 1e-9, "gpa was {gpa}");

    // The student reads their own GPA too.
    let own = svc.overall_gpa(student.actor(), student.uuid).unwrap();
    assert!((own - 3.4).abs() < 1e-9);
}

#[test]
fn gpa_with_no_graded_work_is_zero() {
    let conn = open_db_in_memory().unwrap();
    let admin = seed_admin(&conn);
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_enrollment(&conn, &student, &course);

    let svc = service(&conn);
    assert_eq!(svc.overall_gpa(admin, student.uuid).unwrap(), 0.0);
}

#[test]
fn gradebook_serializes_with_snake_case_statuses() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);
    seed_enrollment(&conn, &student, &course);
    seed_assignment(&conn, &course, "Quiz 1", 10.0);

    let svc = service(&conn);
    let gradebook = svc.compute_gradebook(faculty.actor(), course.uuid).unwrap();
    let json = serde_json::to_value(&gradebook).unwrap();
    assert_eq!(json["rows"][0]["cells"][0]["status"], "not_submitted");
    assert_eq!(json["rows"][0]["student_email"], "ada@example.edu");
}

#[test]
fn gradebook_of_a_missing_course_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let admin = seed_admin(&conn);

    let svc = service(&conn);
    let err = svc.compute_gradebook(admin, uuid::Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "course", .. }));
}
