mod common;

use common::{
    count, seed_admin, seed_course, seed_enrollment, seed_faculty_primary, seed_principal, service,
};
use registrar_core::db::open_db_in_memory;
use registrar_core::model::principal::Principal;
use registrar_core::{AttendanceEntry, AttendanceStatus, EngineError, Role};

fn entries(
    students: &[&Principal],
    status: AttendanceStatus,
) -> Vec<AttendanceEntry> {
    students
        .iter()
        .map(|s| AttendanceEntry {
            student_id: s.uuid,
            status,
        })
        .collect()
}

#[test]
fn re_marking_a_day_replaces_the_previous_batch() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);

    let students: Vec<Principal> = (0..23)
        .map(|i| {
            let s = seed_principal(&conn, Role::Student, &format!("s{i}@example.edu"));
            seed_enrollment(&conn, &s, &course);
            s
        })
        .collect();

    let svc = service(&conn);
    let mark_day = |day: &str, present: &[&Principal], absent: &[&Principal]| {
        let mut batch = entries(present, AttendanceStatus::Present);
        batch.extend(entries(absent, AttendanceStatus::Absent));
        svc.mark_attendance_batch(faculty.actor(), course.uuid, day, &batch)
            .unwrap()
    };

    let refs: Vec<&Principal> = students.iter().collect();
    let inserted = mark_day("2024-03-01", &refs[..20], &refs[20..]);
    assert_eq!(inserted, 23);

    // Corrected pass for the same day covers only 20 students; the other
    // three lose their rows entirely.
    let inserted = mark_day("2024-03-01", &refs[..18], &refs[18..20]);
    assert_eq!(inserted, 20);
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM attendance_records WHERE day = '2024-03-01';"
        ),
        20
    );

    // Other days are untouched by the replace.
    mark_day("2024-03-02", &refs, &[]);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM attendance_records;"), 43);
}

#[test]
fn percentage_counts_present_days_only() {
    let conn = open_db_in_memory().unwrap();
    let admin = seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);
    seed_enrollment(&conn, &student, &course);

    let svc = service(&conn);
    let mark = |day: &str, status: AttendanceStatus| {
        svc.mark_attendance_batch(
            faculty.actor(),
            course.uuid,
            day,
            &[AttendanceEntry {
                student_id: student.uuid,
                status,
            }],
        )
        .unwrap();
    };
    mark("2024-03-01", AttendanceStatus::Present);
    mark("2024-03-02", AttendanceStatus::Late);
    mark("2024-03-03", AttendanceStatus::Absent);

    // 1 present of 3 marked days; `late` does not count as present.
    let pct = svc
        .attendance_percentage(admin, student.uuid, course.uuid)
        .unwrap();
    assert_eq!(pct, 33);

    // The student reads their own percentage.
    let own = svc
        .attendance_percentage(student.actor(), student.uuid, course.uuid)
        .unwrap();
    assert_eq!(own, 33);
}

#[test]
fn unmarked_student_has_zero_percentage() {
    let conn = open_db_in_memory().unwrap();
    let admin = seed_admin(&conn);
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_enrollment(&conn, &student, &course);

    let svc = service(&conn);
    let pct = svc
        .attendance_percentage(admin, student.uuid, course.uuid)
        .unwrap();
    assert_eq!(pct, 0);
}

#[test]
fn batch_with_a_non_enrolled_student_is_rejected_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let enrolled = seed_principal(&conn, Role::Student, "in@example.edu");
    let outsider = seed_principal(&conn, Role::Student, "out@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);
    seed_enrollment(&conn, &enrolled, &course);

    let svc = service(&conn);
    let err = svc
        .mark_attendance_batch(
            faculty.actor(),
            course.uuid,
            "2024-03-01",
            &[
                AttendanceEntry {
                    student_id: enrolled.uuid,
                    status: AttendanceStatus::Present,
                },
                AttendanceEntry {
                    student_id: outsider.uuid,
                    status: AttendanceStatus::Absent,
                },
            ],
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation { .. }));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM attendance_records;"), 0);
}

#[test]
fn batch_listing_a_student_twice_is_rejected_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let ada = seed_principal(&conn, Role::Student, "ada@example.edu");
    let bob = seed_principal(&conn, Role::Student, "bob@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);
    seed_enrollment(&conn, &ada, &course);
    seed_enrollment(&conn, &bob, &course);

    let svc = service(&conn);
    svc.mark_attendance_batch(
        faculty.actor(),
        course.uuid,
        "2024-03-01",
        &[
            AttendanceEntry {
                student_id: ada.uuid,
                status: AttendanceStatus::Present,
            },
            AttendanceEntry {
                student_id: bob.uuid,
                status: AttendanceStatus::Present,
            },
        ],
    )
    .unwrap();

    // The duplicated row must fail the whole batch up front; letting it
    // through would wipe the day and then die on the primary key.
    let err = svc
        .mark_attendance_batch(
            faculty.actor(),
            course.uuid,
            "2024-03-01",
            &[
                AttendanceEntry {
                    student_id: ada.uuid,
                    status: AttendanceStatus::Late,
                },
                AttendanceEntry {
                    student_id: bob.uuid,
                    status: AttendanceStatus::Absent,
                },
                AttendanceEntry {
                    student_id: ada.uuid,
                    status: AttendanceStatus::Present,
                },
            ],
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation { .. }));

    // The previously marked day survives untouched.
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM attendance_records WHERE day = '2024-03-01';"
        ),
        2
    );
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM attendance_records WHERE day = '2024-03-01' AND status = 'present';"
        ),
        2
    );
}

#[test]
fn malformed_day_is_rejected_and_leaves_existing_rows_intact() {
    let conn = open_db_in_memory().unwrap();
    seed_admin(&conn);
    let faculty = seed_principal(&conn, Role::Faculty, "prof@example.edu");
    let student = seed_principal(&conn, Role::Student, "ada@example.edu");
    let course = seed_course(&conn, "CS101", 3);
    seed_faculty_primary(&conn, &faculty, &course);
    seed_enrollment(&conn, &student, &course);

    let svc = service(&conn);
    svc.mark_attendance_batch(
        faculty.actor(),
        course.uuid,
        "2024-03-01",
        &[AttendanceEntry {
            student_id: student.uuid,
            status: AttendanceStatus::Present,
        }],
    )
    .unwrap();

    let err = svc
        .mark_attendance_batch(
            faculty.actor(),
            course.uuid,
            "March 1st",
            &[AttendanceEntry {
                student_id: student.uuid,
                status: AttendanceStatus::Present,
            }],
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation { .. }));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM attendance_records;"), 1);
}
