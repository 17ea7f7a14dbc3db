use std::collections::HashMap;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Response},
    routing::get,
};
use chrono::{NaiveDate, Timelike};
use starplan_core::{
    CalendarError, ClientConfig, Credentials, Error, Group, SavedView, Semester, Session,
    StarPlanClient,
    ordering::{first_lesson, last_lesson},
};
use tokio_test::{assert_err, assert_ok};

const TOKEN: &str = "7F3A09C1";
const FULL_VIEW: &str =
    "lan%3Dde%26acc%3Dtrue%26pu%3D42%26og%3D9%26pg%3DMI4%26sd%3Dtrue%26loc%3D1%26sa%3Dfalse%26cb%3Do";

const SEMESTERS: &str = r#"[[
    {"id":41,"name":"Wintersemester 2023/24","shortname":"WS23","startdate":"2023-10-01",
     "enddate":"2024-02-29","dateasdefault":false,"visibleonweb":true},
    {"id":42,"name":"Sommersemester 2024","shortname":"SS24","startdate":"2024-03-01",
     "enddate":"2024-08-31","dateasdefault":true,"visibleonweb":true}
]]"#;

const PROGRAMS: &str = r#"[[
    {"id":9,"name":"Medieninformatik","shortname":"MI"},
    {"id":10,"name":"Wirtschaftsinformatik","shortname":"WI"}
]]"#;

const GROUPS: &str = r#"[[
    {"id":100,"name":"Medieninformatik 2","shortname":"MI2","lectures":[]},
    {"id":101,"name":"Medieninformatik 4","shortname":"MI4","lectures":[
        {"id":1,"name":"Algorithmen","shortname":"ALG"},
        {"id":2,"name":"Datenbanken","shortname":"DB"}
    ]}
]]"#;

const MI4_CALENDAR: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
DTSTART:20240604T100000\r
DTEND:20240604T113000\r
SUMMARY:Datenbanken\r
UID:db-1\r
LOCATION:S 003\r
DESCRIPTION:Vorlesung\r
END:VEVENT\r
BEGIN:VEVENT\r
DTSTART:20240604T080000\r
DTEND:20240604T093000\r
SUMMARY:Algorithmen\r
UID:alg-1\r
LOCATION:I 102\r
DESCRIPTION:\r
END:VEVENT\r
BEGIN:VEVENT\r
DTSTART:20240604T090000\r
DTEND:20240604T100000\r
SUMMARY:Mathematik\r
UID:ma-1\r
LOCATION:\r
DESCRIPTION:Übung\r
END:VEVENT\r
END:VCALENDAR\r
";

#[derive(Clone)]
struct Fixture {
    view_cookie: Option<&'static str>,
}

type Params = Query<HashMap<String, String>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("JSESSIONID={}", TOKEN))
}

async fn json_post(Query(params): Params, body: String) -> Response {
    if params.get("m").map(String::as_str) != Some("login") {
        return StatusCode::NOT_FOUND.into_response();
    }

    match body.as_str() {
        "student&secret" => (
            AppendHeaders([(
                header::SET_COOKIE,
                format!("JSESSIONID={}; Path=/splan; HttpOnly", TOKEN),
            )]),
            r#"[[{"res":"ok"}]]"#,
        )
            .into_response(),
        "student&locked" => r#"[[{"res":"locked"}]]"#.into_response(),
        "nocookie&secret" => r#"[[{"res":"ok"}]]"#.into_response(),
        _ => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}

async fn json_get(State(fixture): State<Fixture>, Query(params): Params, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match params.get("m").map(String::as_str) {
        Some("getpus") => match fixture.view_cookie {
            Some(view) => (
                AppendHeaders([
                    (header::SET_COOKIE, format!("JSESSIONID={}; Path=/splan", TOKEN)),
                    (header::SET_COOKIE, format!("myview={}; Path=/splan", view)),
                ]),
                SEMESTERS,
            )
                .into_response(),
            None => SEMESTERS.into_response(),
        },
        Some("getogs") if params.get("pu").map(String::as_str) == Some("0") => {
            "[]".into_response()
        }
        Some("getogs") => PROGRAMS.into_response(),
        Some("getPgsExt") => GROUPS.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn ical(Query(params): Params, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if params.get("type").map(String::as_str) != Some("pg") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match params.get("pgid").map(String::as_str) {
        Some("101") => MI4_CALENDAR.into_response(),
        Some("999") => "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n".into_response(),
        Some(id) => format!(
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nDTSTART:20240603T080000\nSUMMARY:Group {id}\nUID:group-{id}\nEND:VEVENT\nEND:VCALENDAR\n"
        )
        .into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn spawn(fixture: Fixture) -> StarPlanClient {
    let app = Router::new()
        .route("/splan/json", get(json_get).post(json_post))
        .route("/splan/ical", get(ical))
        .with_state(fixture);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StarPlanClient::with_config(ClientConfig {
        base_url: format!("http://{}/splan", addr),
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap()
}

async fn spawn_with_view() -> StarPlanClient {
    spawn(Fixture {
        view_cookie: Some(FULL_VIEW),
    })
    .await
}

fn semester(id: i64) -> Semester {
    Semester {
        id,
        name: String::new(),
        short_name: String::new(),
        start_date: String::new(),
        end_date: String::new(),
        date_as_default: false,
        visible_on_web: true,
    }
}

#[tokio::test]
async fn test_authenticate_returns_session_token() {
    let client = spawn_with_view().await;

    let session = assert_ok!(client.authenticate(&Credentials::new("student", "secret")).await);
    assert_eq!(session.unwrap().token(), TOKEN);
}

#[tokio::test]
async fn test_authenticate_rejection_is_not_an_error() {
    let client = spawn_with_view().await;

    let unauthorized = assert_ok!(client.authenticate(&Credentials::new("student", "wrong")).await);
    assert!(unauthorized.is_none());

    let refused = assert_ok!(client.authenticate(&Credentials::new("student", "locked")).await);
    assert!(refused.is_none());
}

#[tokio::test]
async fn test_accepted_login_without_session_cookie_fails() {
    let client = spawn_with_view().await;

    let err = assert_err!(client.authenticate(&Credentials::new("nocookie", "secret")).await);
    assert!(matches!(err, Error::MissingSessionCookie));
}

#[tokio::test]
async fn test_transport_failure_is_reported() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = StarPlanClient::with_config(ClientConfig {
        base_url: format!("http://{}/splan/", addr),
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap();

    let err = assert_err!(client.authenticate(&Credentials::new("student", "secret")).await);
    assert!(matches!(err, Error::Http(_)));
}

#[tokio::test]
async fn test_saved_view_is_decoded_from_cookie() {
    let client = spawn_with_view().await;
    let session = Session::new(TOKEN);

    let view = assert_ok!(client.fetch_saved_view(&session).await).unwrap();
    assert_eq!(view.lan, "de");
    assert!(view.acc);
    assert_eq!(view.semester_id, 42);
    assert_eq!(view.study_program_id, 9);
    assert_eq!(view.group_short_name, "MI4");
    assert!(view.sd);
    assert_eq!(view.loc, 1);
    assert!(!view.sa);
    assert_eq!(view.cb, "o");
}

#[tokio::test]
async fn test_saved_view_absent_or_undecodable() {
    let session = Session::new(TOKEN);

    let client = spawn(Fixture { view_cookie: None }).await;
    assert!(assert_ok!(client.fetch_saved_view(&session).await).is_none());

    let client = spawn(Fixture {
        view_cookie: Some("pu%3Dsummer"),
    })
    .await;
    assert!(assert_ok!(client.fetch_saved_view(&session).await).is_none());
}

#[tokio::test]
async fn test_foreign_session_gets_status_error() {
    let client = spawn_with_view().await;

    let err = assert_err!(client.fetch_semesters(&Session::new("stale")).await);
    assert!(matches!(
        err,
        Error::Status { status, .. } if status == reqwest::StatusCode::FORBIDDEN
    ));
}

#[tokio::test]
async fn test_reference_data_chain() {
    let client = spawn_with_view().await;
    let session = Session::new(TOKEN);

    let semesters = assert_ok!(client.fetch_semesters(&session).await);
    assert_eq!(semesters.len(), 2);
    assert_eq!(semesters[1].short_name, "SS24");
    assert!(semesters[1].date_as_default);
    assert_eq!(semesters[1].start_date, "2024-03-01");

    let programs = assert_ok!(client.fetch_study_programs(&session, &semesters[1]).await);
    assert_eq!(programs[0].short_name, "MI");

    let groups = assert_ok!(client.fetch_groups(&session, &semesters[1], &programs[0]).await);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].lectures.len(), 2);
    assert_eq!(groups[1].lectures[1].name, "Datenbanken");

    let lessons = assert_ok!(client.fetch_timetable(&session, &semesters[1], &groups[1]).await);
    let ids: Vec<_> = lessons.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, ["db-1", "alg-1", "ma-1"]);
}

#[tokio::test]
async fn test_empty_envelope_is_unexpected() {
    let client = spawn_with_view().await;

    let err = assert_err!(
        client
            .fetch_study_programs(&Session::new(TOKEN), &semester(0))
            .await
    );
    assert!(matches!(err, Error::UnexpectedResponse(_)));
}

#[tokio::test]
async fn test_calendar_without_events_is_malformed() {
    let client = spawn_with_view().await;
    let group = Group {
        id: 999,
        name: "Leer".to_string(),
        short_name: "L".to_string(),
        lectures: Vec::new(),
    };

    let err = assert_err!(
        client
            .fetch_timetable(&Session::new(TOKEN), &semester(42), &group)
            .await
    );
    assert!(matches!(
        err,
        Error::Calendar(CalendarError::MissingEventBlock)
    ));
}

#[tokio::test]
async fn test_my_timetable_follows_saved_view() {
    let client = spawn_with_view().await;
    let session = assert_ok!(client.authenticate(&Credentials::new("student", "secret")).await)
        .expect("login accepted");

    let timetable = assert_ok!(client.my_timetable(&session).await);
    assert_eq!(timetable.semester.id, 42);
    assert_eq!(timetable.study_program.id, 9);
    assert_eq!(timetable.group.short_name, "MI4");

    let ids: Vec<_> = timetable.lessons.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, ["alg-1", "ma-1", "db-1"]);

    let first = assert_ok!(first_lesson(&timetable.lessons));
    assert_eq!(first.summary, "Algorithmen");
    assert_eq!(
        first.start,
        NaiveDate::from_ymd_opt(2024, 6, 4).unwrap().and_hms_opt(8, 0, 0)
    );
    let last = assert_ok!(last_lesson(&timetable.lessons));
    assert_eq!(last.summary, "Datenbanken");
    assert_eq!(last.description, "Vorlesung");

    let start = first.start_in(&StarPlanClient::TIMEZONE).unwrap();
    assert_eq!(start.naive_utc().hour(), 6);
}

#[tokio::test]
async fn test_my_timetable_without_view_uses_first_entries() {
    let client = spawn(Fixture { view_cookie: None }).await;

    let timetable = assert_ok!(client.my_timetable(&Session::new(TOKEN)).await);
    assert_eq!(timetable.semester.id, 41);
    assert_eq!(timetable.study_program.id, 9);
    assert_eq!(timetable.group.id, 100);
    assert_eq!(timetable.lessons.len(), 1);
    assert_eq!(timetable.lessons[0].summary, "Group 100");
}

#[tokio::test]
async fn test_timetable_for_explicit_view() {
    let client = spawn_with_view().await;
    let view = SavedView {
        semester_id: 42,
        study_program_id: 10,
        group_short_name: "MI2".to_string(),
        ..Default::default()
    };

    let timetable = assert_ok!(client.timetable_for_view(&Session::new(TOKEN), &view).await);
    assert_eq!(timetable.semester.short_name, "SS24");
    assert_eq!(timetable.study_program.short_name, "WI");
    assert_eq!(timetable.group.id, 100);
    assert_eq!(timetable.lessons[0].id, "group-100");
}
