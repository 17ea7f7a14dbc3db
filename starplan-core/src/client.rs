use std::time::Duration;

use chrono_tz::Tz;
use reqwest::{
    Client, Response, StatusCode, Url,
    header::{self, HeaderMap, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    ClientConfig, Credentials, Error, Group, Lesson, MyTimetable, Result, SavedView, Semester,
    Session, StudyProgram,
    cookie::{self, SESSION_COOKIE, VIEW_COOKIE},
    ics::extract_lessons,
    ordering::sort_lessons,
};

/// Status marker of an accepted login
const LOGIN_OK: &str = "ok";

#[derive(Debug, Deserialize)]
struct LoginStatus {
    #[serde(default)]
    res: String,
}

/// Client for one StarPlan installation.
///
/// Calls are sequential: every method issues its requests one after another
/// and the session is passed in explicitly.
pub struct StarPlanClient {
    client: Client,
    base_url: Url,
    language: String,
}

impl StarPlanClient {
    /// Zone of the wall-clock times in the calendar export
    pub const TIMEZONE: Tz = chrono_tz::Europe::Berlin;

    /// Client for the default installation
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            Error::Config(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            language: config.language,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Log in with `username&password`.
    ///
    /// A rejected login (HTTP 401 or a status other than `ok`) is `Ok(None)`.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Option<Session>> {
        tracing::info!("Authenticating user: {}", credentials.username);

        let response = self
            .client
            .post(self.endpoint("json")?)
            .query(&[("m", "login")])
            .header(header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(credentials.login_body())
            .send()
            .await
            .map_err(Self::handle_error_req)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("Login rejected for user: {}", credentials.username);
            return Ok(None);
        }
        let response = Self::check_status(response, "login")?;

        let session_token = cookie::find_cookie(response.headers(), SESSION_COOKIE);
        let statuses: Vec<Vec<LoginStatus>> = Self::json(response).await?;

        let accepted = statuses
            .first()
            .and_then(|inner| inner.first())
            .is_some_and(|status| status.res == LOGIN_OK);
        if !accepted {
            tracing::info!("Login refused by service for user: {}", credentials.username);
            return Ok(None);
        }

        let token = session_token
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingSessionCookie)?;
        tracing::info!("Logged in user: {}", credentials.username);

        Ok(Some(Session::new(token)))
    }

    /// Saved view preferences from the `myview` cookie.
    ///
    /// A missing or undecodable cookie is `Ok(None)`.
    pub async fn fetch_saved_view(&self, session: &Session) -> Result<Option<SavedView>> {
        let response = self
            .get("json", &[("m", "getpus")], session, "saved view")
            .await?;

        let Some(raw) = cookie::find_cookie(response.headers(), VIEW_COOKIE) else {
            tracing::warn!("Response carried no {} cookie", VIEW_COOKIE);
            return Ok(None);
        };

        match SavedView::from_cookie_value(&raw) {
            Ok(view) => Ok(Some(view)),
            Err(e) => {
                tracing::warn!("Failed to decode saved view: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn fetch_semesters(&self, session: &Session) -> Result<Vec<Semester>> {
        let semesters: Vec<Semester> = self
            .fetch_list(&[("m", "getpus")], session, "semesters")
            .await?;
        tracing::info!("Fetched {} semesters", semesters.len());
        Ok(semesters)
    }

    pub async fn fetch_study_programs(
        &self,
        session: &Session,
        semester: &Semester,
    ) -> Result<Vec<StudyProgram>> {
        let pu = semester.id.to_string();
        let programs: Vec<StudyProgram> = self
            .fetch_list(&[("m", "getogs"), ("pu", pu.as_str())], session, "study programs")
            .await?;
        tracing::info!(
            "Fetched {} study programs for semester {}",
            programs.len(),
            semester.id
        );
        Ok(programs)
    }

    pub async fn fetch_groups(
        &self,
        session: &Session,
        semester: &Semester,
        program: &StudyProgram,
    ) -> Result<Vec<Group>> {
        let pu = semester.id.to_string();
        let og = program.id.to_string();
        let groups: Vec<Group> = self
            .fetch_list(
                &[("m", "getPgsExt"), ("pu", pu.as_str()), ("og", og.as_str())],
                session,
                "groups",
            )
            .await?;
        tracing::info!(
            "Fetched {} groups for study program {}",
            groups.len(),
            program.id
        );
        Ok(groups)
    }

    /// Calendar export of a group, lessons in the order of the export
    pub async fn fetch_timetable(
        &self,
        session: &Session,
        semester: &Semester,
        group: &Group,
    ) -> Result<Vec<Lesson>> {
        let puid = semester.id.to_string();
        let pgid = group.id.to_string();
        let response = self
            .get(
                "ical",
                &[
                    ("lan", self.language.as_str()),
                    ("puid", puid.as_str()),
                    ("type", "pg"),
                    ("pgid", pgid.as_str()),
                ],
                session,
                "calendar",
            )
            .await?;

        let raw = response.text().await.map_err(Self::handle_error_req)?;
        let lessons = extract_lessons(&raw)?;
        tracing::info!("Extracted {} lessons for group {}", lessons.len(), group.short_name);

        Ok(lessons)
    }

    /// Walk from the saved view to the selected group's sorted lessons.
    ///
    /// Without a saved view the first semester, study program and group are
    /// used.
    pub async fn my_timetable(&self, session: &Session) -> Result<MyTimetable> {
        let view = self.fetch_saved_view(session).await?.unwrap_or_else(|| {
            tracing::warn!("No saved view, falling back to the first entries");
            SavedView::default()
        });
        self.timetable_for_view(session, &view).await
    }

    /// Same walk as [`StarPlanClient::my_timetable`] with the selection taken
    /// from `view`
    pub async fn timetable_for_view(
        &self,
        session: &Session,
        view: &SavedView,
    ) -> Result<MyTimetable> {
        let semesters = self.fetch_semesters(session).await?;
        let semester = view
            .select_semester(&semesters)
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse("no semesters listed".to_string()))?;

        let programs = self.fetch_study_programs(session, &semester).await?;
        let study_program = view
            .select_study_program(&programs)
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse("no study programs listed".to_string()))?;

        let groups = self.fetch_groups(session, &semester, &study_program).await?;
        let group = view
            .select_group(&groups)
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse("no groups listed".to_string()))?;

        tracing::info!(
            "Selected semester {}, study program {}, group {}",
            semester.short_name,
            study_program.short_name,
            group.short_name
        );

        let lessons = sort_lessons(self.fetch_timetable(session, &semester, &group).await?);

        Ok(MyTimetable {
            semester,
            study_program,
            group,
            lessons,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        session: &Session,
        endpoint: &str,
    ) -> Result<Response> {
        let url = self.endpoint(path)?;
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .header(header::COOKIE, session.cookie_header())
            .send()
            .await
            .map_err(Self::handle_error_req)?;

        Self::check_status(response, endpoint)
    }

    /// List endpoints answer `[[item, ...]]`
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        query: &[(&str, &str)],
        session: &Session,
        endpoint: &str,
    ) -> Result<Vec<T>> {
        let response = self.get("json", query, session, endpoint).await?;
        let envelope: Vec<Vec<T>> = Self::json(response).await?;

        envelope.into_iter().next().ok_or_else(|| {
            Error::UnexpectedResponse(format!("{} response has an empty envelope", endpoint))
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await.map_err(Self::handle_error_req)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn check_status(response: Response, endpoint: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::Status {
                endpoint: endpoint.to_string(),
                status,
            })
        }
    }

    fn handle_error_req(error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else {
            Error::Http(error)
        }
    }
}
