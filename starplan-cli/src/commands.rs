use std::fs;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDateTime;
use starplan_core::{
    ClientConfig, Credentials, Lesson, Semester, Session, StarPlanClient, StudyProgram,
    ordering::{first_lesson, last_lesson},
    view::SavedView,
};

use crate::ConnectionArgs;

/// Which lessons of the timetable to print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    All,
    First,
    Last,
}

/// Timetable command parameters
pub struct TimetableParams {
    pub connection: ConnectionArgs,
    pub semester: Option<i64>,
    pub program: Option<i64>,
    pub group: Option<String>,
    pub json: bool,
    pub output: Option<String>,
    pub pick: Pick,
}

fn build_client(connection: &ConnectionArgs) -> Result<StarPlanClient> {
    let mut config = ClientConfig {
        timeout_secs: connection.timeout,
        language: connection.language.clone(),
        ..Default::default()
    };
    if let Some(ref base_url) = connection.base_url {
        config.base_url = base_url.clone();
    }
    Ok(StarPlanClient::with_config(config)?)
}

async fn login(connection: &ConnectionArgs) -> Result<(StarPlanClient, Session)> {
    let client = build_client(connection)?;
    let credentials = Credentials::new(&connection.username, &connection.password);

    let session = client
        .authenticate(&credentials)
        .await
        .context("Login request failed")?
        .ok_or_else(|| anyhow!("Login failed - wrong credentials?"))?;

    Ok((client, session))
}

async fn find_semester(
    client: &StarPlanClient,
    session: &Session,
    semester_id: i64,
) -> Result<Semester> {
    client
        .fetch_semesters(session)
        .await?
        .into_iter()
        .find(|s| s.id == semester_id)
        .ok_or_else(|| anyhow!("Unknown semester: {}", semester_id))
}

async fn find_study_program(
    client: &StarPlanClient,
    session: &Session,
    semester: &Semester,
    program_id: i64,
) -> Result<StudyProgram> {
    client
        .fetch_study_programs(session, semester)
        .await?
        .into_iter()
        .find(|p| p.id == program_id)
        .ok_or_else(|| anyhow!("Unknown study program: {}", program_id))
}

/// Check credentials
pub async fn login_command(connection: ConnectionArgs) -> Result<()> {
    tracing::info!("Checking credentials for {}", connection.username);

    let client = build_client(&connection)?;
    let credentials = Credentials::new(&connection.username, &connection.password);
    match client.authenticate(&credentials).await? {
        Some(_) => println!("✓ Login successful"),
        None => bail!("Login failed - wrong credentials?"),
    }

    Ok(())
}

/// Show saved view
pub async fn view_command(connection: ConnectionArgs) -> Result<()> {
    let (client, session) = login(&connection).await?;

    match client.fetch_saved_view(&session).await? {
        Some(view) => print_view(&view),
        None => println!("No saved view"),
    }

    Ok(())
}

/// List semesters
pub async fn semesters_command(connection: ConnectionArgs) -> Result<()> {
    let (client, session) = login(&connection).await?;

    for semester in client.fetch_semesters(&session).await? {
        let marker = if semester.date_as_default { "*" } else { " " };
        println!(
            "{} {:>5}  {:<8} {} ({} - {})",
            marker,
            semester.id,
            semester.short_name,
            semester.name,
            semester.start_date,
            semester.end_date
        );
    }

    Ok(())
}

/// List study programs
pub async fn programs_command(connection: ConnectionArgs, semester_id: i64) -> Result<()> {
    let (client, session) = login(&connection).await?;
    let semester = find_semester(&client, &session, semester_id).await?;

    for program in client.fetch_study_programs(&session, &semester).await? {
        println!("{:>5}  {:<8} {}", program.id, program.short_name, program.name);
    }

    Ok(())
}

/// List groups with their lectures
pub async fn groups_command(
    connection: ConnectionArgs,
    semester_id: i64,
    program_id: i64,
) -> Result<()> {
    let (client, session) = login(&connection).await?;
    let semester = find_semester(&client, &session, semester_id).await?;
    let program = find_study_program(&client, &session, &semester, program_id).await?;

    for group in client.fetch_groups(&session, &semester, &program).await? {
        println!("{:>5}  {:<8} {}", group.id, group.short_name, group.name);
        for lecture in &group.lectures {
            println!("         - {} ({})", lecture.name, lecture.short_name);
        }
    }

    Ok(())
}

/// Show timetable
pub async fn timetable_command(params: TimetableParams) -> Result<()> {
    let (client, session) = login(&params.connection).await?;

    let mut view = client.fetch_saved_view(&session).await?.unwrap_or_default();
    if let Some(semester) = params.semester {
        view.semester_id = semester;
    }
    if let Some(program) = params.program {
        view.study_program_id = program;
    }
    if let Some(group) = params.group {
        view.group_short_name = group;
    }

    let timetable = client.timetable_for_view(&session, &view).await?;
    tracing::info!(
        "Timetable of {} / {} / {}: {} lessons",
        timetable.semester.short_name,
        timetable.study_program.short_name,
        timetable.group.short_name,
        timetable.lessons.len()
    );

    let lessons: Vec<&Lesson> = match params.pick {
        Pick::All => timetable.lessons.iter().collect(),
        Pick::First => vec![first_lesson(&timetable.lessons)?],
        Pick::Last => vec![last_lesson(&timetable.lessons)?],
    };

    let rendered = if params.json {
        serde_json::to_string_pretty(&lessons)?
    } else {
        lessons
            .iter()
            .map(|lesson| format_lesson(lesson))
            .collect::<Vec<_>>()
            .join("\n")
    };

    match params.output {
        Some(path) => {
            fs::write(&path, rendered)?;
            println!("✓ Timetable written to: {}", path);
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn print_view(view: &SavedView) {
    println!("Language:       {}", view.lan);
    println!("Semester id:    {}", view.semester_id);
    println!("Study program:  {}", view.study_program_id);
    println!("Group:          {}", view.group_short_name);
    println!(
        "Flags:          acc={} sd={} sa={} loc={} act={} sel={} cb={}",
        view.acc, view.sd, view.sa, view.loc, view.act, view.sel, view.cb
    );
}

fn format_time(time: Option<NaiveDateTime>, format: &str) -> String {
    time.map_or_else(|| "?".to_string(), |t| t.format(format).to_string())
}

fn format_lesson(lesson: &Lesson) -> String {
    let mut line = format!(
        "{} - {}  {}",
        format_time(lesson.start, "%a %d.%m.%Y %H:%M"),
        format_time(lesson.end, "%H:%M"),
        lesson.summary
    );
    if !lesson.location.is_empty() {
        line.push_str(&format!(" [{}]", lesson.location));
    }
    if !lesson.description.is_empty() {
        line.push_str(&format!(" ({})", lesson.description));
    }
    line
}
