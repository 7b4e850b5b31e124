//! Server-rendered pages for competitors, staff and admins.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use super::api::current_leaderboard;
use super::html::{category_options, escape, notices, page};
use super::{error::AppError, state::AppState};
use crate::admin::{self, AdminAction, SectionAction};
use crate::competitor::{parse_competitor_number, Category, NewCompetitor, ScoreInput};
use crate::error::{Error, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntryForm {
    competitor_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScoreForm {
    climb_number: String,
    attempts: String,
    topped: Option<String>,
    section: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    name: String,
    gender: String,
    number: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminForm {
    password: String,
    action: String,
    competitor_id: String,
    new_name: String,
    new_gender: String,
    new_number: String,
    section_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SectionForm {
    password: String,
    action: String,
    name: String,
    climb_number: String,
    colour: String,
    climb_id: String,
}

/// Wording shown to people for errors they can fix.
fn user_message(err: &Error) -> String {
    match err {
        Error::CompetitorNotFound(number) => format!("Competitor {number} not found."),
        Error::DuplicateCompetitor(number) => {
            format!("Competitor number {number} is already taken.")
        }
        Error::UnknownClimb(_) => "That climb number is not in the scoring config.".to_string(),
        Error::Unauthorized => "Incorrect admin password.".to_string(),
        Error::DuplicateSectionClimb {
            section,
            climb_number,
        } => format!("Climb {climb_number} is already in {section}."),
        other => other.to_string(),
    }
}

type Notices = (Option<String>, Option<String>);

/// Split an action result into page notices, passing server faults through.
fn outcome(result: Result<String>) -> std::result::Result<Notices, AppError> {
    match result {
        Ok(message) => Ok((Some(message), None)),
        Err(err) if err.is_user_error() => Ok((None, Some(user_message(&err)))),
        Err(err) => Err(err.into()),
    }
}

fn optional_number(raw: &str) -> Result<Option<u32>> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_competitor_number(raw).map(Some)
    }
}

fn parse_climb_number(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::invalid_input("Please enter a valid climb number.")),
    }
}

// === Home and competitor entry ===

fn render_home(error: Option<&str>) -> Html<String> {
    let body = format!(
        r#"{}
<form method="post" action="/competitor">
  <label>Competitor number <input name="competitor_id" inputmode="numeric" autofocus required></label>
  <button type="submit">Go</button>
</form>
<p><a href="/register">Register a competitor</a></p>"#,
        notices(None, error)
    );
    page("Climbing Competition", &body)
}

pub async fn home() -> Html<String> {
    render_home(None)
}

pub async fn enter_competitor(
    State(state): State<Arc<AppState>>,
    Form(form): Form<EntryForm>,
) -> std::result::Result<Response, AppError> {
    let number = match parse_competitor_number(&form.competitor_id) {
        Ok(number) => number,
        Err(err) => return Ok(render_home(Some(&err.to_string())).into_response()),
    };

    if !state.storage.lock().await.competitor_exists(number)? {
        return Ok(
            render_home(Some("Competitor not found. Please check with the desk.")).into_response(),
        );
    }

    Ok(Redirect::to(&format!("/competitor/{number}/sections")).into_response())
}

pub async fn competitor_redirect(Path(number): Path<u32>) -> Redirect {
    Redirect::to(&format!("/competitor/{number}/sections"))
}

// === Competitor dashboard ===

async fn render_sections(
    state: &AppState,
    number: u32,
    error: Option<&str>,
) -> std::result::Result<Html<String>, AppError> {
    let (competitor, sections, scores) = {
        let storage = state.storage.lock().await;
        (
            storage.require_competitor(number)?,
            storage.list_sections()?,
            storage.scores_for(number)?,
        )
    };

    let mut body = format!(
        "<p>#{} {} ({})</p>\n<p><strong>Total points: {}</strong></p>\n{}",
        competitor.number,
        escape(&competitor.name),
        competitor.category.label(),
        state.rules.total_points(&scores),
        notices(None, error),
    );

    if sections.is_empty() {
        body.push_str("<p>No sections have been set up yet.</p>");
    } else {
        body.push_str("<ul>\n");
        for section in &sections {
            body.push_str(&format!(
                r#"<li><a href="/competitor/{number}/section/{}">{}</a></li>"#,
                escape(&section.slug),
                escape(&section.name)
            ));
            body.push('\n');
        }
        body.push_str("</ul>");
    }

    Ok(page("Sections", &body))
}

pub async fn competitor_sections(
    State(state): State<Arc<AppState>>,
    Path(number): Path<u32>,
) -> std::result::Result<Html<String>, AppError> {
    render_sections(&state, number, None).await
}

async fn render_section(
    state: &AppState,
    number: u32,
    slug: &str,
    error: Option<&str>,
) -> std::result::Result<Html<String>, AppError> {
    let (competitor, section, climbs, scores) = {
        let storage = state.storage.lock().await;
        let competitor = storage.require_competitor(number)?;
        let section = storage
            .get_section_by_slug(slug)?
            .ok_or_else(|| Error::SectionNotFound(slug.to_string()))?;
        let climbs = storage.list_section_climbs(section.id)?;
        let scores = storage.scores_for(number)?;
        (competitor, section, climbs, scores)
    };

    let existing: HashMap<u32, _> = scores.iter().map(|s| (s.climb_number, s)).collect();

    let mut rows = String::new();
    for climb in &climbs {
        let score = existing.get(&climb.climb_number);
        let attempts = score.map_or(1, |s| s.attempts);
        let topped = score.is_some_and(|s| s.topped);
        let points = score.map_or(0, |s| {
            state.rules.points_for(s.climb_number, s.attempts, s.topped)
        });
        rows.push_str(&format!(
            r#"<tr><td>{label}</td><td>
<form class="inline" method="post" action="/competitor/{number}/score">
  <input type="hidden" name="climb_number" value="{climb}">
  <input type="hidden" name="section" value="{slug}">
  <input name="attempts" type="number" min="1" max="{max}" value="{attempts}">
  <label><input name="topped" type="checkbox"{checked}> Topped</label>
  <button type="submit">Save</button>
</form></td><td>{points}</td></tr>
"#,
            label = escape(&climb.label()),
            climb = climb.climb_number,
            slug = escape(&section.slug),
            max = state.rules.max_attempts(),
            checked = if topped { " checked" } else { "" },
        ));
    }

    let body = format!(
        r#"<p>#{} {} &middot; <a href="/competitor/{number}/sections">All sections</a></p>
<p><strong>Total points: {}</strong></p>
{}
<table>
<tr><th>Climb</th><th>Result</th><th>Points</th></tr>
{rows}</table>"#,
        competitor.number,
        escape(&competitor.name),
        state.rules.total_points(&scores),
        notices(None, error),
    );

    Ok(page(&section.name, &body))
}

pub async fn competitor_section(
    State(state): State<Arc<AppState>>,
    Path((number, slug)): Path<(u32, String)>,
) -> std::result::Result<Html<String>, AppError> {
    render_section(&state, number, &slug, None).await
}

pub async fn submit_score(
    State(state): State<Arc<AppState>>,
    Path(number): Path<u32>,
    Form(form): Form<ScoreForm>,
) -> std::result::Result<Response, AppError> {
    let result = async {
        let climb_number = parse_climb_number(&form.climb_number)?;
        let attempts = form
            .attempts
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::invalid_input("Attempts must be a whole number."))?;
        let input = ScoreInput {
            climb_number,
            attempts,
            topped: form.topped.is_some(),
        };
        state.submit_score(number, input).await
    }
    .await;

    // Only a stored slug goes back into a URL; anything else returns to the dashboard.
    let section = match form.section.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => state
            .storage
            .lock()
            .await
            .get_section_by_slug(slug)?
            .map(|section| section.slug),
        None => None,
    };

    match result {
        Ok(_) => {
            let target = match &section {
                Some(slug) => format!("/competitor/{number}/section/{slug}"),
                None => format!("/competitor/{number}/sections"),
            };
            Ok(Redirect::to(&target).into_response())
        }
        Err(err) if err.is_user_error() && !err.is_not_found() => {
            let message = user_message(&err);
            let html = match &section {
                Some(slug) => render_section(&state, number, slug, Some(&message)).await?,
                None => render_sections(&state, number, Some(&message)).await?,
            };
            Ok((StatusCode::BAD_REQUEST, html).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

// === Registration ===

fn render_register(message: Option<&str>, error: Option<&str>) -> Html<String> {
    let body = format!(
        r#"{}
<form method="post" action="/register">
  <label>Name <input name="name" required></label>
  <label>Category <select name="gender">{}</select></label>
  <label>Number (optional) <input name="number" inputmode="numeric"></label>
  <button type="submit">Register</button>
</form>"#,
        notices(message, error),
        category_options("Inclusive"),
    );
    page("Register Competitor", &body)
}

pub async fn register_form() -> Html<String> {
    render_register(None, None)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> std::result::Result<Html<String>, AppError> {
    let result = async {
        let new = NewCompetitor::new(
            optional_number(&form.number)?,
            &form.name,
            Category::from_registration(&form.gender),
        )?;
        let competitor = state.storage.lock().await.create_competitor(&new)?;
        Ok::<_, Error>(format!(
            "Registered {} as competitor #{}.",
            competitor.name, competitor.number
        ))
    }
    .await;

    let (message, error) = outcome(result)?;
    Ok(render_register(message.as_deref(), error.as_deref()))
}

// === Leaderboard ===

async fn render_leaderboard(
    state: &AppState,
    filter: Option<Category>,
) -> std::result::Result<Html<String>, AppError> {
    let board = current_leaderboard(state, filter).await?;

    let mut rows = String::new();
    for row in &board.rows {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            row.position,
            row.competitor_number,
            escape(&row.name),
            row.category.label(),
            row.total_points,
            row.tops,
            row.attempts_on_tops,
        ));
    }

    let body = format!(
        r#"<p><a href="/leaderboard">All</a> <a href="/leaderboard/male">Male</a> <a href="/leaderboard/female">Female</a> <a href="/leaderboard/inclusive">Gender Inclusive</a></p>
<table>
<tr><th>Pos</th><th>#</th><th>Name</th><th>Category</th><th>Points</th><th>Tops</th><th>Attempts on tops</th></tr>
{rows}</table>"#
    );

    Ok(page(&format!("Leaderboard: {}", board.category), &body))
}

pub async fn leaderboard_all(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Html<String>, AppError> {
    render_leaderboard(&state, None).await
}

pub async fn leaderboard_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> std::result::Result<Html<String>, AppError> {
    render_leaderboard(&state, Category::from_filter(Some(&category))).await
}

// === Admin ===

fn parse_admin_action(form: &AdminForm) -> Result<AdminAction> {
    match form.action.as_str() {
        "reset_all" => Ok(AdminAction::ResetAll),
        "delete_competitor" => Ok(AdminAction::DeleteCompetitor(parse_competitor_number(
            &form.competitor_id,
        )?)),
        "create_competitor" => Ok(AdminAction::CreateCompetitor(NewCompetitor::new(
            optional_number(&form.new_number)?,
            &form.new_name,
            Category::from_registration(&form.new_gender),
        )?)),
        "update_competitor" => {
            let number = parse_competitor_number(&form.competitor_id)?;
            let checked = NewCompetitor::new(
                Some(number),
                &form.new_name,
                Category::from_registration(&form.new_gender),
            )?;
            Ok(AdminAction::UpdateCompetitor {
                number,
                name: checked.name,
                category: checked.category,
            })
        }
        "create_section" => Ok(AdminAction::CreateSection(form.section_name.clone())),
        _ => Err(Error::invalid_input("Unknown admin action.")),
    }
}

const PASSWORD_FIELD: &str =
    r#"<label>Admin password <input name="password" type="password" required></label>"#;

async fn render_admin(
    state: &AppState,
    message: Option<&str>,
    error: Option<&str>,
) -> std::result::Result<Html<String>, AppError> {
    let (sections, stats) = {
        let storage = state.storage.lock().await;
        (storage.list_sections()?, storage.stats()?)
    };

    let mut body = notices(message, error);
    if !state.admin.is_enabled() {
        body.push_str(
            r#"<p class="error">Admin actions are disabled until an admin password is configured.</p>"#,
        );
    }
    body.push_str(&format!(
        "<p>{} competitors, {} results, {} sections.</p>\n",
        stats.competitors, stats.scores, stats.sections
    ));

    body.push_str(&format!(
        r#"<h2>Create competitor</h2>
<form method="post" action="/admin">
  <input type="hidden" name="action" value="create_competitor">
  <label>Name <input name="new_name" required></label>
  <label>Category <select name="new_gender">{options}</select></label>
  <label>Number (optional) <input name="new_number" inputmode="numeric"></label>
  {PASSWORD_FIELD}
  <button type="submit">Create</button>
</form>
<h2>Edit competitor</h2>
<form method="post" action="/admin">
  <input type="hidden" name="action" value="update_competitor">
  <label>Competitor number <input name="competitor_id" inputmode="numeric" required></label>
  <label>Name <input name="new_name" required></label>
  <label>Category <select name="new_gender">{options}</select></label>
  {PASSWORD_FIELD}
  <button type="submit">Save</button>
</form>
<h2>Delete competitor</h2>
<form method="post" action="/admin">
  <input type="hidden" name="action" value="delete_competitor">
  <label>Competitor number <input name="competitor_id" inputmode="numeric" required></label>
  {PASSWORD_FIELD}
  <button type="submit">Delete</button>
</form>
<h2>Sections</h2>
<form method="post" action="/admin">
  <input type="hidden" name="action" value="create_section">
  <label>Section name <input name="section_name" required></label>
  {PASSWORD_FIELD}
  <button type="submit">Create section</button>
</form>
"#,
        options = category_options("Inclusive"),
    ));

    body.push_str("<ul>\n");
    for section in &sections {
        body.push_str(&format!(
            r#"<li>{} <a href="/admin/section/{}/edit">Edit</a></li>"#,
            escape(&section.name),
            section.id
        ));
        body.push('\n');
    }
    body.push_str("</ul>\n");

    body.push_str(&format!(
        r#"<h2>Reset competition</h2>
<form method="post" action="/admin">
  <input type="hidden" name="action" value="reset_all">
  {PASSWORD_FIELD}
  <button type="submit">Delete everything</button>
</form>"#
    ));

    Ok(page("Admin", &body))
}

pub async fn admin_page(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Html<String>, AppError> {
    render_admin(&state, None, None).await
}

pub async fn admin_action(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AdminForm>,
) -> std::result::Result<Html<String>, AppError> {
    let result = async {
        state.admin.check(&form.password)?;
        let action = parse_admin_action(&form)?;
        let storage = state.storage.lock().await;
        admin::apply(&storage, &action)
    }
    .await;

    let (message, error) = outcome(result)?;
    render_admin(&state, message.as_deref(), error.as_deref()).await
}

fn parse_section_action(form: &SectionForm) -> Result<SectionAction> {
    match form.action.as_str() {
        "save_section" => Ok(SectionAction::Rename(form.name.clone())),
        "add_climb" => Ok(SectionAction::AddClimb {
            climb_number: parse_climb_number(&form.climb_number)?,
            colour: Some(form.colour.trim().to_string()).filter(|c| !c.is_empty()),
        }),
        "delete_climb" => form
            .climb_id
            .trim()
            .parse()
            .map(SectionAction::DeleteClimb)
            .map_err(|_| Error::invalid_input("Invalid climb selection.")),
        "delete_section" => Ok(SectionAction::Delete),
        _ => Err(Error::invalid_input("Unknown section action.")),
    }
}

async fn render_section_edit(
    state: &AppState,
    section_id: i64,
    message: Option<&str>,
    error: Option<&str>,
) -> std::result::Result<Html<String>, AppError> {
    let (section, climbs) = {
        let storage = state.storage.lock().await;
        let section = storage
            .get_section(section_id)?
            .ok_or_else(|| Error::SectionNotFound(section_id.to_string()))?;
        let climbs = storage.list_section_climbs(section.id)?;
        (section, climbs)
    };
    let action = format!("/admin/section/{}/edit", section.id);

    let mut body = notices(message, error);
    body.push_str(&format!(
        r#"<form method="post" action="{action}">
  <input type="hidden" name="action" value="save_section">
  <label>Name <input name="name" value="{name}" required></label>
  {PASSWORD_FIELD}
  <button type="submit">Save</button>
</form>
<h2>Climbs</h2>
<table>
<tr><th>Climb</th><th></th></tr>
"#,
        name = escape(&section.name),
    ));

    for climb in &climbs {
        body.push_str(&format!(
            r#"<tr><td>{label}</td><td>
<form class="inline" method="post" action="{action}">
  <input type="hidden" name="action" value="delete_climb">
  <input type="hidden" name="climb_id" value="{id}">
  {PASSWORD_FIELD}
  <button type="submit">Remove</button>
</form></td></tr>
"#,
            label = escape(&climb.label()),
            id = climb.id,
        ));
    }

    body.push_str(&format!(
        r#"</table>
<h2>Add climb</h2>
<form method="post" action="{action}">
  <input type="hidden" name="action" value="add_climb">
  <label>Climb number <input name="climb_number" inputmode="numeric" required></label>
  <label>Colour <input name="colour"></label>
  {PASSWORD_FIELD}
  <button type="submit">Add</button>
</form>
<h2>Delete section</h2>
<form method="post" action="{action}">
  <input type="hidden" name="action" value="delete_section">
  {PASSWORD_FIELD}
  <button type="submit">Delete section</button>
</form>
<p><a href="/admin">Back to admin</a></p>"#
    ));

    Ok(page(&format!("Edit section: {}", section.name), &body))
}

pub async fn section_edit_page(
    State(state): State<Arc<AppState>>,
    Path(section_id): Path<i64>,
) -> std::result::Result<Html<String>, AppError> {
    render_section_edit(&state, section_id, None, None).await
}

pub async fn section_edit_action(
    State(state): State<Arc<AppState>>,
    Path(section_id): Path<i64>,
    Form(form): Form<SectionForm>,
) -> std::result::Result<Response, AppError> {
    let parsed = state
        .admin
        .check(&form.password)
        .and_then(|()| parse_section_action(&form));
    let deleting = matches!(parsed, Ok(SectionAction::Delete));

    let result = match parsed {
        Ok(action) => {
            let storage = state.storage.lock().await;
            admin::apply_to_section(&storage, &state.rules, section_id, &action)
        }
        Err(err) => Err(err),
    };

    if deleting && result.is_ok() {
        return Ok(Redirect::to("/admin").into_response());
    }

    let (message, error) = outcome(result)?;
    let html = render_section_edit(&state, section_id, message.as_deref(), error.as_deref()).await?;
    Ok(html.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        assert_eq!(
            user_message(&Error::CompetitorNotFound(4)),
            "Competitor 4 not found."
        );
        assert_eq!(
            user_message(&Error::Unauthorized),
            "Incorrect admin password."
        );
    }

    #[test]
    fn test_outcome_passes_internal_errors() {
        assert!(outcome(Err(Error::internal("db gone"))).is_err());
        let (message, error) = outcome(Err(Error::Unauthorized)).unwrap();
        assert!(message.is_none());
        assert_eq!(error.as_deref(), Some("Incorrect admin password."));
    }

    #[test]
    fn test_parse_admin_action() {
        let form = AdminForm {
            action: "delete_competitor".into(),
            competitor_id: "12".into(),
            ..AdminForm::default()
        };
        assert_eq!(
            parse_admin_action(&form).unwrap(),
            AdminAction::DeleteCompetitor(12)
        );

        let form = AdminForm {
            action: "delete_competitor".into(),
            competitor_id: "twelve".into(),
            ..AdminForm::default()
        };
        assert!(parse_admin_action(&form).is_err());

        let form = AdminForm {
            action: "create_competitor".into(),
            new_name: "Natalia".into(),
            new_gender: "Female".into(),
            ..AdminForm::default()
        };
        match parse_admin_action(&form).unwrap() {
            AdminAction::CreateCompetitor(new) => {
                assert_eq!(new.number, None);
                assert_eq!(new.category, Category::Female);
            }
            other => panic!("unexpected action {other:?}"),
        }

        let form = AdminForm {
            action: "update_competitor".into(),
            competitor_id: "4".into(),
            new_name: "  Tomoa ".into(),
            new_gender: "Male".into(),
            ..AdminForm::default()
        };
        assert_eq!(
            parse_admin_action(&form).unwrap(),
            AdminAction::UpdateCompetitor {
                number: 4,
                name: "Tomoa".into(),
                category: Category::Male,
            }
        );

        let form = AdminForm {
            action: "update_competitor".into(),
            competitor_id: "4".into(),
            new_name: "   ".into(),
            ..AdminForm::default()
        };
        assert!(parse_admin_action(&form).is_err());

        let form = AdminForm {
            action: "launch_rockets".into(),
            ..AdminForm::default()
        };
        assert!(parse_admin_action(&form).is_err());
    }

    #[test]
    fn test_parse_section_action() {
        let form = SectionForm {
            action: "add_climb".into(),
            climb_number: "9".into(),
            colour: "  ".into(),
            ..SectionForm::default()
        };
        assert_eq!(
            parse_section_action(&form).unwrap(),
            SectionAction::AddClimb {
                climb_number: 9,
                colour: None
            }
        );

        let form = SectionForm {
            action: "delete_climb".into(),
            climb_id: "x".into(),
            ..SectionForm::default()
        };
        assert!(parse_section_action(&form).is_err());
    }
}
