//! HTML pages
//!
//! Server-rendered views for the signed-in user. All interpolated values
//! go through `html-escape`.

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;

use crate::AppState;
use crate::auth::{CurrentSession, ERROR_AUTH_FAILED, ERROR_INVALID_STATE};
use crate::github::{Repository, UserProfile};

/// Create pages router
///
/// Routes:
/// - GET / - Home (anonymous or signed-in view)
/// - GET /repos - Repositories of the signed-in user
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/repos", get(repos))
}

#[derive(Debug, Deserialize)]
struct HomeQuery {
    error: Option<String>,
}

/// GET /
///
/// Fetches the profile on every visit. If GitHub rejects the token the
/// session is ended through `/logout`.
async fn home(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<HomeQuery>,
) -> Response {
    let notice = query.error.as_deref().map(error_message);

    let Some(access_token) = session.record.access_token() else {
        return Html(render_home(None, notice)).into_response();
    };

    match state.github.fetch_user_profile(access_token).await {
        Ok(profile) => Html(render_home(Some(&profile), notice)).into_response(),
        Err(error) => {
            tracing::warn!(%error, kind = error.kind(), "Failed to fetch user profile");
            Redirect::to("/logout").into_response()
        }
    }
}

/// GET /repos
///
/// Requires an access token; anonymous visitors are sent home.
async fn repos(State(state): State<AppState>, session: CurrentSession) -> Response {
    let Some(access_token) = session.record.access_token() else {
        return Redirect::to("/").into_response();
    };

    match state.github.fetch_user_repositories(access_token).await {
        Ok(repositories) => Html(render_repos(&repositories)).into_response(),
        Err(error) => {
            tracing::warn!(%error, kind = error.kind(), "Failed to fetch user repositories");
            Redirect::to("/").into_response()
        }
    }
}

/// Fixed text for an error indicator; the query value itself is never shown
fn error_message(indicator: &str) -> &'static str {
    match indicator {
        ERROR_INVALID_STATE => "Your sign-in request expired or could not be verified. Please try again.",
        ERROR_AUTH_FAILED => "Signing in with GitHub failed. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title} - ghportal</title>
</head>
<body>
    <h1>ghportal</h1>
{body}
</body>
</html>
"#,
        title = encode_text(title),
        body = body,
    )
}

fn render_home(profile: Option<&UserProfile>, notice: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(notice) = notice {
        body.push_str(&format!(
            "    <p class=\"error\">{}</p>\n",
            encode_text(notice)
        ));
    }

    match profile {
        Some(profile) => {
            let display_name = profile.name.as_deref().unwrap_or(&profile.login);
            body.push_str(&format!(
                concat!(
                    "    <img src=\"{avatar}\" alt=\"avatar\" width=\"64\" height=\"64\">\n",
                    "    <p>Signed in as <strong>{name}</strong> (@{login})</p>\n",
                    "    <p><a href=\"/repos\">Your repositories</a> | <a href=\"/logout\">Sign out</a></p>\n",
                ),
                avatar = encode_double_quoted_attribute(&profile.avatar_url),
                name = encode_text(display_name),
                login = encode_text(&profile.login),
            ));
        }
        None => {
            body.push_str("    <p>You are not signed in.</p>\n");
            body.push_str("    <p><a href=\"/login\">Sign in with GitHub</a></p>\n");
        }
    }

    layout("Home", &body)
}

fn render_repos(repositories: &[Repository]) -> String {
    let mut body = String::from("    <p><a href=\"/\">Home</a> | <a href=\"/logout\">Sign out</a></p>\n");

    if repositories.is_empty() {
        body.push_str("    <p>No repositories yet.</p>\n");
        return layout("Repositories", &body);
    }

    body.push_str("    <ul>\n");
    for repo in repositories {
        body.push_str(&format!(
            "        <li><a href=\"{url}\">{full_name}</a>",
            url = encode_double_quoted_attribute(&repo.html_url),
            full_name = encode_text(&repo.full_name),
        ));
        if let Some(description) = repo.description.as_deref() {
            body.push_str(&format!(" - {}", encode_text(description)));
        }
        if let Some(language) = repo.language.as_deref() {
            body.push_str(&format!(" <em>{}</em>", encode_text(language)));
        }
        body.push_str(&format!(
            " ★ {} ⑂ {}</li>\n",
            repo.stargazers_count, repo.forks_count
        ));
    }
    body.push_str("    </ul>\n");

    layout("Repositories", &body)
}
