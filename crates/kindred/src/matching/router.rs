use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{GroupId, Topic, TopicKind, UserId};
use super::repository::ProfileStore;
use super::service::{MatchError, MatchingService};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub word: String,
    pub kind: TopicKind,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub user_id: UserId,
}

/// Router builder exposing group membership, ranking, survey, and reveal endpoints.
pub fn matching_router<S>(service: Arc<MatchingService<S>>) -> Router
where
    S: ProfileStore + 'static,
{
    Router::new()
        .route("/api/v1/groups", post(create_group_handler::<S>))
        .route(
            "/api/v1/groups/:group_id/members",
            post(join_handler::<S>),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id/ranking",
            get(ranking_handler::<S>),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id/next-match",
            get(next_match_handler::<S>),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id/questions",
            get(questions_handler::<S>),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id/reveal",
            post(reveal_handler::<S>),
        )
        .route("/api/v1/users/:user_id/answers", post(answer_handler::<S>))
        .route(
            "/api/v1/users/:user_id/common/:other_id",
            get(common_handler::<S>),
        )
        .with_state(service)
}

fn error_response(error: MatchError) -> Response {
    AppError::from(error).into_response()
}

pub(crate) async fn ranking_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: ProfileStore + 'static,
{
    let (group_id, user_id) = (GroupId(group_id), UserId(user_id));
    match service.compatibility_ranking(&user_id, &group_id) {
        Ok(ranking) => {
            let payload = json!({
                "group_id": group_id,
                "user_id": user_id,
                "ranking": ranking,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn next_match_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: ProfileStore + 'static,
{
    let (group_id, user_id) = (GroupId(group_id), UserId(user_id));
    match service.next_match_candidate(&user_id, &group_id) {
        Ok(candidate) => {
            let payload = json!({
                "user_id": user_id,
                "candidate": candidate,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn questions_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Path((group_id, user_id)): Path<(String, String)>,
    Query(query): Query<QuestionQuery>,
) -> Response
where
    S: ProfileStore + 'static,
{
    let (group_id, user_id) = (GroupId(group_id), UserId(user_id));
    match service.topic_queue_snapshot(&user_id, &group_id, query.count) {
        Ok(questions) => {
            let payload = json!({ "questions": questions });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn answer_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    S: ProfileStore + 'static,
{
    let topic = Topic::new(request.word, request.kind);
    match service.record_answer(&UserId(user_id), topic, request.score) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reveal_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: ProfileStore + 'static,
{
    match service.try_reveal_match(&UserId(user_id), &GroupId(group_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn common_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Path((user_id, other_id)): Path<(String, String)>,
) -> Response
where
    S: ProfileStore + 'static,
{
    match service.common_affinities(&UserId(user_id), &UserId(other_id)) {
        Ok(topics) => {
            let payload = json!({ "common": topics });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn join_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Path(group_id): Path<String>,
    axum::Json(request): axum::Json<JoinRequest>,
) -> Response
where
    S: ProfileStore + 'static,
{
    match service.join_group(&GroupId(group_id), &request.user_id) {
        Ok(group) => (StatusCode::OK, axum::Json(group)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_group_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    axum::Json(request): axum::Json<CreateGroupRequest>,
) -> Response
where
    S: ProfileStore + 'static,
{
    match service.create_group(&request.name, &request.user_id) {
        Ok(group) => (StatusCode::CREATED, axum::Json(group)).into_response(),
        Err(error) => error_response(error),
    }
}
