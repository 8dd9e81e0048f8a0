// src/remote/rest.rs

//! REST client for the managed backend.
//!
//! Reads go through `GET /rest/v1/<table>` with column filters, procedures
//! through `POST /rest/v1/rpc/<function>`, inserts through
//! `POST /rest/v1/<table>` with `Prefer: return=representation`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use url::Url;

use super::{
    AssessmentBackend, InterviewBackend, ProfileBackend,
    normalize::{OneOrMany, deserialize_single},
};
use crate::{
    config::Config,
    error::AppError,
    models::{
        assessment::{AnswerRecord, AssessmentConfig, AssessmentResults, Eligibility, Question},
        interview::{AvailabilityWindow, BookedInterview, Interview, NewInterview},
        profile::{Profile, Role, VaProfile},
    },
    utils::html::clean_html,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct SkillRow {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ConfigRow {
    skill_id: String,
    questions_per_test: u32,
    time_limit_minutes: u32,
    passing_score: u32,
    #[serde(default, deserialize_with = "deserialize_single")]
    skills: Option<SkillRow>,
}

impl ConfigRow {
    fn into_config(self) -> AssessmentConfig {
        AssessmentConfig {
            skill_name: self
                .skills
                .map(|s| s.name)
                .unwrap_or_else(|| "Skill assessment".to_string()),
            skill_id: self.skill_id,
            questions_per_test: self.questions_per_test,
            time_limit_minutes: self.time_limit_minutes,
            passing_score: self.passing_score,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionRow {
    id: String,
    question_text: String,
    options: Vec<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

impl QuestionRow {
    /// Prompt and options are rendered as HTML by the front-end.
    fn into_question(self) -> Question {
        Question {
            id: self.id,
            prompt: clean_html(&self.question_text),
            options: self.options.iter().map(|o| clean_html(o)).collect(),
            difficulty: self.difficulty,
            category: self.category,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AttemptRow {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    #[serde(default)]
    email: Option<String>,
    full_name: String,
    role: Role,
    #[serde(default, deserialize_with = "deserialize_single")]
    va_profiles: Option<VaProfile>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role,
            va_profile: row.va_profiles,
        }
    }
}

#[derive(Serialize)]
struct InterviewInsert<'a> {
    #[serde(flatten)]
    booking: &'a NewInterview,
    status: &'static str,
}

/// Client for the managed backend's REST and RPC endpoints.
#[derive(Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: Url,
    service_key: String,
}

impl RestBackend {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            service_key: config.backend_service_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn rpc<B, T>(&self, function: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("rest/v1/rpc/{}", function))?;
        tracing::debug!("rpc {}", function);

        let response = self
            .authorized(self.client.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("rpc {} failed: {:?}", function, e);
                AppError::from(e)
            })?;

        read_json(function, response).await
    }

    async fn select<T>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        tracing::debug!("select {} {:?}", table, query);

        let response = self
            .authorized(self.client.get(url))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("select on {} failed: {:?}", table, e);
                AppError::from(e)
            })?;

        read_json(table, response).await
    }

    async fn insert<B, T>(&self, table: &str, body: &B) -> Result<Vec<T>, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;

        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("insert into {} failed: {:?}", table, e);
                AppError::from(e)
            })?;

        read_json(table, response).await
    }
}

async fn read_json<T>(endpoint: &str, response: reqwest::Response) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!(
            "{} returned {}: {}",
            endpoint, status, body
        )));
    }

    response.json::<T>().await.map_err(|e| {
        tracing::error!("Malformed response from {}: {:?}", endpoint, e);
        AppError::Upstream(format!("Malformed response from {}: {}", endpoint, e))
    })
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl AssessmentBackend for RestBackend {
    async fn check_eligibility(
        &self,
        va_id: &str,
        skill_id: &str,
    ) -> Result<Eligibility, AppError> {
        let result: OneOrMany<Eligibility> = self
            .rpc(
                "can_take_assessment",
                &json!({ "p_va_id": va_id, "p_skill_id": skill_id }),
            )
            .await?;

        result
            .into_first()
            .ok_or_else(|| AppError::Upstream("can_take_assessment returned no row".to_string()))
    }

    async fn fetch_config(&self, skill_id: &str) -> Result<Option<AssessmentConfig>, AppError> {
        let rows: Vec<ConfigRow> = self
            .select(
                "assessment_configs",
                &[
                    ("skill_id", eq(skill_id)),
                    (
                        "select",
                        "skill_id,questions_per_test,time_limit_minutes,passing_score,skills(name)"
                            .to_string(),
                    ),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next().map(ConfigRow::into_config))
    }

    async fn fetch_questions(
        &self,
        skill_id: &str,
        va_id: &str,
    ) -> Result<Vec<Question>, AppError> {
        let rows: Vec<QuestionRow> = self
            .rpc(
                "get_assessment_questions",
                &json!({ "p_skill_id": skill_id, "p_va_id": va_id }),
            )
            .await?;

        Ok(rows.into_iter().map(QuestionRow::into_question).collect())
    }

    async fn create_attempt(
        &self,
        va_id: &str,
        skill_id: &str,
        question_ids: &[String],
    ) -> Result<String, AppError> {
        let rows: Vec<AttemptRow> = self
            .insert(
                "assessment_attempts",
                &json!({
                    "va_id": va_id,
                    "skill_id": skill_id,
                    "question_ids": question_ids,
                    "status": "in_progress",
                }),
            )
            .await?;

        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| AppError::Upstream("assessment_attempts insert returned no row".to_string()))
    }

    async fn submit_answers(
        &self,
        attempt_id: &str,
        answers: &[AnswerRecord],
    ) -> Result<AssessmentResults, AppError> {
        let result: OneOrMany<AssessmentResults> = self
            .rpc(
                "submit_assessment",
                &json!({ "p_attempt_id": attempt_id, "p_answers": answers }),
            )
            .await?;

        result
            .into_first()
            .ok_or_else(|| AppError::Upstream("submit_assessment returned no row".to_string()))
    }
}

#[async_trait]
impl ProfileBackend for RestBackend {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                &[
                    ("id", eq(user_id)),
                    (
                        "select",
                        "id,email,full_name,role,va_profiles(id,headline,is_verified)".to_string(),
                    ),
                ],
            )
            .await?;

        Ok(rows.into_iter().next().map(Profile::from))
    }
}

#[async_trait]
impl InterviewBackend for RestBackend {
    async fn fetch_availability(&self, va_id: &str) -> Result<Vec<AvailabilityWindow>, AppError> {
        self.select(
            "va_availability",
            &[
                ("va_id", eq(va_id)),
                ("select", "day_of_week,start_time,end_time".to_string()),
            ],
        )
        .await
    }

    async fn fetch_bookings(
        &self,
        va_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookedInterview>, AppError> {
        self.select(
            "interviews",
            &[
                ("va_id", eq(va_id)),
                ("scheduled_at", format!("gte.{}", timestamp(from))),
                ("scheduled_at", format!("lt.{}", timestamp(to))),
                ("status", "neq.cancelled".to_string()),
                ("select", "scheduled_at,duration_minutes".to_string()),
            ],
        )
        .await
    }

    async fn book_interview(&self, booking: &NewInterview) -> Result<Interview, AppError> {
        let rows: Vec<Interview> = self
            .insert(
                "interviews",
                &InterviewInsert {
                    booking,
                    status: "scheduled",
                },
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Upstream("interviews insert returned no row".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = Config::from_lookup(|key| match key {
            "BACKEND_URL" => Some("https://gateway.example/project-a".to_string()),
            "BACKEND_SERVICE_KEY" => Some("service-key".to_string()),
            "JWT_SECRET" => Some("secret".to_string()),
            _ => None,
        })
        .unwrap();
        let backend = RestBackend::new(&config).unwrap();

        assert_eq!(
            backend.endpoint("rest/v1/rpc/submit_assessment").unwrap().as_str(),
            "https://gateway.example/project-a/rest/v1/rpc/submit_assessment"
        );
    }

    #[test]
    fn test_config_row_with_array_join() {
        let row: ConfigRow = serde_json::from_value(json!({
            "skill_id": "s1",
            "questions_per_test": 10,
            "time_limit_minutes": 15,
            "passing_score": 70,
            "skills": [{ "name": "Bookkeeping" }]
        }))
        .unwrap();

        let config = row.into_config();
        assert_eq!(config.skill_name, "Bookkeeping");
        assert_eq!(config.time_limit_seconds(), 900);
    }

    #[test]
    fn test_profile_row_with_object_join() {
        let row: ProfileRow = serde_json::from_value(json!({
            "id": "u1",
            "full_name": "Dana",
            "role": "va",
            "va_profiles": { "id": "v1", "is_verified": true }
        }))
        .unwrap();

        let profile = Profile::from(row);
        assert_eq!(profile.role, Role::Va);
        assert!(profile.va_profile.unwrap().is_verified);
    }

    #[test]
    fn test_question_row_sanitized() {
        let row: QuestionRow = serde_json::from_value(json!({
            "id": "q1",
            "question_text": "Pick one<script>alert(1)</script>",
            "options": ["<b>A</b>", "B"]
        }))
        .unwrap();

        let question = row.into_question();
        assert_eq!(question.prompt, "Pick one");
        assert_eq!(question.options[0], "<b>A</b>");
    }
}
