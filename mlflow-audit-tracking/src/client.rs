use crate::{
    artifact::ListArtifacts,
    experiment::SearchExperiments,
    model_registry::SearchRegisteredModels,
    run::{MetricHistory, SearchRuns},
    TrackingSettings,
};
use anyhow::{bail, Context, Result};
use log::{debug, trace};
use mlflow_audit_core::{Experiment, MetricSample, RegisteredModel, Run, TrackingSource};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Page size requested from listing endpoints.
const MAX_RESULTS: usize = 1000;

#[derive(Debug, Serialize)]
/// Parameters adapted from <https://mlflow.org/docs/latest/rest-api.html#search-experiments>.
struct SearchExperimentsParams<'a> {
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
/// Parameters adapted from <https://mlflow.org/docs/latest/rest-api.html#search-runs>.
struct SearchRunsParams<'a> {
    experiment_ids: [&'a str; 1],
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

/// Collects all pages of a paginated listing.
///
/// `fetch` gets the token of the page to fetch and returns the items of that page with the
/// token of the next one.
fn paginate<T, F>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<(Vec<T>, Option<String>)>,
{
    let mut items = vec![];
    let mut token: Option<String> = None;
    loop {
        let (page, next) = fetch(token.as_deref())?;
        items.extend(page);
        match next {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => return Ok(items),
        }
    }
}

/// Provides read-only access to a MLflow tracking server via REST API.
///
/// Support Mlflow API version 2.0.
pub struct MlflowTrackingClient {
    client: Client,

    /// Base URL.
    base_url: String,

    /// User name of the tracking server.
    user_name: Option<String>,

    /// Password.
    password: Option<String>,
}

impl MlflowTrackingClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            user_name: None,
            password: None,
        })
    }

    /// Creates a client from [`TrackingSettings`], with basic authentication when a user name
    /// is given.
    pub fn from_settings(settings: &TrackingSettings, timeout: Duration) -> Result<Self> {
        let client = Self::new(&settings.uri, timeout)?;
        Ok(match &settings.user_name {
            Some(user_name) => {
                client.basic_auth(user_name, settings.password.as_deref().unwrap_or(""))
            }
            None => client,
        })
    }

    /// Set user name and password for basic authentication of the tracking server.
    pub fn basic_auth(self, user_name: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        Self {
            user_name: Some(user_name.as_ref().to_string()),
            password: Some(password.as_ref().to_string()),
            ..self
        }
    }

    fn url(&self, api: impl AsRef<str>) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, api.as_ref())
    }

    fn auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user_name {
            Some(user_name) => request.basic_auth(user_name, self.password.as_ref()),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(&self, api: &str, query: &impl Serialize) -> Result<T> {
        let url = self.url(api);
        trace!("GET {}", url);
        let resp = self.auth(self.client.get(&url)).query(query).send()?;
        Self::parse(&url, resp)
    }

    fn post<T: DeserializeOwned>(&self, api: &str, params: &impl Serialize) -> Result<T> {
        let url = self.url(api);
        trace!("POST {}", url);
        let resp = self.auth(self.client.post(&url)).json(params).send()?;
        Self::parse(&url, resp)
    }

    fn parse<T: DeserializeOwned>(url: &str, resp: Response) -> Result<T> {
        let status = resp.status();
        let text = resp.text()?;
        if !status.is_success() {
            bail!("{} returned {}: {}", url, status, text);
        }
        serde_json::from_str(&text).with_context(|| format!("Unexpected response from {}", url))
    }
}

impl TrackingSource for MlflowTrackingClient {
    fn list_experiments(&self) -> Result<Vec<Experiment>> {
        let experiments = paginate(|page_token| {
            let resp: SearchExperiments = self.post(
                "experiments/search",
                &SearchExperimentsParams {
                    max_results: MAX_RESULTS,
                    page_token,
                },
            )?;
            Ok((resp.experiments, resp.next_page_token))
        })?;
        debug!("Listed {} experiments", experiments.len());

        Ok(experiments.into_iter().map(Into::into).collect())
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        let runs = paginate(|page_token| {
            let resp: SearchRuns = self.post(
                "runs/search",
                &SearchRunsParams {
                    experiment_ids: [experiment_id],
                    max_results: MAX_RESULTS,
                    page_token,
                },
            )?;
            Ok((resp.runs, resp.next_page_token))
        })?;
        debug!("Listed {} runs of experiment {}", runs.len(), experiment_id);

        Ok(runs.into_iter().map(Into::into).collect())
    }

    fn get_metric_history(&self, run_id: &str, metric_key: &str) -> Result<Vec<MetricSample>> {
        let max_results = MAX_RESULTS.to_string();
        let metrics = paginate(|page_token| {
            let mut query = vec![
                ("run_id", run_id),
                ("metric_key", metric_key),
                ("max_results", max_results.as_str()),
            ];
            if let Some(page_token) = page_token {
                query.push(("page_token", page_token));
            }
            let resp: MetricHistory = self.get("metrics/get-history", &query)?;
            Ok((resp.metrics, resp.next_page_token))
        })?;

        Ok(metrics
            .into_iter()
            .map(|m| MetricSample::new(m.timestamp, m.value))
            .collect())
    }

    fn list_artifacts(&self, run_id: &str) -> Result<Vec<String>> {
        let files = paginate(|page_token| {
            let mut query = vec![("run_id", run_id)];
            if let Some(page_token) = page_token {
                query.push(("page_token", page_token));
            }
            let resp: ListArtifacts = self.get("artifacts/list", &query)?;
            Ok((resp.files, resp.next_page_token))
        })?;

        Ok(files.into_iter().map(|f| f.path).collect())
    }

    fn list_registered_models(&self) -> Result<Vec<RegisteredModel>> {
        let max_results = MAX_RESULTS.to_string();
        let models = paginate(|page_token| {
            let mut query = vec![("max_results", max_results.as_str())];
            if let Some(page_token) = page_token {
                query.push(("page_token", page_token));
            }
            let resp: SearchRegisteredModels = self.get("registered-models/search", &query)?;
            Ok((resp.registered_models, resp.next_page_token))
        })?;
        debug!("Listed {} registered models", models.len());

        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_follows_tokens() -> Result<()> {
        let pages = vec![
            (vec![1, 2], Some("p2".to_string())),
            (vec![3], Some("p3".to_string())),
            (vec![4], Some(String::new())),
        ];
        let mut seen = vec![];
        let items = paginate(|token| {
            seen.push(token.map(String::from));
            Ok(pages[seen.len() - 1].clone())
        })?;

        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(
            seen,
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
        Ok(())
    }

    #[test]
    fn test_paginate_stops_on_error() {
        let mut calls = 0;
        let result: Result<Vec<i32>> = paginate(|_| {
            calls += 1;
            bail!("RESOURCE_DOES_NOT_EXIST")
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_url() -> Result<()> {
        let client = MlflowTrackingClient::new("http://localhost:5000/", Duration::from_secs(1))?;
        assert_eq!(
            client.url("runs/search"),
            "http://localhost:5000/api/2.0/mlflow/runs/search"
        );
        Ok(())
    }
}
