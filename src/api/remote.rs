//! Purpose: Provide an HTTP client for the muster roster surface.
//! Exports: `RemoteRoster`.
//! Role: Blocking client that mirrors `LocalRoster` operation-for-operation.
//! Invariants: Request and response bodies match the server wire contract.
//! Invariants: Server error envelopes round-trip into `Error` with their kind;
//! anything unparseable falls back to a status-derived kind.

use crate::core::error::{Error, ErrorKind};
use crate::core::page::PageSpec;
use crate::core::player::{NewPlayer, Player, PlayerPatch};
use crate::core::query::Criteria;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

type ApiResult<T> = Result<T, Error>;

#[derive(Clone)]
pub struct RemoteRoster {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(serde::Deserialize)]
struct RemoteError {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
    field: Option<String>,
    id: Option<i64>,
}

impl RemoteRoster {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self { base_url, agent })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn create_player(&self, new: &NewPlayer) -> ApiResult<Player> {
        let url = build_url(&self.base_url, &["players"])?;
        self.request_json("POST", &url, Some(new))
    }

    pub fn player_by_id(&self, id: i64) -> ApiResult<Player> {
        let url = build_url(&self.base_url, &["players", &id.to_string()])?;
        self.request_json::<(), _>("GET", &url, None)
            .map_err(|err| err.with_id(id))
    }

    pub fn update_player(&self, id: i64, patch: &PlayerPatch) -> ApiResult<Player> {
        let url = build_url(&self.base_url, &["players", &id.to_string()])?;
        self.request_json("POST", &url, Some(patch))
            .map_err(|err| err.with_id(id))
    }

    pub fn delete_player(&self, id: i64) -> ApiResult<()> {
        let url = build_url(&self.base_url, &["players", &id.to_string()])?;
        let _value: serde_json::Value = self
            .request_json::<(), _>("DELETE", &url, None)
            .map_err(|err| err.with_id(id))?;
        Ok(())
    }

    pub fn list_players(&self, criteria: &Criteria, page: &PageSpec) -> ApiResult<Vec<Player>> {
        let mut url = build_url(&self.base_url, &["players"])?;
        append_criteria_pairs(&mut url, criteria);
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(number) = page.number {
                pairs.append_pair("pageNumber", &number.to_string());
            }
            if let Some(size) = page.size {
                pairs.append_pair("pageSize", &size.to_string());
            }
        }
        self.request_json::<(), _>("GET", &url, None)
    }

    pub fn count_players(&self, criteria: &Criteria) -> ApiResult<u64> {
        let mut url = build_url(&self.base_url, &["players", "count"])?;
        append_criteria_pairs(&mut url, criteria);
        self.request_json::<(), _>("GET", &url, None)
    }

    fn request_json<T, R>(&self, method: &str, url: &Url, body: Option<&T>) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let request = self
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json");
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };

        match response {
            Ok(resp) => read_json_response(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_source(err)),
        }
    }
}

fn append_criteria_pairs(url: &mut Url, criteria: &Criteria) {
    let mut pairs = url.query_pairs_mut();
    if let Some(name) = &criteria.name {
        pairs.append_pair("name", name);
    }
    if let Some(title) = &criteria.title {
        pairs.append_pair("title", title);
    }
    if let Some(race) = criteria.race {
        pairs.append_pair("race", race.as_str());
    }
    if let Some(profession) = criteria.profession {
        pairs.append_pair("profession", profession.as_str());
    }
    if let Some(after) = criteria.born_after {
        pairs.append_pair("after", &after.to_string());
    }
    if let Some(before) = criteria.born_before {
        pairs.append_pair("before", &before.to_string());
    }
    if let Some(banned) = criteria.banned {
        pairs.append_pair("banned", if banned { "true" } else { "false" });
    }
    if let Some(min) = criteria.min_experience {
        pairs.append_pair("minExperience", &min.to_string());
    }
    if let Some(max) = criteria.max_experience {
        pairs.append_pair("maxExperience", &max.to_string());
    }
    if let Some(min) = criteria.min_level {
        pairs.append_pair("minLevel", &min.to_string());
    }
    if let Some(max) = criteria.max_level {
        pairs.append_pair("maxLevel", &max.to_string());
    }
    if let Some(order) = criteria.order {
        pairs.append_pair("order", order.as_str());
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid roster base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("roster base url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(
            Error::new(ErrorKind::Usage).with_message("roster base url must not include a path")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("roster base url cannot be a base")
        })?;
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return error_from_remote(envelope.error);
    }
    let kind = error_kind_from_status(status);
    Error::new(kind).with_message(format!("remote error status {status}"))
}

fn error_from_remote(remote: RemoteError) -> Error {
    let mut err = Error::new(parse_error_kind(&remote.kind));
    if let Some(message) = remote.message {
        err = err.with_message(message);
    }
    if let Some(hint) = remote.hint {
        err = err.with_hint(hint);
    }
    if let Some(field) = remote.field {
        err = err.with_field(field);
    }
    if let Some(id) = remote.id {
        err = err.with_id(id);
    }
    err
}

fn parse_error_kind(kind: &str) -> ErrorKind {
    match kind {
        "Internal" => ErrorKind::Internal,
        "Usage" => ErrorKind::Usage,
        "Validation" => ErrorKind::Validation,
        "NotFound" => ErrorKind::NotFound,
        "Corrupt" => ErrorKind::Corrupt,
        "Io" => ErrorKind::Io,
        _ => ErrorKind::Internal,
    }
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 | 422 => ErrorKind::Usage,
        404 => ErrorKind::NotFound,
        _ => ErrorKind::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::{append_criteria_pairs, build_url, normalize_base_url, parse_error_kind};
    use crate::core::error::ErrorKind;
    use crate::core::player::{PlayerOrder, Race};
    use crate::core::query::Criteria;

    #[test]
    fn base_url_requires_http_scheme_and_bare_path() {
        assert!(normalize_base_url("ftp://example".to_string()).is_err());
        assert!(normalize_base_url("http://example/api".to_string()).is_err());
        let url = normalize_base_url("http://example:7171".to_string()).expect("url");
        assert_eq!(url.as_str(), "http://example:7171/");
    }

    #[test]
    fn criteria_map_to_camel_case_query_pairs() {
        let base = normalize_base_url("http://example".to_string()).expect("url");
        let mut url = build_url(&base, &["players"]).expect("url");
        let criteria = Criteria {
            name: Some("ara".to_string()),
            race: Some(Race::Human),
            min_experience: Some(100),
            order: Some(PlayerOrder::Level),
            ..Criteria::default()
        };
        append_criteria_pairs(&mut url, &criteria);
        assert_eq!(
            url.query(),
            Some("name=ara&race=HUMAN&minExperience=100&order=LEVEL")
        );
    }

    #[test]
    fn unknown_error_kind_falls_back_to_internal() {
        assert_eq!(parse_error_kind("Validation"), ErrorKind::Validation);
        assert_eq!(parse_error_kind("Mystery"), ErrorKind::Internal);
    }
}
