use reqwest::Url;

use crate::error::CoreError;

/// Validate a node address. Only HTTP(S) endpoints are accepted.
pub(crate) fn parse_node_url(url: &str) -> Result<String, CoreError> {
    let parsed = Url::parse(url).map_err(|e| {
        CoreError::InvalidConfig(format!("invalid node url `{url}`: expected HTTP(S) URL ({e})"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(url.to_owned()),
        other => Err(CoreError::InvalidConfig(format!(
            "unsupported node url scheme `{other}`; expected http or https"
        ))),
    }
}
