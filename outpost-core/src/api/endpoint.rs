use std::str::FromStr;

/// Routes served below the configured `api_context`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiEndpoint {
    Health,
    Commands,
    RunCommand(String),
    ConnectionInfo,
    RequestInfo,
    VersionInfo,
}

impl ApiEndpoint {
    /// Resolve a full request path. Paths outside `api_context` never match.
    pub fn resolve(api_context: &str, path: &str) -> Option<Self> {
        let rest = if api_context == "/" {
            path
        } else {
            path.strip_prefix(api_context)?
        };

        rest.parse().ok()
    }
}

impl FromStr for ApiEndpoint {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "/health" => Ok(ApiEndpoint::Health),
            "/commands" => Ok(ApiEndpoint::Commands),
            "/connection_info" => Ok(ApiEndpoint::ConnectionInfo),
            "/request_info" => Ok(ApiEndpoint::RequestInfo),
            "/version_info" => Ok(ApiEndpoint::VersionInfo),
            _ => match s.strip_prefix("/commands/") {
                Some(id) if !id.is_empty() && !id.contains('/') => {
                    Ok(ApiEndpoint::RunCommand(id.to_owned()))
                }
                _ => Err("invalid api endpoint"),
            },
        }
    }
}
