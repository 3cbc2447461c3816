//! Parsers for atlas CLI output
//!
//! JSON output (`-o json`) is preferred. The plain text forms printed by older
//! CLI versions are accepted as a fallback.

use serde::Deserialize;

/// Header printed above the connection string
const CONNECTION_STRING_HEADER: &str = "STANDARD CONNECTION STRING";

/// Header printed by `atlas config list`
const PROFILE_HEADER: &str = "PROFILE NAME";

#[derive(Debug, Deserialize)]
struct ProjectCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterDescription {
    state_name: String,
}

/// Profile names from `atlas config list`
pub fn parse_profiles(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.eq_ignore_ascii_case(PROFILE_HEADER))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Project id from `atlas projects create`
pub fn parse_project_id(output: &str) -> Option<String> {
    if let Ok(project) = serde_json::from_str::<ProjectCreated>(output.trim()) {
        return non_empty(project.id);
    }

    // Project '5e2211c17a3e5a48f5497de3' created.
    let rest = output.split("Project '").nth(1)?;
    let (id, tail) = rest.split_once('\'')?;
    if !tail.trim_start().starts_with("created") {
        return None;
    }
    non_empty(id.to_string())
}

/// Cluster state name from `atlas clusters describe`
pub fn parse_state_name(output: &str) -> Option<String> {
    if let Ok(cluster) = serde_json::from_str::<ClusterDescription>(output.trim()) {
        return non_empty(cluster.state_name);
    }

    output.lines().find_map(|line| {
        let value = line.trim().strip_prefix("StateName:")?.trim();
        non_empty(value.to_string())
    })
}

/// Connection string from `atlas clusters connectionStrings describe`,
/// without the header line
pub fn parse_connection_template(output: &str) -> String {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && *line != CONNECTION_STRING_HEADER)
        .unwrap_or_default()
        .to_string()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.trim().to_string())
    }
}
