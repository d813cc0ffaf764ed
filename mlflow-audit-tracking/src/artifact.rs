use serde::Deserialize;

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct FileInfo {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    pub file_size: Option<i64>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
/// Response of `artifacts/list`.
pub(crate) struct ListArtifacts {
    pub root_uri: Option<String>,
    #[serde(default)]
    pub files: Vec<FileInfo>,
    pub next_page_token: Option<String>,
}
