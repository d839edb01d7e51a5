//! File listing and access endpoints / 文件列表与访问接口

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::api::parse_bool;
use crate::state::AppState;
use filesearch_backend::models::{
    EntryType, FileContentResponse, FileEntry, FolderOption, FoldersResponse, ListResponse,
    OpenFileResponse,
};
use filesearch_backend::utils::get_ext;

/// Lines returned by the content endpoint unless the caller asks for fewer
const DEFAULT_MAX_LINES: usize = 2000;
/// Files above this size are refused outright / 超过该大小的文件直接拒绝
const MAX_CONTENT_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub folder: Option<String>,
    pub refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBody {
    pub folder: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

/// GET /api/files/list - 列出目录内容
pub async fn list_get(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> (StatusCode, Json<ListResponse>) {
    let folder = query
        .folder
        .unwrap_or_else(|| state.config.indexer.default_folder.clone());
    let refresh = parse_bool(query.refresh.as_deref(), false);
    list_impl(&state, &folder, refresh)
}

/// POST /api/files/list
pub async fn list_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ListBody>,
) -> (StatusCode, Json<ListResponse>) {
    let folder = body
        .folder
        .unwrap_or_else(|| state.config.indexer.default_folder.clone());
    list_impl(&state, &folder, body.refresh)
}

fn list_impl(state: &AppState, folder: &str, refresh: bool) -> (StatusCode, Json<ListResponse>) {
    tracing::debug!("Listing files in {} (refresh: {})", folder, refresh);

    match state.indexer.index(folder, refresh) {
        Ok(outcome) => {
            let total_files = outcome.files.iter().filter(|f| f.is_file()).count();
            let total_directories = outcome.files.len() - total_files;
            (
                StatusCode::OK,
                Json(ListResponse {
                    success: true,
                    files: outcome.files,
                    total_files,
                    total_directories,
                    base_folder: folder.to_string(),
                    cached: outcome.cached,
                    cache_timestamp: Some(outcome.cache_timestamp),
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::warn!("Listing {} failed: {}", folder, e);
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ListResponse::failure(folder, &e.to_string())))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    pub file_path: Option<String>,
    pub max_lines: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBody {
    pub file_path: Option<String>,
    pub max_lines: Option<usize>,
}

/// GET /api/files/content - 读取文件内容
pub async fn content_get(
    Query(query): Query<ContentQuery>,
) -> (StatusCode, Json<FileContentResponse>) {
    content_impl(query.file_path.as_deref(), query.max_lines)
}

/// POST /api/files/content
pub async fn content_post(
    Json(body): Json<ContentBody>,
) -> (StatusCode, Json<FileContentResponse>) {
    content_impl(body.file_path.as_deref(), body.max_lines)
}

fn content_impl(
    file_path: Option<&str>,
    max_lines: Option<usize>,
) -> (StatusCode, Json<FileContentResponse>) {
    let Some(file_path) = file_path.filter(|p| !p.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(FileContentResponse::failure("", "filePath is required")),
        );
    };

    let path = Path::new(file_path);
    if !path.exists() {
        return (
            StatusCode::BAD_REQUEST,
            Json(FileContentResponse::failure(
                file_path,
                &format!("File or directory not found: {}", file_path),
            )),
        );
    }

    if path.is_dir() {
        return match read_directory_entries(path) {
            Ok(entries) => (
                StatusCode::OK,
                Json(FileContentResponse {
                    success: true,
                    file_path: file_path.to_string(),
                    content: None,
                    detected_type: Some("directory".to_string()),
                    truncated: None,
                    total_lines: None,
                    entries: Some(entries),
                    error: None,
                }),
            ),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FileContentResponse::failure(file_path, &e.to_string())),
            ),
        };
    }

    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FileContentResponse::failure(file_path, &e.to_string())),
            )
        }
    };
    if metadata.len() > MAX_CONTENT_BYTES {
        return (
            StatusCode::BAD_REQUEST,
            Json(FileContentResponse::failure(
                file_path,
                &format!("File too large to preview: {} bytes", metadata.len()),
            )),
        );
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FileContentResponse::failure(file_path, &e.to_string())),
            )
        }
    };

    // NUL byte in the leading window means binary / 前导窗口含NUL视为二进制
    if bytes.iter().take(8192).any(|b| *b == 0) {
        return (
            StatusCode::BAD_REQUEST,
            Json(FileContentResponse::failure(
                file_path,
                "Binary files are not previewable",
            )),
        );
    }

    let text = String::from_utf8_lossy(&bytes);
    let all_lines: Vec<&str> = text.lines().collect();
    let total_lines = all_lines.len();
    let cap = max_lines.unwrap_or(DEFAULT_MAX_LINES).max(1);
    let truncated = total_lines > cap;
    let content = if truncated {
        all_lines[..cap].join("\n")
    } else {
        all_lines.join("\n")
    };

    (
        StatusCode::OK,
        Json(FileContentResponse {
            success: true,
            file_path: file_path.to_string(),
            content: Some(content),
            detected_type: Some("text".to_string()),
            truncated: Some(truncated),
            total_lines: Some(total_lines),
            entries: None,
            error: None,
        }),
    )
}

/// Immediate children of a directory / 目录的直接子项
fn read_directory_entries(dir: &Path) -> std::io::Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        let name = entry.file_name().to_string_lossy().to_string();
        let ext = get_ext(&name);
        entries.push(FileEntry {
            path: entry.path().to_string_lossy().to_string(),
            name: name.clone(),
            entry_type: if metadata.is_dir() {
                EntryType::Directory
            } else {
                EntryType::File
            },
            size: if metadata.is_dir() {
                None
            } else {
                Some(metadata.len())
            },
            extension: if metadata.is_dir() || ext.is_empty() {
                None
            } else {
                Some(ext)
            },
            relative_path: name,
        });
    }
    entries.sort_by(|a, b| match (a.entry_type, b.entry_type) {
        (EntryType::Directory, EntryType::File) => std::cmp::Ordering::Less,
        (EntryType::File, EntryType::Directory) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
    Ok(entries)
}

/// Well-known home subdirectories offered as search roots / 常用搜索根目录
static COMMON_FOLDERS: &[(&str, &str)] = &[
    ("Documents", "User documents"),
    ("Desktop", "Desktop files"),
    ("Downloads", "Downloaded files"),
    ("Projects", "Project workspace"),
    ("Developer", "Development folder"),
    ("workspace", "Workspace folder"),
];

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// GET /api/files/folders - 推荐搜索根目录
pub async fn folders(State(state): State<Arc<AppState>>) -> (StatusCode, Json<FoldersResponse>) {
    let current_user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();

    let mut seen: HashSet<String> = HashSet::new();
    let mut options: Vec<FolderOption> = Vec::new();

    if let Some(home) = home_dir() {
        for (name, description) in COMMON_FOLDERS {
            let path = home.join(name);
            if !path.is_dir() {
                continue;
            }
            let path_str = path.to_string_lossy().to_string();
            if seen.insert(path_str.clone()) {
                options.push(FolderOption {
                    name: name.to_string(),
                    path: path_str,
                    exists: true,
                    description: description.to_string(),
                });
            }
        }
    }

    // Configured default folder and its immediate subdirectories / 配置的默认目录及其子目录
    let default_folder = Path::new(&state.config.indexer.default_folder);
    if default_folder.is_dir() {
        let path_str = default_folder.to_string_lossy().to_string();
        if seen.insert(path_str.clone()) {
            options.push(FolderOption {
                name: default_folder
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path_str.clone()),
                path: path_str,
                exists: true,
                description: "Configured default folder".to_string(),
            });
        }

        if let Ok(children) = std::fs::read_dir(default_folder) {
            for child in children.flatten().take(20) {
                let path = child.path();
                if !path.is_dir() {
                    continue;
                }
                let name = child.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    continue;
                }
                let path_str = path.to_string_lossy().to_string();
                if seen.insert(path_str.clone()) {
                    options.push(FolderOption {
                        name,
                        path: path_str,
                        exists: true,
                        description: "Subfolder of the default folder".to_string(),
                    });
                }
            }
        }
    }

    // Priority names first, alphabetical within the same rank / 优先名称靠前
    let priority = ["Documents", "Desktop", "Downloads", "Projects"];
    options.sort_by(|a, b| {
        let rank = |name: &str| priority.iter().position(|p| *p == name).unwrap_or(priority.len());
        rank(&a.name).cmp(&rank(&b.name)).then(a.name.cmp(&b.name))
    });

    (
        StatusCode::OK,
        Json(FoldersResponse {
            success: true,
            folders: options,
            current_user,
            error: None,
        }),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBody {
    pub file_path: Option<String>,
    pub editor: Option<String>,
}

fn open_failure(
    status: StatusCode,
    file_path: &str,
    editor: &str,
    error: &str,
) -> (StatusCode, Json<OpenFileResponse>) {
    (
        status,
        Json(OpenFileResponse {
            success: false,
            file_path: file_path.to_string(),
            editor: editor.to_string(),
            command: String::new(),
            message: String::new(),
            error: Some(error.to_string()),
        }),
    )
}

/// POST /api/files/open - 在编辑器中打开文件
pub async fn open(Json(body): Json<OpenBody>) -> (StatusCode, Json<OpenFileResponse>) {
    let editor = body.editor.unwrap_or_else(|| "vscode".to_string());

    let Some(file_path) = body.file_path.as_deref().filter(|p| !p.trim().is_empty()) else {
        return open_failure(StatusCode::BAD_REQUEST, "", &editor, "filePath is required");
    };

    let binary = match editor.as_str() {
        "cursor" => "cursor",
        "vscode" => "code",
        other => {
            return open_failure(
                StatusCode::BAD_REQUEST,
                file_path,
                &editor,
                &format!("Unsupported editor: {}", other),
            )
        }
    };

    if !Path::new(file_path).exists() {
        return open_failure(
            StatusCode::BAD_REQUEST,
            file_path,
            &editor,
            &format!("File or directory not found: {}", file_path),
        );
    }

    // The editor must answer --version before we hand it a path / 先确认编辑器可用
    let available = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status(),
    )
    .await;
    match available {
        Ok(Ok(status)) if status.success() => {}
        _ => {
            return open_failure(
                StatusCode::BAD_REQUEST,
                file_path,
                &editor,
                &format!("{} is not installed or not in PATH", binary),
            )
        }
    }

    let command = format!("{} \"{}\"", binary, file_path);
    tracing::info!("Opening {} with {}", file_path, binary);

    // Editors detach on their own; spawning is enough / 编辑器自行脱离，无需等待
    match Command::new(binary).arg(file_path).spawn() {
        Ok(_) => (
            StatusCode::OK,
            Json(OpenFileResponse {
                success: true,
                file_path: file_path.to_string(),
                editor,
                command,
                message: format!("Opened {} in {}", file_path, binary),
                error: None,
            }),
        ),
        Err(e) => open_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            file_path,
            &editor,
            &format!("Failed to launch {}: {}", binary, e),
        ),
    }
}
