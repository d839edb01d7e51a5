use serde::{Deserialize, Serialize};

/// Entry kind under a search root / 搜索根目录下的条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Directory => "directory",
        }
    }
}

/// One indexed file or directory / 一条索引记录
///
/// `relative_path` is computed against the indexed root and never carries a
/// leading separator. Directories never carry `size` or `extension`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub relative_path: String,
}

impl FileEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// One ranked search hit / 一条排序后的搜索结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub file: FileEntry,
    /// Always clamped to [1,10] / 始终限制在[1,10]
    pub relevance_score: u8,
    pub reasoning: String,
}

/// Response of the ranked file search / 文件搜索响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchResult>,
    pub file_results: Vec<SearchResult>,
    pub folder_results: Vec<SearchResult>,
    pub query: String,
    pub total_files: usize,
    #[serde(default)]
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    /// Error envelope with empty result sets / 空结果的错误响应
    pub fn failure(query: &str, total_files: usize, error: &str) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            file_results: Vec::new(),
            folder_results: Vec::new(),
            query: query.to_string(),
            total_files,
            cached: false,
            cache_timestamp: None,
            cache_key: None,
            error: Some(error.to_string()),
        }
    }
}

/// One line-level content match / 一条行级内容匹配
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMatch {
    /// Absolute file path / 文件的绝对路径
    pub file: String,
    pub line_number: u32,
    pub content: String,
    pub relative_path: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_after: Option<String>,
}

/// Response of the content search / 内容搜索响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSearchResponse {
    pub success: bool,
    pub results: Vec<ContentMatch>,
    pub query: String,
    pub total_matches: usize,
    pub searched_folder: String,
    /// Milliseconds spent executing the search / 搜索耗时（毫秒）
    pub execution_time: u64,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContentSearchResponse {
    pub fn failure(query: &str, folder: &str, error: &str) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            query: query.to_string(),
            total_matches: 0,
            searched_folder: folder.to_string(),
            execution_time: 0,
            command: String::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Response of the directory listing / 目录列表响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    pub files: Vec<FileEntry>,
    pub total_files: usize,
    pub total_directories: usize,
    pub base_folder: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ListResponse {
    pub fn failure(base_folder: &str, error: &str) -> Self {
        Self {
            success: false,
            files: Vec::new(),
            total_files: 0,
            total_directories: 0,
            base_folder: base_folder.to_string(),
            cached: false,
            cache_timestamp: None,
            error: Some(error.to_string()),
        }
    }
}

/// A suggested search root / 推荐的搜索根目录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderOption {
    pub name: String,
    pub path: String,
    pub exists: bool,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldersResponse {
    pub success: bool,
    pub folders: Vec<FolderOption>,
    pub current_user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of the file content read / 文件内容读取响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContentResponse {
    pub success: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// "text" or "directory" / 文本或目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<usize>,
    /// Immediate children when the path is a directory / 路径为目录时的直接子项
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<FileEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileContentResponse {
    pub fn failure(file_path: &str, error: &str) -> Self {
        Self {
            success: false,
            file_path: file_path.to_string(),
            content: None,
            detected_type: None,
            truncated: None,
            total_lines: None,
            entries: None,
            error: Some(error.to_string()),
        }
    }
}

/// Response of the open-in-editor operation / 在编辑器中打开的响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFileResponse {
    pub success: bool,
    pub file_path: String,
    pub editor: String,
    pub command: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
