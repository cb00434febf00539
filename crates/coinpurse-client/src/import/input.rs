use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::{ClientError, ClientResult};

pub const STDIN_FILE_NAME: &str = "stdin.csv";

/// A whole upload read into memory.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UploadSource {
    pub file_name: String,
    pub content: String,
}

/// Reads `path` in one go, or stdin when `path` is `-`. `stdin_override`
/// stands in for stdin so callers and tests can inject content.
pub async fn read_source(path: &str, stdin_override: Option<String>) -> ClientResult<UploadSource> {
    if path == "-" {
        let content = match stdin_override {
            Some(content) => content,
            None => read_stdin().await?,
        };
        if content.trim().is_empty() {
            return Err(ClientError::invalid_argument_with_recovery(
                "Path `-` means stdin input, but stdin was empty.",
                vec![
                    "Pipe CSV content into the command.".to_string(),
                    "Or pass a file path instead of `-`.".to_string(),
                ],
            ));
        }
        return Ok(UploadSource {
            file_name: STDIN_FILE_NAME.to_string(),
            content,
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|error| ClientError::import_source_unreadable(path, &error.to_string()))?;
    let content = String::from_utf8(bytes).map_err(|_| {
        ClientError::import_source_unreadable(path, "the file is not valid UTF-8 text")
    })?;

    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    Ok(UploadSource { file_name, content })
}

async fn read_stdin() -> ClientResult<String> {
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .map_err(|error| ClientError::import_source_unreadable("-", &error.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{STDIN_FILE_NAME, read_source};

    #[tokio::test]
    async fn stdin_override_is_named_like_a_csv() {
        let source = read_source("-", Some("a,b\n1,2\n".to_string())).await;
        assert!(source.is_ok());
        if let Ok(source) = source {
            assert_eq!(source.file_name, STDIN_FILE_NAME);
        }
    }

    #[tokio::test]
    async fn empty_stdin_is_rejected() {
        let source = read_source("-", Some("  \n".to_string())).await;
        assert!(source.is_err());
    }

    #[tokio::test]
    async fn files_keep_their_own_name() {
        let temp = tempfile::tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let path = temp.path().join("March.CSV");
            let written = std::fs::File::create(&path)
                .and_then(|mut file| file.write_all(b"Date,Amount\n2024-03-01,5\n"));
            assert!(written.is_ok());

            let source = read_source(&path.display().to_string(), None).await;
            assert!(source.is_ok());
            if let Ok(source) = source {
                assert_eq!(source.file_name, "March.CSV");
                assert!(source.content.starts_with("Date,Amount"));
            }
        }
    }

    #[tokio::test]
    async fn missing_files_are_user_errors() {
        let source = read_source("/definitely/not/here.csv", None).await;
        assert!(source.is_err());
        if let Err(error) = source {
            assert_eq!(error.code, "invalid_argument");
        }
    }
}
