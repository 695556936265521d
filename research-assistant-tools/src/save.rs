//! Persisting research results to the output directory.

use research_assistant::{ToolError, ToolResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// File the results for `query` are saved to. Separators in the query become `_`.
pub fn results_path(output_dir: &Path, query: &str) -> PathBuf {
    let name: String = query
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    output_dir.join(format!("research_results_{name}.txt"))
}

/// Write `text` for `query`, replacing any earlier results for the same query.
pub async fn save(output_dir: &Path, text: &str, query: &str) -> Result<ToolResult, ToolError> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = results_path(output_dir, query);
    tokio::fs::write(&path, text).await?;
    info!("Saved {} bytes of research results to {}", text.len(), path.display());

    Ok(ToolResult::new(format!("Research results saved to {}", path.display()))
        .with_attachment(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_path() {
        let dir = Path::new("out");
        assert_eq!(
            results_path(dir, "foo"),
            Path::new("out/research_results_foo.txt")
        );
        assert_eq!(
            results_path(dir, "../etc/passwd"),
            Path::new("out/research_results_.._etc_passwd.txt")
        );
        assert_eq!(
            results_path(dir, "a\\b"),
            Path::new("out/research_results_a_b.txt")
        );
    }

    #[tokio::test]
    async fn test_save_writes_exact_text() {
        let dir = tempfile::tempdir().unwrap();
        let result = save(dir.path(), "abc", "foo").await.unwrap();

        let path = dir.path().join("research_results_foo.txt");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "abc");
        assert!(result.text.contains(&path.display().to_string()));
        assert_eq!(result.attachments, vec![path]);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), "a much longer first version", "foo").await.unwrap();
        save(dir.path(), "second", "foo").await.unwrap();

        let path = dir.path().join("research_results_foo.txt");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_save_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("results/today");
        save(&nested, "x", "q").await.unwrap();
        assert!(nested.join("research_results_q.txt").is_file());
    }
}
