pub mod embedder;
pub mod llm;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub(crate) fn openai_endpoint(base_url: Option<&str>, path: &str) -> String {
    let base = base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            openai_endpoint(None, "chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            openai_endpoint(Some("http://localhost:11434/v1/"), "embeddings"),
            "http://localhost:11434/v1/embeddings"
        );
    }
}
