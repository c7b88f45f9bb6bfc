use async_trait::async_trait;

/// Supplies the bearer token for backend requests. `None` means the session
/// is gone and the caller has to sign in again; it is never retried.
#[async_trait]
pub trait AuthTokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl AuthTokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Reads the token from an environment variable on every request, so a
/// rotated token is picked up without rebuilding the aggregator.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl AuthTokenProvider for EnvTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}
