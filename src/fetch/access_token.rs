use super::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an access token as a URL query
/// parameter, the way hosted vector tile APIs expect it
/// (`?access_token=pk.xxx`).
pub struct AccessToken<C> {
    pub inner: C,
    pub param_name: String,
    pub token: String,
}

impl<C> AccessToken<C> {
    pub fn new(inner: C, param_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for AccessToken<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.token);
        self.inner.execute(req).await
    }
}
