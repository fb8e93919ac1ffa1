mod core;
mod graph;
mod runs;

pub use self::core::AzureDevOpsClient;

#[cfg(test)]
pub(crate) mod testing {
    use super::AzureDevOpsClient;
    use crate::auth::Token;
    use crate::config::Config;

    /// Config pointing every host at `base_url`, with instant retries.
    pub fn test_config(base_url: &str) -> Config {
        let mut config = Config::default();
        config.azure_devops.core_url = base_url.to_string();
        config.azure_devops.release_url = base_url.to_string();
        config.azure_devops.graph_url = base_url.to_string();
        config.azure_devops.page_size = 2;
        config.http.max_retries = 2;
        config.http.retry_base_delay_ms = 0;
        config.http.retry_max_delay_ms = 0;
        config.http.timeout_secs = 5;
        config
    }

    pub fn test_client(base_url: &str) -> AzureDevOpsClient {
        AzureDevOpsClient::new("org", Token::from("pat"), &test_config(base_url))
            .expect("test client")
    }
}
