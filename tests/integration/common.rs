//! Shared fixtures for integration tests

use std::path::Path;
use std::time::Duration;
use sumi_binder::config::{
    Config, ExtractConfig, FetchConfig, OutputConfig, PipelineConfig, TargetConfig,
};
use sumi_binder::fetch::{FailureLedger, FetchClient, FetchSettings, RetryPolicy};
use tokio_util::sync::CancellationToken;
use wiremock::ResponseTemplate;

/// Creates a test configuration harvesting `<base>/` into `dir`
pub fn create_test_config(base: &str, dir: &Path) -> Config {
    Config {
        target: TargetConfig {
            url: format!("{}/", base),
            link_selector: "a.post".to_string(),
            next_page_selector: None,
            max_pages: 50,
        },
        extract: ExtractConfig {
            content_selector: "main".to_string(),
            remove_selectors: vec![],
        },
        fetch: FetchConfig {
            max_retries: 1,
            connect_timeout_secs: 2,
            read_timeout_secs: 5,
            backoff_unit_ms: 1,
            ..FetchConfig::default()
        },
        pipeline: PipelineConfig {
            workers: 4,
            ..PipelineConfig::default()
        },
        output: OutputConfig {
            directory: dir.display().to_string(),
            ..OutputConfig::default()
        },
    }
}

/// Fast-retrying client settings
pub fn fast_settings(max_retries: u32) -> FetchSettings {
    FetchSettings {
        retry: RetryPolicy {
            max_retries,
            backoff_unit: Duration::from_millis(1),
            escalate_read_timeout: true,
        },
        connect_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_secs(5),
        ..FetchSettings::default()
    }
}

pub fn client(settings: FetchSettings) -> FetchClient {
    FetchClient::new(settings, FailureLedger::new(), CancellationToken::new())
        .expect("Failed to build fetch client")
}

/// A `text/html` UTF-8 response
pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.into())
}

/// A listing page with one `a.post` link per `(href, text)` pair
pub fn listing(links: &[(&str, &str)], next: Option<&str>) -> String {
    let mut body = String::from("<html><body><ul>");
    for (href, text) in links {
        body.push_str(&format!(r#"<li><a class="post" href="{}">{}</a></li>"#, href, text));
    }
    body.push_str("</ul>");
    if let Some(next) = next {
        body.push_str(&format!(r#"<a class="next" href="{}">Next</a>"#, next));
    }
    body.push_str("</body></html>");
    body
}

/// An article page whose main region holds `content`
pub fn article(content: &str) -> String {
    format!(
        r#"<html><body><nav>menu</nav><main>{}</main><footer>footer</footer></body></html>"#,
        content
    )
}
