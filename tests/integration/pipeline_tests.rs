//! Complete harvest runs against mock sites

use crate::common::{article, client, create_test_config, fast_settings, html, listing};
use sumi_binder::article::{FailureStage, ImageResolver};
use sumi_binder::pipeline::EntryStatus;
use sumi_binder::query::ScraperQuery;
use sumi_binder::store::{content_key, image_file_name, ContentStore};
use sumi_binder::{BinderError, Pipeline, RunMode};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_end_to_end_three_articles() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(
            &[
                ("/post/1", "First post"),
                ("/post/2", "Second post"),
                ("/post/3", "Third post"),
            ],
            None,
        )))
        .mount(&mock_server)
        .await;

    for n in 1..=2 {
        Mock::given(method("GET"))
            .and(path(format!("/post/{}", n)))
            .respond_with(html(article(&format!("<h1>Post {}</h1><p>Body</p>", n))))
            .mount(&mock_server)
            .await;
    }

    // No main region on the third article
    Mock::given(method("GET"))
        .and(path("/post/3"))
        .respond_with(html("<html><body><div>No main here</div></body></html>"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");
    let report = pipeline.run(RunMode::Fresh).await.expect("Run failed");

    assert_eq!(report.toc.len(), 3);
    assert_eq!(report.stored_count(), 2);
    assert_eq!(report.failed_count(), 1);

    let failures = report.failures();
    assert_eq!(failures[0].stage, FailureStage::Extract);
    assert!(failures[0].url.ends_with("/post/3"));

    let chapters = report.chapters();
    let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["First-post", "Second-post"]);

    let first = std::fs::read_to_string(&chapters[0].path).expect("Missing document");
    assert!(first.starts_with("<main>"));
    assert!(first.contains("<h1>Post 1</h1>"));
    assert!(!first.contains("menu"));

    let third_key = content_key(&format!("{}/post/3", mock_server.uri()));
    assert!(!dir.path().join(format!("{}.html", third_key)).exists());

    assert!(dir.path().join("toc.toml").is_file());
    assert!(dir.path().join("report.md").is_file());

    let snapshot = ContentStore::new(dir.path())
        .load_snapshot("toc.toml")
        .await
        .expect("Snapshot unreadable");
    assert_eq!(snapshot.entries(), report.toc.entries());
}

#[tokio::test]
async fn test_failing_entries_do_not_stop_batch() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let hrefs: Vec<String> = (0..10).map(|n| format!("/post/{}", n)).collect();
    let links: Vec<(&str, &str)> = hrefs.iter().map(|h| (h.as_str(), "Post")).collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(&links, None)))
        .mount(&mock_server)
        .await;

    for n in 0..10 {
        let response = if n == 3 || n == 7 {
            ResponseTemplate::new(404)
        } else {
            html(article("<p>ok</p>"))
        };
        Mock::given(method("GET"))
            .and(path(format!("/post/{}", n)))
            .respond_with(response)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&mock_server.uri(), dir.path());
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");
    let report = pipeline.run(RunMode::Fresh).await.expect("Run failed");

    assert_eq!(report.stored_count(), 8);
    assert_eq!(report.failed_count(), 2);
    assert_eq!(report.fetch_failures.len(), 2);

    let failed_positions: Vec<usize> = report
        .outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| matches!(o.status, EntryStatus::Failed(_)))
        .map(|(n, _)| n)
        .collect();
    assert_eq!(failed_positions, vec![3, 7]);

    let html_files = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |x| x == "html"))
        .count();
    assert_eq!(html_files, 8);
}

#[tokio::test]
async fn test_images_localized_and_broken_ones_removed() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let host = mock_server.address().to_string();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(&[("/post/1", "Pictures")], None)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/post/1"))
        .respond_with(html(article(&format!(
            r#"<p>Before</p><img src="/img/a.png" alt="A"><img src="//{}/img/b"><img src="/img/missing.png"><p>After</p>"#,
            host
        ))))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/b"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpg-bytes".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");
    let report = pipeline.run(RunMode::Fresh).await.expect("Run failed");
    assert_eq!(report.stored_count(), 1);

    let a_name = image_file_name(&Url::parse(&format!("{}/img/a.png", mock_server.uri())).unwrap());
    let b_name = image_file_name(&Url::parse(&format!("http://{}/img/b", host)).unwrap());
    assert!(a_name.ends_with(".png"));
    assert!(b_name.ends_with(".jpg"));

    let chapters = report.chapters();
    let stored = std::fs::read_to_string(&chapters[0].path).expect("Missing document");
    assert!(stored.contains(&format!(r#"src="{}""#, a_name)));
    assert!(stored.contains(&format!(r#"src="{}""#, b_name)));
    assert!(stored.contains(r#"alt="A""#));
    assert!(!stored.contains("missing"));
    assert!(stored.contains("<p>After</p>"));

    assert_eq!(std::fs::read(dir.path().join(&a_name)).unwrap(), b"png-bytes");
    assert_eq!(std::fs::read(dir.path().join(&b_name)).unwrap(), b"jpg-bytes");
    assert_eq!(report.fetch_failures.len(), 1);

    // Resolving the stored fragment again touches nothing
    let store = ContentStore::new(dir.path());
    let client = client(fast_settings(0));
    let query = ScraperQuery::new();
    let again = ImageResolver::new(&client, &store, &query)
        .resolve(&stored, &Url::parse(&format!("{}/post/1", mock_server.uri())).unwrap())
        .await
        .expect("Resolve failed");

    assert_eq!(again.html, stored);
    assert!(again.removed.is_empty());
    assert!(client.ledger().is_empty());
}

#[tokio::test]
async fn test_document_kept_in_page_encoding() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(&[("/post/1", "GBK")], None)))
        .mount(&mock_server)
        .await;

    let page = article("<p>科技爱好者周刊</p>");
    let (bytes, _, _) = encoding_rs::GBK.encode(&page);
    Mock::given(method("GET"))
        .and(path("/post/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=GBK")
                .set_body_bytes(bytes.into_owned()),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");
    let report = pipeline.run(RunMode::Fresh).await.expect("Run failed");

    match &report.outcomes[0].status {
        EntryStatus::Stored(document) => assert_eq!(document.encoding, "GBK"),
        other => panic!("expected stored document, got {:?}", other),
    }

    let raw = std::fs::read(&report.chapters()[0].path).unwrap();
    let (text, _, had_errors) = encoding_rs::GBK.decode(&raw);
    assert!(!had_errors);
    assert!(text.contains("科技爱好者周刊"));
    assert!(std::str::from_utf8(&raw).is_err());
}

#[tokio::test]
async fn test_meta_declared_utf16_page_stored_as_utf8() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(&[("/post/1", "Hello")], None)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/post/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    r#"<html><head><meta charset="utf-16"></head><body><main>Hello world</main></body></html>"#,
                ),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");
    let report = pipeline.run(RunMode::Fresh).await.expect("Run failed");

    match &report.outcomes[0].status {
        EntryStatus::Stored(document) => assert_eq!(document.encoding, "UTF-8"),
        other => panic!("expected stored document, got {:?}", other),
    }

    let stored = std::fs::read_to_string(&report.chapters()[0].path).unwrap();
    assert!(stored.contains("Hello world"));
}

#[tokio::test]
async fn test_remove_selectors_strip_substructure() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(&[("/post/1", "One")], None)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/post/1"))
        .respond_with(html(article(
            r#"<p>Body</p><div class="share">Share this</div><aside>Related</aside>"#,
        )))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.extract.remove_selectors = vec![".share".to_string(), "[[".to_string(), "aside".to_string()];

    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");
    let report = pipeline.run(RunMode::Fresh).await.expect("Run failed");

    let stored = std::fs::read_to_string(&report.chapters()[0].path).unwrap();
    assert!(stored.contains("<p>Body</p>"));
    assert!(!stored.contains("Share this"));
    assert!(!stored.contains("Related"));
}

#[tokio::test]
async fn test_resume_skips_existing_documents() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(&[("/post/1", "One"), ("/post/2", "Two")], None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    for n in 1..=2 {
        Mock::given(method("GET"))
            .and(path(format!("/post/{}", n)))
            .respond_with(html(article("<p>text</p>")))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&mock_server.uri(), dir.path());
    let first = Pipeline::new(config.clone())
        .expect("Failed to create pipeline")
        .run(RunMode::Fresh)
        .await
        .expect("First run failed");
    assert_eq!(first.stored_count(), 2);

    let mut resumed_config = config;
    resumed_config.pipeline.skip_existing = true;
    let second = Pipeline::new(resumed_config)
        .expect("Failed to create pipeline")
        .run(RunMode::Resume)
        .await
        .expect("Resumed run failed");

    assert_eq!(second.skipped_count(), 2);
    assert_eq!(second.chapters().len(), 2);
    assert_eq!(second.chapters(), first.chapters());
}

#[tokio::test]
async fn test_empty_listing_is_fatal() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body><p>Nothing here</p></body></html>"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");

    assert!(matches!(
        pipeline.run(RunMode::Fresh).await,
        Err(BinderError::EmptyToc { .. })
    ));
    assert!(!dir.path().join("toc.toml").exists());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .respond_with(html(listing(&[("/post/1", "One")], None)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let pipeline = Pipeline::new(config).expect("Failed to create pipeline");
    pipeline.cancellation_token().cancel();

    assert!(matches!(
        pipeline.run(RunMode::Fresh).await,
        Err(BinderError::Cancelled)
    ));
}
