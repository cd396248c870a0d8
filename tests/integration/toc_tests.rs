//! TOC crawler behavior against mock listings

use crate::common::{client, fast_settings, html, listing};
use sumi_binder::query::ScraperQuery;
use sumi_binder::toc::{CrawlRequest, TocCrawler};
use sumi_binder::BinderError;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(start: &str, next: Option<&str>) -> CrawlRequest {
    CrawlRequest {
        start_url: Url::parse(start).unwrap(),
        link_selector: "a.post".to_string(),
        next_page_selector: next.map(str::to_string),
        max_pages: 50,
        page_attempts: 2,
    }
}

#[tokio::test]
async fn test_duplicate_links_keep_first_title() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(
            &[
                ("/post/1", "Original title"),
                ("/post/2", "Second"),
                ("/post/1", "Repeated title"),
            ],
            None,
        )))
        .mount(&mock_server)
        .await;

    let client = client(fast_settings(0));
    let query = ScraperQuery::new();
    let toc = TocCrawler::new(&client, &query)
        .crawl(&request(&format!("{}/", mock_server.uri()), None))
        .await
        .expect("Crawl failed");

    assert_eq!(toc.len(), 2);
    assert_eq!(toc.entries()[0].title(), "Original-title");
    assert_eq!(toc.entries()[1].title(), "Second");
    assert_eq!(toc.pages().len(), 1);
    assert_eq!(toc.pages()[0].entries, 2);
}

#[tokio::test]
async fn test_follows_next_page_links() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/archive"))
        .and(query_param("page", "2"))
        .respond_with(html(listing(
            &[("/post/3", "Three"), ("/post/1", "One again")],
            Some("?page=3"),
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/archive"))
        .and(query_param("page", "3"))
        .respond_with(html(listing(&[("/post/4", "Four")], None)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/archive"))
        .respond_with(html(listing(
            &[("/post/1", "One"), ("/post/2", "Two")],
            Some("/archive?page=2"),
        )))
        .mount(&mock_server)
        .await;

    let client = client(fast_settings(0));
    let query = ScraperQuery::new();
    let toc = TocCrawler::new(&client, &query)
        .crawl(&request(
            &format!("{}/archive", mock_server.uri()),
            Some("a.next"),
        ))
        .await
        .expect("Crawl failed");

    let titles: Vec<&str> = toc.entries().iter().map(|e| e.title()).collect();
    assert_eq!(titles, vec!["One", "Two", "Three", "Four"]);

    let per_page: Vec<usize> = toc.pages().iter().map(|p| p.entries).collect();
    assert_eq!(per_page, vec![2, 1, 1]);
}

#[tokio::test]
async fn test_next_page_cycle_stops() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(listing(&[("/post/1", "One")], Some("/b"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html(listing(&[("/post/2", "Two")], Some("/a"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(fast_settings(0));
    let query = ScraperQuery::new();
    let toc = TocCrawler::new(&client, &query)
        .crawl(&request(&format!("{}/a", mock_server.uri()), Some("a.next")))
        .await
        .expect("Crawl failed");

    assert_eq!(toc.len(), 2);
    assert_eq!(toc.pages().len(), 2);
}

#[tokio::test]
async fn test_max_pages_caps_traversal() {
    let mock_server = MockServer::start().await;

    for n in 1..=5 {
        Mock::given(method("GET"))
            .and(path(format!("/page/{}", n)))
            .respond_with(html(listing(
                &[(format!("/post/{}", n).as_str(), "Post")],
                Some(format!("/page/{}", n + 1).as_str()),
            )))
            .mount(&mock_server)
            .await;
    }

    let mut crawl = request(&format!("{}/page/1", mock_server.uri()), Some("a.next"));
    crawl.max_pages = 3;

    let client = client(fast_settings(0));
    let query = ScraperQuery::new();
    let toc = TocCrawler::new(&client, &query)
        .crawl(&crawl)
        .await
        .expect("Crawl failed");

    assert_eq!(toc.pages().len(), 3);
    assert_eq!(toc.len(), 3);
}

#[tokio::test]
async fn test_unavailable_first_page_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client(fast_settings(0));
    let query = ScraperQuery::new();
    let result = TocCrawler::new(&client, &query)
        .crawl(&request(&format!("{}/", mock_server.uri()), None))
        .await;

    assert!(matches!(
        result,
        Err(BinderError::ListingUnavailable { .. })
    ));
    assert_eq!(client.ledger().len(), 2);
}

#[tokio::test]
async fn test_failing_later_page_keeps_partial_toc() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(
            &[("/post/1", "One"), ("/post/2", "Two")],
            Some("/page/2"),
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = client(fast_settings(1));
    let query = ScraperQuery::new();
    let toc = TocCrawler::new(&client, &query)
        .crawl(&request(&format!("{}/", mock_server.uri()), Some("a.next")))
        .await
        .expect("Partial crawl should succeed");

    assert_eq!(toc.len(), 2);
    assert_eq!(toc.pages().len(), 1);
}

#[tokio::test]
async fn test_encoding_tracked_per_listing_page() {
    let mock_server = MockServer::start().await;

    let page = listing(&[("/post/2", "第二篇")], None);
    let (gbk_page, _, _) = encoding_rs::GBK.encode(&page);
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=gbk")
                .set_body_bytes(gbk_page.into_owned()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(listing(&[("/post/1", "第一篇")], Some("/page/2"))))
        .mount(&mock_server)
        .await;

    let client = client(fast_settings(0));
    let query = ScraperQuery::new();
    let toc = TocCrawler::new(&client, &query)
        .crawl(&request(&format!("{}/", mock_server.uri()), Some("a.next")))
        .await
        .expect("Crawl failed");

    assert_eq!(toc.pages()[0].encoding, "UTF-8");
    assert_eq!(toc.pages()[1].encoding, "GBK");
    assert_eq!(toc.entries()[0].title(), "第一篇");
    assert_eq!(toc.entries()[1].title(), "第二篇");
}
