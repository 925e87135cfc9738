mod common;

use chrono::NaiveDate;
use common::{settings_for, Route, TestServer};
use highrate_fetch::config::Settings;
use highrate_fetch::products::{
    Campaign, CorsFetcher, CorsFileType, CorsRequest, ProductFetcher, ProductRequest, Solution,
};
use highrate_fetch::transport::{AuthSession, Credentials};
use highrate_fetch::FetchError;
use pretty_assertions::assert_eq;

fn session(settings: &Settings) -> AuthSession {
    AuthSession::new(
        Credentials {
            username: "observer".to_string(),
            password: "secret".to_string(),
        },
        settings,
    )
    .unwrap()
}

fn authorization_by_path(server: &TestServer) -> Vec<(String, bool)> {
    server
        .requests()
        .into_iter()
        .map(|r| (r.path, r.authorization.is_some()))
        .collect()
}

/// archive (127.0.0.1) -> login (localhost) -> archive (127.0.0.1)
fn login_handshake(server: &TestServer) {
    server.route(
        "/archive/file",
        Route::redirect(&format!("http://localhost:{}/oauth/authorize?client=x", server.port)),
    );
    server.route(
        "/oauth/authorize",
        Route::redirect(&format!("http://127.0.0.1:{}/archive/file-granted", server.port)),
    );
    server.route("/archive/file-granted", Route::bytes("text/plain", b"payload"));
}

#[tokio::test]
async fn test_credentials_follow_trusted_login_host() {
    let server = TestServer::start().await;
    login_handshake(&server);

    let settings = Settings {
        auth_host: "localhost".to_string(),
        ..settings_for(&server)
    };
    let url = format!("{}/archive/file", server.base_url());
    let body = session(&settings).get_text(&url).await.unwrap();

    assert_eq!(body, "payload");
    assert_eq!(
        authorization_by_path(&server),
        vec![
            ("/archive/file".to_string(), true),
            ("/oauth/authorize".to_string(), true),
            ("/archive/file-granted".to_string(), true),
        ]
    );
    let hosts: Vec<String> = server.requests().into_iter().map(|r| r.host).collect();
    assert!(hosts[1].starts_with("localhost"));
}

#[tokio::test]
async fn test_credentials_stripped_once_untrusted_host_is_reached() {
    let server = TestServer::start().await;
    login_handshake(&server);

    let settings = Settings {
        auth_host: "urs.example.invalid".to_string(),
        ..settings_for(&server)
    };
    let url = format!("{}/archive/file", server.base_url());
    session(&settings).get_text(&url).await.unwrap();

    // the hop back to the original host stays unauthenticated
    assert_eq!(
        authorization_by_path(&server),
        vec![
            ("/archive/file".to_string(), true),
            ("/oauth/authorize".to_string(), false),
            ("/archive/file-granted".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn test_html_text_document_is_auth_failure() {
    let server = TestServer::start().await;
    server.route("/reports/summary", Route::html());

    let settings = settings_for(&server);
    let url = format!("{}/reports/summary", server.base_url());
    let err = session(&settings).get_text(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::Auth(_)));
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let server = TestServer::start().await;
    server.route("/loop", Route::redirect("/loop"));

    let settings = settings_for(&server);
    let url = format!("{}/loop", server.base_url());
    let err = session(&settings).get(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::Auth(_)));
}

fn orbit_request() -> ProductRequest {
    ProductRequest::new(
        "COD",
        Campaign::Mgx,
        Solution::Final,
        "05M",
        NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
    )
}

#[tokio::test]
async fn test_orbit_listing_and_download() {
    let server = TestServer::start().await;
    let request = orbit_request();
    server.route(
        "/archive/gnss/products/2361/MD5SUMS",
        Route::bytes(
            "text/plain",
            format!("0123456789abcdef  {}\n", request.file_name()).as_bytes(),
        ),
    );
    server.route(
        &format!("/archive/gnss/products/2361/{}", request.file_name()),
        Route::gzip(b"#dP2025  4 10  0  0  0.00000000     288 ORBIT IGS20 FIT  COD\n"),
    );

    let settings = settings_for(&server);
    let fetcher = ProductFetcher::new(session(&settings), &server.base_url());
    assert!(fetcher.is_available(&request).await.unwrap());

    let other = ProductRequest::new(
        "GFZ",
        Campaign::Mgx,
        Solution::Rapid,
        "05M",
        request.date,
    );
    assert!(!fetcher.is_available(&other).await.unwrap());

    // one listing request serves both checks
    let listings = server
        .requests()
        .iter()
        .filter(|r| r.path.ends_with("MD5SUMS"))
        .count();
    assert_eq!(listings, 1);

    let dest = tempfile::TempDir::new().unwrap();
    let saved = fetcher.download(&request, dest.path()).await.unwrap();
    assert_eq!(
        saved.file_name().unwrap().to_string_lossy(),
        "COD0MGXFIN_20251000000_01D_05M_ORB.SP3"
    );
    assert!(std::fs::read_to_string(&saved).unwrap().starts_with("#dP2025"));
}

#[tokio::test]
async fn test_orbit_missing_and_unauthorised() {
    let server = TestServer::start().await;
    let request = orbit_request();
    let settings = settings_for(&server);
    let fetcher = ProductFetcher::new(session(&settings), &server.base_url());
    let dest = tempfile::TempDir::new().unwrap();

    let err = fetcher.download(&request, dest.path()).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyResult(_)));

    server.route(
        &format!("/archive/gnss/products/2361/{}", request.file_name()),
        Route::html(),
    );
    let err = fetcher.download(&request, dest.path()).await.unwrap_err();
    assert!(matches!(err, FetchError::Auth(_)));
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
}

fn cors_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
}

const CORS_LISTING: &str = "rinex/2025/100/nebp/nebp1000.25o.gz\n\
                            rinex/2025/100/nebp/nebp1000.25d.gz\n\
                            rinex/2025/100/txhu/txhu1000.25d.gz\n";

#[tokio::test]
async fn test_cors_listing_and_download() {
    let server = TestServer::start().await;
    server.route(
        "/rinex/2025/100/2025.100.files.list",
        Route::bytes("text/plain", CORS_LISTING.as_bytes()),
    );
    server.route(
        "/rinex/2025/100/nebp/nebp1000.25o.gz",
        Route::gzip(b"     2.11           OBSERVATION DATA    G (GPS)             RINEX VERSION / TYPE\n"),
    );

    let settings = settings_for(&server);
    let fetcher = CorsFetcher::new(&settings).unwrap();
    let nebp = CorsRequest::new("NEBP", cors_date(), CorsFileType::Obs).unwrap();

    let availability = fetcher.availability(&nebp).await.unwrap();
    assert!(availability.available);
    assert_eq!(
        availability.url,
        Some(format!("{}/rinex/2025/100/nebp/nebp1000.25o.gz", server.base_url()))
    );

    // txhu only publishes the compact flavour that day
    let txhu_obs = CorsRequest::new("txhu", cors_date(), CorsFileType::Obs).unwrap();
    let txhu_crx = CorsRequest::new("txhu", cors_date(), CorsFileType::Crx).unwrap();
    assert!(!fetcher.is_available(&txhu_obs).await.unwrap());
    assert!(fetcher.is_available(&txhu_crx).await.unwrap());

    let dest = tempfile::TempDir::new().unwrap();
    let saved = fetcher.download(&nebp, dest.path()).await.unwrap();
    assert_eq!(saved.file_name().unwrap().to_string_lossy(), "nebp1000.25o");
    assert!(std::fs::read_to_string(&saved)
        .unwrap()
        .contains("OBSERVATION DATA"));

    // one listing request served every check; the public bucket gets no credentials
    let requests = server.requests();
    let listings = requests
        .iter()
        .filter(|r| r.path.ends_with("files.list"))
        .count();
    assert_eq!(listings, 1);
    assert!(requests.iter().all(|r| r.authorization.is_none()));
}

#[tokio::test]
async fn test_cors_missing_day_and_file() {
    let server = TestServer::start().await;
    let settings = settings_for(&server);
    let fetcher = CorsFetcher::new(&settings).unwrap();
    let request = CorsRequest::new("nebp", cors_date(), CorsFileType::Obs).unwrap();

    let err = fetcher.is_available(&request).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyResult(_)));

    // a failed listing is not cached
    server.route(
        "/rinex/2025/100/2025.100.files.list",
        Route::bytes("text/plain", b"rinex/2025/100/txhu/txhu1000.25o.gz\n"),
    );
    let availability = fetcher.availability(&request).await.unwrap();
    assert!(!availability.available);
    assert_eq!(availability.url, None);

    server.route(
        "/rinex/2025/100/nebp/nebp1000.25o.gz",
        Route {
            status: 403,
            ..Route::bytes("application/xml", b"<Error><Code>AccessDenied</Code></Error>")
        },
    );
    let dest = tempfile::TempDir::new().unwrap();
    let err = fetcher.download(&request, dest.path()).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyResult(_)));
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
}
