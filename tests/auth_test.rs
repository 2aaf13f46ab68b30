mod common;

use common::{MockResponse, setup};
use wayback::client::{AccessKeys, AuthorizationContext, SessionCookies};
use wayback::error::{ArchiveError, AuthStage};

#[tokio::test]
async fn test_login_returns_key_authorization() {
    let (mock, client) = setup().await;

    let context = client.login("me@example.com", "hunter2").await.unwrap();

    assert_eq!(
        context,
        AuthorizationContext::Keys(AccessKeys {
            access_key: "A".to_string(),
            secret_key: "B".to_string(),
        })
    );

    let logins = mock.requests_to("/account/login");
    assert_eq!(logins.len(), 1);
    let form = logins[0].form();
    assert_eq!(form["username"], "me@example.com");
    assert_eq!(form["password"], "hunter2");
    assert_eq!(form["action"], "login");
    assert!(logins[0].header("cookie").unwrap().contains("test-cookie=1"));

    let key_requests = mock.requests_to("/account/s3.php");
    assert_eq!(key_requests.len(), 1);
    assert_eq!(key_requests[0].query.as_deref(), Some("output_json=1"));
    let cookie = key_requests[0].header("cookie").unwrap();
    assert!(cookie.contains("logged-in-user=U"));
    assert!(cookie.contains("logged-in-sig=S"));

    assert_eq!(client.metrics().logins_succeeded, 1);
}

#[tokio::test]
async fn test_login_session_keeps_cookies_and_keys() {
    let (_mock, client) = setup().await;

    let session = client.login_session("me@example.com", "pw").await.unwrap();

    assert_eq!(session.email, "me@example.com");
    assert_eq!(
        session.cookies,
        SessionCookies {
            user: "U".to_string(),
            signature: "S".to_string(),
        }
    );
    assert_eq!(session.keys.access_key, "A");
    assert!(matches!(
        session.cookie_authorization(),
        AuthorizationContext::Session(_)
    ));
}

#[tokio::test]
async fn test_login_accepts_cookies_without_path() {
    let (mock, client) = setup().await;
    // No Path attribute: the cookies default to the /account path
    mock.set_login(
        MockResponse::json("ok"),
        &["logged-in-user=U", "logged-in-sig=S"],
    );

    let context = client.login("me@example.com", "pw").await.unwrap();

    assert!(matches!(context, AuthorizationContext::Keys(_)));
    let cookie = mock.requests_to("/account/s3.php")[0]
        .header("cookie")
        .unwrap();
    assert_eq!(cookie, "logged-in-user=U; logged-in-sig=S");
}

#[tokio::test]
async fn test_login_fails_when_keys_are_missing() {
    let (mock, client) = setup().await;
    mock.set_keys(MockResponse::json(r#"{"success":1}"#));

    let result = client.login("me@example.com", "pw").await;

    match result {
        Err(ArchiveError::Auth { stage, .. }) => assert_eq!(stage, AuthStage::KeyExchange),
        other => panic!("expected auth error, got {other:?}"),
    }
    assert_eq!(client.metrics().logins_failed, 1);
}

#[tokio::test]
async fn test_login_fails_without_session_cookies() {
    let (mock, client) = setup().await;
    mock.set_login(MockResponse::json("<html>bad password</html>"), &[]);

    let result = client.login("me@example.com", "wrong").await;

    match result {
        Err(ArchiveError::Auth { stage, .. }) => assert_eq!(stage, AuthStage::WebLogin),
        other => panic!("expected auth error, got {other:?}"),
    }
    // The key exchange is never attempted
    assert!(mock.requests_to("/account/s3.php").is_empty());
}

#[tokio::test]
async fn test_login_fails_when_only_one_cookie_is_issued() {
    let (mock, client) = setup().await;
    mock.set_login(MockResponse::json("ok"), &["logged-in-user=U; Path=/"]);

    let result = client.login("me@example.com", "pw").await;

    assert!(matches!(
        result,
        Err(ArchiveError::Auth {
            stage: AuthStage::WebLogin,
            ..
        })
    ));
}

#[tokio::test]
async fn test_login_http_error_is_auth_error() {
    let (mock, client) = setup().await;
    mock.set_login(MockResponse::status(500), &[]);

    let result = client.login("me@example.com", "pw").await;

    match result {
        Err(ArchiveError::Auth { stage, reason }) => {
            assert_eq!(stage, AuthStage::WebLogin);
            assert!(reason.contains("500"));
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_key_exchange_with_malformed_json() {
    let (mock, client) = setup().await;
    mock.set_keys(MockResponse::json("<html>login required</html>"));

    let cookies = SessionCookies {
        user: "U".to_string(),
        signature: "S".to_string(),
    };
    let result = client.fetch_access_keys(&cookies).await;

    assert!(matches!(
        result,
        Err(ArchiveError::Auth {
            stage: AuthStage::KeyExchange,
            ..
        })
    ));
}

#[tokio::test]
async fn test_logout_does_not_contact_server() {
    let (mock, client) = setup().await;

    let context = client.login("me@example.com", "pw").await.unwrap();
    let before = mock.requests().len();

    client.logout(context);

    assert_eq!(mock.requests().len(), before);
}

#[tokio::test]
async fn test_unreachable_server_is_auth_error() {
    let client = common::client_for("http://127.0.0.1:9", wayback::client::PollPolicy::default());

    let result = client.login("me@example.com", "pw").await;

    assert!(matches!(
        result,
        Err(ArchiveError::Auth {
            stage: AuthStage::WebLogin,
            ..
        })
    ));
}
