// SPDX-License-Identifier: MIT

//! Callback listener behavior: one-shot capture, wrong-path handling,
//! confirmation page, deterministic teardown.

use std::time::Duration;

use whoopsync::services::CallbackListener;

#[tokio::test]
async fn test_captures_first_matching_request() {
    let listener = CallbackListener::bind("127.0.0.1", 0, "/callback")
        .await
        .expect("bind on an ephemeral port");
    let addr = listener.local_addr();

    let _ = reqwest::get(format!("http://{addr}/callback?code=abc123&state=Zz9yXw11"))
        .await
        .expect("listener should answer");

    let result = listener.wait(Duration::from_secs(5)).await.expect("callback captured");
    assert_eq!(result.code.as_deref(), Some("abc123"));
    assert_eq!(result.state.as_deref(), Some("Zz9yXw11"));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_wrong_path_is_not_found_and_ignored() {
    let listener = CallbackListener::bind("127.0.0.1", 0, "/callback")
        .await
        .expect("bind on an ephemeral port");
    let addr = listener.local_addr();

    // A stray request to another path must not satisfy the flow.
    let stray = reqwest::get(format!("http://{addr}/favicon.ico"))
        .await
        .expect("listener should answer");
    assert_eq!(stray.status().as_u16(), 404);

    let _ = reqwest::get(format!("http://{addr}/callback?code=real&state=st"))
        .await
        .expect("listener should answer");

    let result = listener.wait(Duration::from_secs(5)).await.expect("callback captured");
    assert_eq!(result.code.as_deref(), Some("real"));
}

#[tokio::test]
async fn test_confirmation_page_is_served() {
    let listener = CallbackListener::bind("127.0.0.1", 0, "/callback")
        .await
        .expect("bind on an ephemeral port");
    let addr = listener.local_addr();

    let page = reqwest::get(format!("http://{addr}/callback?code=x&state=y"))
        .await
        .expect("listener should answer");
    assert_eq!(page.status().as_u16(), 200);
    let body = page.text().await.expect("confirmation body");
    assert!(body.contains("WHOOP connection received"), "got: {body}");

    listener.wait(Duration::from_secs(5)).await.expect("callback captured");
}

#[tokio::test]
async fn test_first_request_wins() {
    let listener = CallbackListener::bind("127.0.0.1", 0, "/callback")
        .await
        .expect("bind on an ephemeral port");
    let addr = listener.local_addr();

    let _ = reqwest::get(format!("http://{addr}/callback?code=first&state=s1"))
        .await
        .expect("listener should answer");
    let _ = reqwest::get(format!("http://{addr}/callback?code=second&state=s2"))
        .await
        .expect("listener should answer");

    let result = listener.wait(Duration::from_secs(5)).await.expect("callback captured");
    assert_eq!(result.code.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_teardown_frees_the_port_after_capture() {
    let listener = CallbackListener::bind("127.0.0.1", 18821, "/callback")
        .await
        .expect("bind fixed port");
    let addr = listener.local_addr();

    let _ = reqwest::get(format!("http://{addr}/callback?code=x&state=y"))
        .await
        .expect("listener should answer");
    listener.wait(Duration::from_secs(5)).await.expect("callback captured");

    let rebind = tokio::net::TcpListener::bind(("127.0.0.1", 18821)).await;
    assert!(rebind.is_ok(), "port should be released after capture");
}

#[tokio::test]
async fn test_timeout_tears_down_without_a_request() {
    let listener = CallbackListener::bind("127.0.0.1", 18822, "/callback")
        .await
        .expect("bind fixed port");

    let err = listener.wait(Duration::from_millis(200)).await.unwrap_err();
    assert!(err.to_string().contains("timed out"), "got: {err}");

    let rebind = tokio::net::TcpListener::bind(("127.0.0.1", 18822)).await;
    assert!(rebind.is_ok(), "port should be released after timeout");
}
