use schoolcomm::config::{RelayConfig, TestUser};
use schoolcomm::error::Error;
use schoolcomm::relay::{MemorySendLog, RelayClient, RelayMessage, SendOutcome};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn relay_config(server: &MockServer) -> RelayConfig {
    RelayConfig {
        platform: "school.example.be".to_string(),
        password: "ws-secret".to_string(),
        service_url: format!("{}/service", server.uri()),
        swallow_errors: false,
        timeout: 5,
        test_user: TestUser::default(),
    }
}

fn soap_response(return_value: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <ns1:sendMsgResponse xmlns:ns1="urn:relay">
      <return>{}</return>
    </ns1:sendMsgResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
        return_value
    )
}

async fn mount_wsdl(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/service"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<definitions/>"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn successful_send_writes_one_success_record() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;

    Mock::given(method("POST"))
        .and(path("/service"))
        .and(header("SOAPAction", "\"sendMsg\""))
        .and(body_string_contains("<userIdentifier>jdoe</userIdentifier>"))
        .and(body_string_contains("<title>Report card</title>"))
        .and(body_string_contains("<coaccount>0</coaccount>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response("0")))
        .expect(1)
        .mount(&server)
        .await;

    let log = Arc::new(MemorySendLog::new());
    let client = RelayClient::connect(relay_config(&server), log.clone())
        .await
        .unwrap();

    let message = RelayMessage::new("jdoe", "Report card", "<p>See attachment</p>", 0);
    let outcome = client.send(&message, false).await.unwrap();
    assert_eq!(outcome, SendOutcome::Sent);

    let records = log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_message, "Mail sent successfully");
    assert_eq!(records[0].recipient, "jdoe");
    assert_eq!(records[0].service_credential, "ws-secret");
}

#[tokio::test]
async fn failure_is_looked_up_logged_and_swallowed_when_configured() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;

    Mock::given(method("POST"))
        .and(path("/service"))
        .and(header("SOAPAction", "\"sendMsg\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response("7")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service"))
        .and(header("SOAPAction", "\"returnJsonErrorCodes\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response(
            r#"{"7":"No user found with this username","13":"Invalid platform"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = relay_config(&server);
    config.swallow_errors = true;

    let log = Arc::new(MemorySendLog::new());
    let client = RelayClient::connect(config, log.clone()).await.unwrap();

    let message = RelayMessage::new("ghost", "Report card", "body", 0);
    let outcome = client.send(&message, false).await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Failed {
            code: 7,
            message: "No user found with this username".to_string(),
        }
    );

    let records = log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_message, "No user found with this username");
}

#[tokio::test]
async fn failure_propagates_by_default_and_runs_the_handler() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;

    Mock::given(method("POST"))
        .and(path("/service"))
        .and(header("SOAPAction", "\"sendMsg\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response("13")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service"))
        .and(header("SOAPAction", "\"returnJsonErrorCodes\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(soap_response(r#"{"13":"Invalid platform"}"#)),
        )
        .mount(&server)
        .await;

    let seen_code = Arc::new(AtomicI32::new(0));
    let handler_code = seen_code.clone();

    let log = Arc::new(MemorySendLog::new());
    let client = RelayClient::connect(relay_config(&server), log.clone())
        .await
        .unwrap()
        .on_failure(move |code, _reason| {
            handler_code.store(code, Ordering::SeqCst);
        });

    let message = RelayMessage::new("jdoe", "Report card", "body", 2);
    let err = client.send(&message, false).await.unwrap_err();
    assert!(matches!(err, Error::Remote { code: 13, .. }));
    assert_eq!(seen_code.load(Ordering::SeqCst), 13);

    // the attempt is logged even though the error propagates
    let records = log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_message, "Invalid platform");
    assert_eq!(records[0].account_id, 2);
}

#[tokio::test]
async fn unknown_error_code_gets_a_fallback_message() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;

    Mock::given(method("POST"))
        .and(path("/service"))
        .and(header("SOAPAction", "\"sendMsg\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response("99")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service"))
        .and(header("SOAPAction", "\"returnJsonErrorCodes\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(soap_response(r#"{"7":"No user found"}"#)),
        )
        .mount(&server)
        .await;

    let log = Arc::new(MemorySendLog::new());
    let client = RelayClient::connect(relay_config(&server), log.clone())
        .await
        .unwrap();

    let message = RelayMessage::new("jdoe", "Report card", "body", 0);
    let err = client.send(&message, false).await.unwrap_err();
    match err {
        Error::Remote { code, message } => {
            assert_eq!(code, 99);
            assert_eq!(message, "unknown error code 99");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn debug_send_with_incomplete_test_user_stays_offline() {
    let server = MockServer::start().await;
    mount_wsdl(&server).await;

    let mut config = relay_config(&server);
    config.test_user = TestUser {
        platform: "test.example.be".to_string(),
        password: "test-secret".to_string(),
        username: "tester".to_string(),
        account: 0, // missing
    };

    let log = Arc::new(MemorySendLog::new());
    let client = RelayClient::connect(config, log.clone()).await.unwrap();

    let message = RelayMessage::new("jdoe", "Report card", "body", 0);
    let err = client.send(&message, true).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    // nothing was sent and nothing was logged
    assert!(log.records().is_empty());
    let posts = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.to_string().eq_ignore_ascii_case("POST"))
        .count();
    assert_eq!(posts, 0);
}

#[tokio::test]
async fn unreachable_service_fails_at_connect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/service"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let log = Arc::new(MemorySendLog::new());
    let err = RelayClient::connect(relay_config(&server), log)
        .await
        .err()
        .expect("connect should fail");
    assert!(matches!(err, Error::Remote { code: 404, .. }));
}
