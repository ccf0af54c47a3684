// tests/integration/set_default.rs

use mfa_default::{
    AuthError, DirectoryError, HttpDirectoryClient, MfaDefaultSetter, MfaMethod, MfaMethodType,
    SetDefaultOutcome, set_default_method,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

const UPN: &str = "alice@contoso.com";

fn user_path(upn: &str) -> String {
    format!("/v1.0/users/{}", upn)
}

#[tokio::test]
async fn test_set_default_writes_normalized_methods() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(user_path(UPN)))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .and(header_exists("client-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(
            UPN,
            json!([
                {"methodType": "PhoneAppOTP", "isDefault": false},
                {"methodType": "OneWaySMS", "isDefault": true}
            ]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(user_path(UPN)))
        .and(body_json(json!({
            "strongAuthenticationMethods": [
                {"methodType": "PhoneAppOTP", "isDefault": true},
                {"methodType": "OneWaySMS", "isDefault": false}
            ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = assert_ok!(
        set_default_method(
            &directory_config(&server),
            client_secret(),
            UPN,
            &MfaMethodType::PhoneAppOtp,
        )
        .await
    );

    assert_eq!(
        outcome,
        SetDefaultOutcome::Updated {
            methods: vec![
                MfaMethod::new(MfaMethodType::PhoneAppOtp, true),
                MfaMethod::new(MfaMethodType::OneWaySms, false),
            ]
        }
    );
}

#[tokio::test]
async fn test_not_configured_never_patches() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(user_path(UPN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(
            UPN,
            json!([{"methodType": "OneWaySMS", "isDefault": true}]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = assert_ok!(
        set_default_method(
            &directory_config(&server),
            client_secret(),
            UPN,
            &MfaMethodType::PhoneAppNotification,
        )
        .await
    );

    assert_eq!(
        outcome,
        SetDefaultOutcome::NotConfigured {
            principal_name: UPN.to_string(),
            method_type: MfaMethodType::PhoneAppNotification,
        }
    );
}

#[tokio::test]
async fn test_user_without_methods_is_not_configured() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(user_path(UPN)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "userPrincipalName": UPN })),
        )
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = assert_ok!(
        set_default_method(
            &directory_config(&server),
            client_secret(),
            UPN,
            &MfaMethodType::PhoneAppOtp,
        )
        .await
    );

    assert!(!outcome.is_updated());
}

#[tokio::test]
async fn test_session_is_reused_across_accounts() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    for upn in ["alice@contoso.com", "bob@contoso.com"] {
        Mock::given(method("GET"))
            .and(path(user_path(upn)))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(
                upn,
                json!([
                    {"methodType": "PhoneAppNotification", "isDefault": true},
                    {"methodType": "TwoWayVoiceMobile", "isDefault": true}
                ]),
            )))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("PATCH"))
        .and(body_json(json!({
            "strongAuthenticationMethods": [
                {"methodType": "PhoneAppNotification", "isDefault": false},
                {"methodType": "TwoWayVoiceMobile", "isDefault": true}
            ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let client = assert_ok!(
        HttpDirectoryClient::connect(&directory_config(&server), client_secret()).await
    );
    let setter = MfaDefaultSetter::new(client);

    for upn in ["alice@contoso.com", "bob@contoso.com"] {
        let outcome = assert_ok!(
            setter
                .set_default_method(upn, &MfaMethodType::TwoWayVoiceMobile)
                .await
        );
        assert!(outcome.is_updated());
    }
}

#[tokio::test]
async fn test_guest_principal_name_is_percent_encoded() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    let guest = "bob_fabrikam.com#EXT#@contoso.onmicrosoft.com";

    Mock::given(method("GET"))
        .and(path("/v1.0/users/bob_fabrikam.com%23EXT%23@contoso.onmicrosoft.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(
            guest,
            json!([{"methodType": "PhoneAppOTP", "isDefault": false}]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v1.0/users/bob_fabrikam.com%23EXT%23@contoso.onmicrosoft.com"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(
        set_default_method(
            &directory_config(&server),
            client_secret(),
            guest,
            &MfaMethodType::PhoneAppOtp,
        )
        .await
    );
}

#[tokio::test]
async fn test_unknown_user() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(odata_error("Request_ResourceNotFound", "User does not exist")),
        )
        .mount(&server)
        .await;

    let err = assert_err!(
        set_default_method(
            &directory_config(&server),
            client_secret(),
            "ghost@contoso.com",
            &MfaMethodType::PhoneAppOtp,
        )
        .await
    );

    assert!(matches!(err, DirectoryError::UserNotFound(upn) if upn == "ghost@contoso.com"));
}

#[tokio::test]
async fn test_directory_rejects_token() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = assert_err!(
        set_default_method(
            &directory_config(&server),
            client_secret(),
            UPN,
            &MfaMethodType::PhoneAppOtp,
        )
        .await
    );

    assert!(matches!(err, DirectoryError::Auth(AuthError::TokenRejected)));
}

#[tokio::test]
async fn test_write_failure_reports_api_error() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(
            UPN,
            json!([{"methodType": "OneWaySMS", "isDefault": false}]),
        )))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(odata_error("Request_BadRequest", "Invalid value specified")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = assert_err!(
        set_default_method(
            &directory_config(&server),
            client_secret(),
            UPN,
            &MfaMethodType::OneWaySms,
        )
        .await
    );

    match err {
        DirectoryError::Api { status, code, .. } => {
            assert_eq!(status, 400);
            assert_eq!(code, "Request_BadRequest");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_forbidden_write() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(
            UPN,
            json!([{"methodType": "OneWaySMS", "isDefault": false}]),
        )))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(odata_error("Authorization_RequestDenied", "Insufficient privileges")),
        )
        .mount(&server)
        .await;

    let err = assert_err!(
        set_default_method(
            &directory_config(&server),
            client_secret(),
            UPN,
            &MfaMethodType::OneWaySms,
        )
        .await
    );

    assert!(matches!(err, DirectoryError::PermissionDenied(msg) if msg == "Insufficient privileges"));
}
