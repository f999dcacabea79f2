use mcd_client::{McdClient, McdError, Operation, Session};

fn load_live_session() -> Result<Session, McdError> {
    Session::builder().build()
}

#[tokio::test]
async fn live_get_user_and_validation_error() {
    let session = match load_live_session() {
        Ok(session) => session,
        Err(_) => {
            eprintln!("skipping live test: credentials not found in env or profiles.ini");
            return;
        }
    };

    let client = McdClient::new(session);

    let user = client
        .execute(&Operation::new("query getUser { getUser { email account { name } } }"))
        .await
        .expect("getUser must succeed");
    assert!(user.path("get_user.email").and_then(|n| n.as_str()).is_some());

    let err = client
        .execute(&Operation::new("query { definitelyNotAField }"))
        .await
        .expect_err("unknown field must fail");
    match err {
        McdError::GraphQl(inner) => assert!(!inner.retryable),
        other => panic!("expected graphql validation error, got {other:?}"),
    }
}
