//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! End-to-end protocol tests driven through the Parley client

use parley_client::{ClientError, LoginReply};
use parley_service::{INVALID_INPUT, LOGIN_FAILED};
use parley_testsuite::{connect, login, spawn_server, wait_for_connections};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_login_failure_then_retry() {
    let server = spawn_server().await;
    let mut client = connect(&server).await;

    let reply = client.login("User: alice", "Password: wrong").await.unwrap();
    assert_eq!(reply, LoginReply::Rejected(LOGIN_FAILED.to_string()));

    let reply = client.login("User: nobody", "Password: secret").await.unwrap();
    assert_eq!(reply, LoginReply::Rejected(LOGIN_FAILED.to_string()));

    let reply = client.login("User: alice", "Password: secret").await.unwrap();
    assert_eq!(
        reply,
        LoginReply::Accepted("Hi alice, good to see you.".to_string())
    );
    assert_eq!(
        client.request("lcm: 4 6").await.unwrap().as_deref(),
        Some("the lcm is: 12")
    );

    let metrics = server.metrics().snapshot();
    assert_eq!(metrics.logins_failed, 2);
    assert_eq!(metrics.logins_succeeded, 1);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_credential_records_never_authenticate() {
    let server = spawn_server().await;
    let mut client = connect(&server).await;

    let reply = client.login("User: carol", "Password: ").await.unwrap();
    assert_eq!(reply, LoginReply::Rejected(LOGIN_FAILED.to_string()));
    let reply = client
        .login("User: # comment line", "Password: x")
        .await
        .unwrap();
    assert!(matches!(reply, LoginReply::Rejected(_)));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_login_line_closes() {
    let server = spawn_server().await;
    let mut client = connect(&server).await;

    let reply = client.login("alice", "secret").await.unwrap();
    assert_eq!(reply, LoginReply::Invalid(INVALID_INPUT.to_string()));
    assert!(!matches!(client.read_line().await, Ok(Some(_))));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_parentheses() {
    let server = spawn_server().await;
    let mut client = login(&server, "alice", "secret").await;

    for (expr, verdict) in [
        ("()", "yes"),
        ("(()())", "yes"),
        ("", "yes"),
        ("(()", "no"),
        (")(", "no"),
        ("())(()", "no"),
    ] {
        let reply = client
            .request(&format!("parentheses: {expr}"))
            .await
            .unwrap();
        assert_eq!(
            reply,
            Some(format!("the parentheses are balanced: {verdict}")),
            "{expr}"
        );
    }

    let err = client.request("parentheses: (a)").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
    assert_eq!(client.read_line().await.unwrap(), None);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_lcm() {
    let server = spawn_server().await;
    let mut client = login(&server, "bob", "hunter2").await;

    for (args, lcm) in [
        ("4 6", "12"),
        ("0 5", "0"),
        ("5 0", "0"),
        ("-3 7", "21"),
        ("21 6", "42"),
        ("99999999999999999999 2", "199999999999999999998"),
    ] {
        assert_eq!(
            client.request(&format!("lcm: {args}")).await.unwrap(),
            Some(format!("the lcm is: {lcm}")),
            "{args}"
        );
    }

    assert!(matches!(
        client.request("lcm: 4").await,
        Err(ClientError::InvalidInput(_))
    ));
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_caesar() {
    let server = spawn_server().await;
    let mut client = login(&server, "alice", "secret").await;

    for (args, ciphertext) in [
        ("abc 1", "bcd"),
        ("Hello World 3", "khoor zruog"),
        ("xyz 26", "xyz"),
        ("abc -1", "zab"),
    ] {
        assert_eq!(
            client.request(&format!("caesar: {args}")).await.unwrap(),
            Some(format!("the ciphertext is: {ciphertext}")),
            "{args}"
        );
    }
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_caesar_invalid_inputs_close() {
    let server = spawn_server().await;

    for command in ["caesar: abc xyz", "caesar: a1b 3", "caesar: nospace"] {
        let mut client = login(&server, "alice", "secret").await;
        assert!(
            matches!(
                client.request(command).await,
                Err(ClientError::InvalidInput(_))
            ),
            "{command}"
        );
        assert_eq!(client.read_line().await.unwrap(), None);
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_command_closes() {
    let server = spawn_server().await;
    let mut client = login(&server, "alice", "secret").await;

    assert!(matches!(
        client.request("hello").await,
        Err(ClientError::InvalidInput(_))
    ));
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_quit_closes_without_reply() {
    let server = spawn_server().await;
    let mut other = login(&server, "bob", "hunter2").await;
    let mut client = login(&server, "alice", "secret").await;

    assert_eq!(client.request("quit").await.unwrap(), None);
    assert_eq!(client.read_line().await.unwrap(), None);
    wait_for_connections(&server, 1).await;

    assert_eq!(
        other.request("parentheses: ()").await.unwrap().as_deref(),
        Some("the parentheses are balanced: yes")
    );
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_byte_by_byte_delivery_is_isolated() {
    let server = spawn_server().await;
    let mut steady = login(&server, "bob", "hunter2").await;

    let mut trickle = TcpStream::connect(server.bind_address()).await.unwrap();
    for byte in b"User: alice\r\nPassword: secret\r\nlcm: 6 4\r\n" {
        trickle.write_all(&[*byte]).await.unwrap();
        assert_eq!(
            steady.request("lcm: 2 3").await.unwrap().as_deref(),
            Some("the lcm is: 6")
        );
    }

    trickle.shutdown().await.unwrap();
    let mut received = String::new();
    trickle.read_to_string(&mut received).await.unwrap();
    assert_eq!(
        received,
        "Welcome! Please log in.\nHi alice, good to see you.\nthe lcm is: 12\n"
    );

    server.shutdown().await.unwrap();
}
