//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and drive it with
//! a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use orbarena_transport::{
        ClientHandle, Connection, PendingConnection, Transport, WebSocketConnection,
        WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds a transport, connects one client to `path`, and returns both
    /// ends.
    async fn pair(path: &str) -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("should upgrade")
        });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
            .await
            .expect("client should connect");
        (server.await.expect("task should complete"), client)
    }

    #[tokio::test]
    async fn test_accept_returns_before_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let silent = transport.accept().await.expect("tcp accept");
        assert!(silent.peer_addr().ip().is_loopback());

        let client = tokio::spawn(tokio_tungstenite::connect_async(format!(
            "ws://{addr}/?room=next01"
        )));
        let conn = transport
            .accept()
            .await
            .expect("tcp accept")
            .upgrade()
            .await
            .expect("should upgrade");
        assert_eq!(conn.room_code(), Some("NEXT01"));
        client.await.unwrap().expect("client should connect");
    }

    #[tokio::test]
    async fn test_deliver_and_recv() {
        let (conn, mut client) = pair("/").await;
        assert!(conn.id().into_inner() > 0);

        conn.deliver(br#"{"t":"welcome"}"#).await.expect("deliver");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), br#"{"t":"welcome"}"#);

        client
            .send(Message::Binary(b"from client".to_vec().into()))
            .await
            .unwrap();
        let received = conn.recv().await.expect("recv").expect("data");
        assert_eq!(received, b"from client");
    }

    #[tokio::test]
    async fn test_non_utf8_goes_out_as_binary() {
        let (conn, mut client) = pair("/").await;

        conn.deliver(&[0xff, 0x00, 0xfe]).await.expect("deliver");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0x00, 0xfe]);
    }

    #[tokio::test]
    async fn test_room_code_from_upgrade_url() {
        let (conn, _client) = pair("/ws?room=ab12cd&v=3").await;
        assert_eq!(conn.room_code(), Some("AB12CD"));
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (conn, mut client) = pair("/").await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_terminate_closes_client() {
        let (conn, mut client) = pair("/").await;

        conn.terminate().await.expect("terminate");

        match client.next().await {
            Some(Ok(Message::Close(_))) | None => {}
            other => panic!("expected close, got {other:?}"),
        }
    }
}
