//! In-process mock broker used by the connection, publisher and listener tests.

use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;

use super::frame::{read_frame, write_frame, Command, Frame};
use crate::Config;

pub struct MockBroker {
    listener: TcpListener,
    port: u16,
}

impl MockBroker {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    /// Default configuration pointed at this broker.
    pub fn config(&self) -> Config {
        Config {
            stomp_host: "127.0.0.1".to_string(),
            stomp_port: self.port,
            ..Config::default()
        }
    }

    pub async fn accept(self) -> (BufReader<OwnedReadHalf>, OwnedWriteHalf) {
        let (stream, _) = self.listener.accept().await.unwrap();
        let (read_half, write_half) = stream.into_split();
        (BufReader::new(read_half), write_half)
    }
}

/// Read the next frame and assert its command.
pub async fn expect(reader: &mut BufReader<OwnedReadHalf>, command: Command) -> Frame {
    let frame = read_frame(reader)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("connection closed while expecting {}", command));
    assert_eq!(frame.command, command, "unexpected frame {:?}", frame);
    frame
}

/// Read frames until the client closes the socket, answering DISCONNECT with
/// its receipt.
pub async fn drain(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Some(frame) = read_frame(reader).await.unwrap() {
        if frame.command == Command::Disconnect {
            if let Some(id) = frame.header("receipt") {
                send(writer, &receipt(id)).await;
            }
        }
        frames.push(frame);
    }
    frames
}

pub async fn send(writer: &mut OwnedWriteHalf, frame: &Frame) {
    write_frame(writer, frame).await.unwrap();
}

pub fn connected() -> Frame {
    Frame::new(Command::Connected)
        .with_header("version", "1.2")
        .with_header("session", "mock-session")
        .with_header("server", "mock/1.0")
}

pub fn receipt(id: &str) -> Frame {
    Frame::new(Command::Receipt).with_header("receipt-id", id)
}

pub fn message(
    destination: &str,
    subscription: &str,
    message_id: &str,
    ack: Option<&str>,
    body: &[u8],
) -> Frame {
    let mut frame = Frame::new(Command::Message)
        .with_header("destination", destination)
        .with_header("subscription", subscription)
        .with_header("message-id", message_id)
        .with_body(body);
    if let Some(ack) = ack {
        frame = frame.with_header("ack", ack);
    }
    frame
}
